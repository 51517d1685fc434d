//! X.509 subject extraction.

use x509_parser::prelude::FromDer;
use x509_parser::certificate::X509Certificate;

use crate::error::MslError;

/// Extract the subject distinguished name from a DER-encoded certificate.
///
/// The rendered form follows RFC 2253 attribute notation (`CN=..., O=...`),
/// which is stable for a given certificate and therefore usable as a
/// canonical identity.
pub(crate) fn certificate_subject(der: &[u8]) -> Result<String, MslError> {
    let (trailing, certificate) = X509Certificate::from_der(der)
        .map_err(|e| MslError::CertificateParse(e.to_string()))?;
    if !trailing.is_empty() {
        return Err(MslError::CertificateParse(format!(
            "{} trailing bytes after certificate",
            trailing.len()
        )));
    }
    Ok(certificate.subject().to_string())
}
