//! Entity authentication data.
//!
//! An entity authentication claim names the device or client behind a
//! message exchange. The scheme set is closed: each variant carries its own
//! wire payload and derives one canonical identity string, fixed at
//! construction. Equality is identity-based, not structural: two X.509
//! claims with different certificate bytes but the same subject are the same
//! entity.
//!
//! On the wire a claim is a CBOR envelope of `{ scheme, authdata }`; the
//! scheme tag selects the variant parser. Serializing, parsing, and
//! re-serializing a claim yields byte-identical output, which is what allows
//! signed headers to carry authentication data verbatim.

mod x509;

use std::fmt;

use ciborium::Value;
use mantle_crypto::{CryptoContext, CryptoError};
use mantle_proto::ProtocolError;
use serde::{Deserialize, Serialize};

use crate::{context::MslContext, error::MslError};

pub(crate) use x509::certificate_subject;

/// Separator between a preshared key id and its profile.
const PROFILE_CONCAT_CHAR: &str = "-";
/// Separator between an unauthenticated root identity and its suffix.
const SUFFIX_CONCAT_CHAR: &str = ".";

/// Closed set of entity authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityAuthScheme {
    /// Preshared symmetric keys.
    #[serde(rename = "PSK")]
    Preshared,
    /// Preshared keys scoped by an application profile.
    #[serde(rename = "PSK_PROFILE")]
    PresharedProfile,
    /// X.509 certificate or certificate chain.
    #[serde(rename = "X509")]
    X509,
    /// RSA public key identified by key id.
    #[serde(rename = "RSA")]
    Rsa,
    /// ECC public key identified by key id.
    #[serde(rename = "ECC")]
    Ecc,
    /// No authentication; identity claimed verbatim.
    #[serde(rename = "NONE")]
    Unauthenticated,
    /// Unauthenticated identity qualified by a suffix.
    #[serde(rename = "NONE_SUFFIXED")]
    UnauthenticatedSuffixed,
    /// Authentication data protected by a master-token crypto context.
    #[serde(rename = "MT_PROTECTED")]
    MasterTokenProtected,
    /// Identity assigned by the service at provisioning time.
    #[serde(rename = "PROVISIONED")]
    Provisioned,
}

impl fmt::Display for EntityAuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preshared => "PSK",
            Self::PresharedProfile => "PSK_PROFILE",
            Self::X509 => "X509",
            Self::Rsa => "RSA",
            Self::Ecc => "ECC",
            Self::Unauthenticated => "NONE",
            Self::UnauthenticatedSuffixed => "NONE_SUFFIXED",
            Self::MasterTokenProtected => "MT_PROTECTED",
            Self::Provisioned => "PROVISIONED",
        };
        f.write_str(name)
    }
}

/// Entity authentication claim.
///
/// Immutable after construction; mutation is a compile-time impossibility.
/// Construct either directly from raw material (a certificate, an identity
/// string) or by parsing a wire object with [`Self::decode`].
#[derive(Debug, Clone)]
pub enum EntityAuthenticationData {
    /// Preshared-key entity.
    Preshared {
        /// Canonical entity identity.
        identity: String,
    },
    /// Preshared-key entity scoped by profile.
    PresharedProfile {
        /// Preshared key id.
        psk_id: String,
        /// Application profile.
        profile: String,
    },
    /// Entity identified by a leaf X.509 certificate. The identity is the
    /// certificate subject; it is never supplied independently.
    X509 {
        /// DER-encoded certificate, authoritative for the identity.
        certificate: Vec<u8>,
        /// Subject extracted from the certificate.
        identity: String,
    },
    /// Entity identified by a certificate chain without a leaf certificate.
    /// Chain validation is an external collaborator's responsibility, so the
    /// claimed identity is trusted verbatim here.
    X509Chain {
        /// DER-encoded certificates.
        chain: Vec<Vec<u8>>,
        /// Claimed entity identity.
        identity: String,
    },
    /// Entity holding an RSA key pair.
    Rsa {
        /// Canonical entity identity.
        identity: String,
        /// Identifier of the public key the service holds for this entity.
        pubkey_id: String,
    },
    /// Entity holding an ECC key pair.
    Ecc {
        /// Canonical entity identity.
        identity: String,
        /// Identifier of the public key the service holds for this entity.
        pubkey_id: String,
    },
    /// Unauthenticated entity.
    Unauthenticated {
        /// Claimed entity identity.
        identity: String,
    },
    /// Unauthenticated entity with a suffixed identity.
    UnauthenticatedSuffixed {
        /// Root identity.
        root: String,
        /// Suffix qualifying the root.
        suffix: String,
    },
    /// Encapsulated authentication data protected by a master-token crypto
    /// context. The ciphertext is produced once at construction so encoding
    /// stays byte-stable despite randomized encryption.
    MasterTokenProtected {
        /// Identity of the encapsulated authentication data.
        identity: String,
        /// Ciphertext of the encoded encapsulated claim.
        ciphertext: Vec<u8>,
        /// Signature over the ciphertext.
        signature: Vec<u8>,
    },
    /// Entity whose identity the service assigns at provisioning time.
    Provisioned,
}

#[derive(Serialize, Deserialize)]
struct AuthEnvelope {
    scheme: EntityAuthScheme,
    authdata: Value,
}

#[derive(Serialize, Deserialize)]
struct IdentityWire {
    identity: String,
}

#[derive(Serialize, Deserialize)]
struct ProfileWire {
    pskid: String,
    profile: String,
}

#[derive(Serialize, Deserialize)]
struct X509Wire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x509certificate: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x509chain: Option<Vec<Vec<u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct KeyIdWire {
    identity: String,
    pubkeyid: String,
}

#[derive(Serialize, Deserialize)]
struct SuffixedWire {
    root: String,
    suffix: String,
}

#[derive(Serialize, Deserialize)]
struct ProtectedWire {
    authdata: Vec<u8>,
    signature: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct EmptyWire {}

impl EntityAuthenticationData {
    /// Preshared-key claim.
    pub fn preshared(identity: impl Into<String>) -> Self {
        Self::Preshared { identity: identity.into() }
    }

    /// Profile-scoped preshared-key claim.
    pub fn preshared_profile(psk_id: impl Into<String>, profile: impl Into<String>) -> Self {
        Self::PresharedProfile { psk_id: psk_id.into(), profile: profile.into() }
    }

    /// X.509 claim from a DER-encoded leaf certificate.
    ///
    /// The identity is always recomputed from the certificate subject; there
    /// is deliberately no identity parameter, the certificate is
    /// authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::CertificateParse`] if the certificate cannot be
    /// decoded.
    pub fn x509(certificate_der: &[u8]) -> Result<Self, MslError> {
        let identity = certificate_subject(certificate_der)?;
        Ok(Self::X509 { certificate: certificate_der.to_vec(), identity })
    }

    /// X.509 claim from a certificate chain and a claimed identity.
    pub fn x509_chain(chain: Vec<Vec<u8>>, identity: impl Into<String>) -> Self {
        Self::X509Chain { chain, identity: identity.into() }
    }

    /// RSA claim.
    pub fn rsa(identity: impl Into<String>, pubkey_id: impl Into<String>) -> Self {
        Self::Rsa { identity: identity.into(), pubkey_id: pubkey_id.into() }
    }

    /// ECC claim.
    pub fn ecc(identity: impl Into<String>, pubkey_id: impl Into<String>) -> Self {
        Self::Ecc { identity: identity.into(), pubkey_id: pubkey_id.into() }
    }

    /// Unauthenticated claim.
    pub fn unauthenticated(identity: impl Into<String>) -> Self {
        Self::Unauthenticated { identity: identity.into() }
    }

    /// Unauthenticated claim with a suffixed identity.
    pub fn unauthenticated_suffixed(root: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::UnauthenticatedSuffixed { root: root.into(), suffix: suffix.into() }
    }

    /// Wrap an existing claim under a master-token crypto context.
    ///
    /// The encapsulated claim is encoded, encrypted, and signed once here;
    /// the stored ciphertext is replayed verbatim on every later encode.
    pub fn master_token_protected(
        encapsulated: &Self,
        crypto: &dyn CryptoContext,
    ) -> Result<Self, MslError> {
        let plaintext = encapsulated.encode()?;
        let ciphertext = crypto.encrypt(&plaintext)?;
        let signature = crypto.sign(&ciphertext)?;
        Ok(Self::MasterTokenProtected { identity: encapsulated.identity(), ciphertext, signature })
    }

    /// Claim for an entity awaiting a provisioned identity.
    #[must_use]
    pub fn provisioned() -> Self {
        Self::Provisioned
    }

    /// The authentication scheme of this claim.
    #[must_use]
    pub fn scheme(&self) -> EntityAuthScheme {
        match self {
            Self::Preshared { .. } => EntityAuthScheme::Preshared,
            Self::PresharedProfile { .. } => EntityAuthScheme::PresharedProfile,
            Self::X509 { .. } | Self::X509Chain { .. } => EntityAuthScheme::X509,
            Self::Rsa { .. } => EntityAuthScheme::Rsa,
            Self::Ecc { .. } => EntityAuthScheme::Ecc,
            Self::Unauthenticated { .. } => EntityAuthScheme::Unauthenticated,
            Self::UnauthenticatedSuffixed { .. } => EntityAuthScheme::UnauthenticatedSuffixed,
            Self::MasterTokenProtected { .. } => EntityAuthScheme::MasterTokenProtected,
            Self::Provisioned => EntityAuthScheme::Provisioned,
        }
    }

    /// The canonical entity identity. Never fails once constructed; a
    /// provisioned claim reports the empty identity until the service
    /// assigns one.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Preshared { identity }
            | Self::X509 { identity, .. }
            | Self::X509Chain { identity, .. }
            | Self::Rsa { identity, .. }
            | Self::Ecc { identity, .. }
            | Self::Unauthenticated { identity }
            | Self::MasterTokenProtected { identity, .. } => identity.clone(),
            Self::PresharedProfile { psk_id, profile } => {
                format!("{psk_id}{PROFILE_CONCAT_CHAR}{profile}")
            },
            Self::UnauthenticatedSuffixed { root, suffix } => {
                format!("{root}{SUFFIX_CONCAT_CHAR}{suffix}")
            },
            Self::Provisioned => String::new(),
        }
    }

    /// Serialize to a CBOR wire object.
    ///
    /// Stable: encoding, decoding, and re-encoding yields byte-identical
    /// output.
    pub fn encode(&self) -> Result<Vec<u8>, MslError> {
        let authdata = match self {
            Self::Preshared { identity } | Self::Unauthenticated { identity } => {
                to_value(&IdentityWire { identity: identity.clone() })?
            },
            Self::PresharedProfile { psk_id, profile } => {
                to_value(&ProfileWire { pskid: psk_id.clone(), profile: profile.clone() })?
            },
            Self::X509 { certificate, .. } => to_value(&X509Wire {
                x509certificate: Some(certificate.clone()),
                x509chain: None,
                identity: None,
            })?,
            Self::X509Chain { chain, identity } => to_value(&X509Wire {
                x509certificate: None,
                x509chain: Some(chain.clone()),
                identity: Some(identity.clone()),
            })?,
            Self::Rsa { identity, pubkey_id } | Self::Ecc { identity, pubkey_id } => {
                to_value(&KeyIdWire { identity: identity.clone(), pubkeyid: pubkey_id.clone() })?
            },
            Self::UnauthenticatedSuffixed { root, suffix } => {
                to_value(&SuffixedWire { root: root.clone(), suffix: suffix.clone() })?
            },
            Self::MasterTokenProtected { ciphertext, signature, .. } => to_value(&ProtectedWire {
                authdata: ciphertext.clone(),
                signature: signature.clone(),
            })?,
            Self::Provisioned => to_value(&EmptyWire {})?,
        };

        let envelope = AuthEnvelope { scheme: self.scheme(), authdata };
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&envelope, &mut buf)
            .map_err(|e| MslError::Encoding(ProtocolError::Encode(e.to_string())))?;
        Ok(buf)
    }

    /// Parse a wire object, dispatching on the embedded scheme tag.
    ///
    /// # Errors
    ///
    /// [`MslError::Encoding`] if required fields are absent or malformed,
    /// [`MslError::CertificateParse`] if certificate material cannot be
    /// decoded, and [`MslError::Crypto`] if master-token-protected data
    /// fails verification or decryption under `ctx`'s MSL crypto context.
    pub fn decode(bytes: &[u8], ctx: &dyn MslContext) -> Result<Self, MslError> {
        let envelope: AuthEnvelope = ciborium::de::from_reader(bytes)
            .map_err(|e| MslError::Encoding(ProtocolError::Decode(e.to_string())))?;

        match envelope.scheme {
            EntityAuthScheme::Preshared => {
                let wire: IdentityWire = from_value(envelope.authdata)?;
                Ok(Self::preshared(wire.identity))
            },
            EntityAuthScheme::PresharedProfile => {
                let wire: ProfileWire = from_value(envelope.authdata)?;
                Ok(Self::preshared_profile(wire.pskid, wire.profile))
            },
            EntityAuthScheme::X509 => {
                let wire: X509Wire = from_value(envelope.authdata)?;
                // A raw certificate is authoritative: identity comes from the
                // subject and any supplied identity field is ignored.
                if let Some(certificate) = wire.x509certificate {
                    return Self::x509(&certificate);
                }
                let Some(chain) = wire.x509chain else {
                    return Err(ProtocolError::MissingField("x509certificate").into());
                };
                let Some(identity) = wire.identity else {
                    return Err(ProtocolError::MissingField("identity").into());
                };
                Ok(Self::x509_chain(chain, identity))
            },
            EntityAuthScheme::Rsa => {
                let wire: KeyIdWire = from_value(envelope.authdata)?;
                Ok(Self::rsa(wire.identity, wire.pubkeyid))
            },
            EntityAuthScheme::Ecc => {
                let wire: KeyIdWire = from_value(envelope.authdata)?;
                Ok(Self::ecc(wire.identity, wire.pubkeyid))
            },
            EntityAuthScheme::Unauthenticated => {
                let wire: IdentityWire = from_value(envelope.authdata)?;
                Ok(Self::unauthenticated(wire.identity))
            },
            EntityAuthScheme::UnauthenticatedSuffixed => {
                let wire: SuffixedWire = from_value(envelope.authdata)?;
                Ok(Self::unauthenticated_suffixed(wire.root, wire.suffix))
            },
            EntityAuthScheme::MasterTokenProtected => {
                let wire: ProtectedWire = from_value(envelope.authdata)?;
                let crypto = ctx.msl_crypto_context();
                if !crypto.verify(&wire.authdata, &wire.signature)? {
                    return Err(CryptoError::SignatureMismatch.into());
                }
                let plaintext = crypto.decrypt(&wire.authdata)?;
                let encapsulated = Self::decode(&plaintext, ctx)?;
                Ok(Self::MasterTokenProtected {
                    identity: encapsulated.identity(),
                    ciphertext: wire.authdata,
                    signature: wire.signature,
                })
            },
            EntityAuthScheme::Provisioned => {
                let _: EmptyWire = from_value(envelope.authdata)?;
                Ok(Self::Provisioned)
            },
        }
    }
}

/// Identity-based equality: same scheme and same canonical identity, plus
/// the public key id where the scheme defines one. Two X.509 claims with
/// different certificate bytes but the same subject are equal by design.
impl PartialEq for EntityAuthenticationData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Rsa { identity: a, pubkey_id: ka },
                Self::Rsa { identity: b, pubkey_id: kb },
            )
            | (
                Self::Ecc { identity: a, pubkey_id: ka },
                Self::Ecc { identity: b, pubkey_id: kb },
            ) => a == b && ka == kb,
            _ => self.scheme() == other.scheme() && self.identity() == other.identity(),
        }
    }
}

impl Eq for EntityAuthenticationData {}

/// Produces a scheme-specific crypto context for parsed authentication data.
///
/// Factories are the pluggable half of scheme dispatch: the variant set is
/// closed, but which factories are registered (and therefore which schemes a
/// context accepts) can change at runtime.
pub trait EntityAuthenticationFactory: Send + Sync {
    /// Scheme this factory handles.
    fn scheme(&self) -> EntityAuthScheme;

    /// Crypto context for the given authentication data.
    fn crypto_context(
        &self,
        ctx: &dyn MslContext,
        data: &EntityAuthenticationData,
    ) -> Result<std::sync::Arc<dyn CryptoContext>, MslError>;
}

fn to_value<T: Serialize>(wire: &T) -> Result<Value, MslError> {
    Value::serialized(wire).map_err(|e| MslError::Encoding(ProtocolError::Encode(e.to_string())))
}

fn from_value<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, MslError> {
    value.deserialized().map_err(|e| MslError::Encoding(ProtocolError::Decode(e.to_string())))
}

#[cfg(test)]
mod tests;
