use std::{sync::Arc, time::SystemTime};

use mantle_crypto::{CryptoContext, SymmetricCryptoContext};
use mantle_proto::MessageCapabilities;
use proptest::prelude::*;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

use super::{
    AuthEnvelope, EntityAuthScheme, EntityAuthenticationData, EntityAuthenticationFactory,
    X509Wire, to_value,
};
use crate::{
    context::{MslContext, MslStore, TokenFactory},
    error::MslError,
};

struct TestTokenFactory;

impl TokenFactory for TestTokenFactory {
    fn new_serial_number(&self) -> u64 {
        1
    }
}

struct TestStore;

impl MslStore for TestStore {
    fn set_crypto_context(&self, _identity: &str, _crypto: Arc<dyn CryptoContext>) {}

    fn crypto_context(&self, _identity: &str) -> Option<Arc<dyn CryptoContext>> {
        None
    }

    fn clear_crypto_context(&self, _identity: &str) {}
}

struct TestContext {
    crypto: Arc<dyn CryptoContext>,
}

impl TestContext {
    fn new() -> Self {
        let crypto = SymmetricCryptoContext::derive(b"entity auth tests", "msl").unwrap();
        Self { crypto: Arc::new(crypto) }
    }
}

impl MslContext for TestContext {
    fn time(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random(&self) -> u64 {
        4
    }

    fn is_peer_to_peer(&self) -> bool {
        false
    }

    fn message_capabilities(&self) -> Option<MessageCapabilities> {
        None
    }

    fn entity_authentication_data(&self) -> EntityAuthenticationData {
        EntityAuthenticationData::unauthenticated("test-entity")
    }

    fn msl_crypto_context(&self) -> Arc<dyn CryptoContext> {
        Arc::clone(&self.crypto)
    }

    fn entity_authentication_factory(
        &self,
        _scheme: EntityAuthScheme,
    ) -> Option<Arc<dyn EntityAuthenticationFactory>> {
        None
    }

    fn token_factory(&self) -> Arc<dyn TokenFactory> {
        Arc::new(TestTokenFactory)
    }

    fn store(&self) -> Arc<dyn MslStore> {
        Arc::new(TestStore)
    }
}

fn certificate_der(common_name: &str) -> Vec<u8> {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    let mut params = CertificateParams::default();
    params.distinguished_name = dn;
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    cert.der().as_ref().to_vec()
}

fn assert_roundtrip(data: &EntityAuthenticationData, ctx: &TestContext) {
    let bytes = data.encode().unwrap();
    let parsed = EntityAuthenticationData::decode(&bytes, ctx).unwrap();
    assert_eq!(&parsed, data);
    assert_eq!(parsed.scheme(), data.scheme());
    assert_eq!(parsed.identity(), data.identity());
    // Re-serialization must be byte-identical.
    assert_eq!(hex::encode(parsed.encode().unwrap()), hex::encode(&bytes));
}

#[test]
fn all_variants_roundtrip() {
    let ctx = TestContext::new();
    let cert = certificate_der("roundtrip.entity");

    let variants = vec![
        EntityAuthenticationData::preshared("psk-entity"),
        EntityAuthenticationData::preshared_profile("psk-entity", "profile-1"),
        EntityAuthenticationData::x509(&cert).unwrap(),
        EntityAuthenticationData::x509_chain(vec![cert.clone(), cert], "chain-entity"),
        EntityAuthenticationData::rsa("rsa-entity", "key-1"),
        EntityAuthenticationData::ecc("ecc-entity", "key-2"),
        EntityAuthenticationData::unauthenticated("anon-entity"),
        EntityAuthenticationData::unauthenticated_suffixed("root-entity", "suffix"),
        EntityAuthenticationData::provisioned(),
    ];

    for data in &variants {
        assert_roundtrip(data, &ctx);
    }
}

#[test]
fn identity_concatenation() {
    let profile = EntityAuthenticationData::preshared_profile("device", "tv");
    assert_eq!(profile.identity(), "device-tv");

    let suffixed = EntityAuthenticationData::unauthenticated_suffixed("device", "living-room");
    assert_eq!(suffixed.identity(), "device.living-room");

    assert_eq!(EntityAuthenticationData::provisioned().identity(), "");
}

#[test]
fn x509_identity_comes_from_certificate_subject() {
    let cert = certificate_der("subject.entity");
    let data = EntityAuthenticationData::x509(&cert).unwrap();
    assert!(data.identity().contains("subject.entity"));
    assert_eq!(data.scheme(), EntityAuthScheme::X509);
}

#[test]
fn x509_wire_identity_is_ignored_when_certificate_present() {
    // A wire object carrying both a certificate and an identity field: the
    // certificate is authoritative and the supplied identity is discarded.
    let ctx = TestContext::new();
    let cert = certificate_der("authoritative.entity");
    let envelope = AuthEnvelope {
        scheme: EntityAuthScheme::X509,
        authdata: to_value(&X509Wire {
            x509certificate: Some(cert),
            x509chain: None,
            identity: Some("spoofed.entity".into()),
        })
        .unwrap(),
    };
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&envelope, &mut bytes).unwrap();

    let parsed = EntityAuthenticationData::decode(&bytes, &ctx).unwrap();
    assert!(parsed.identity().contains("authoritative.entity"));
    assert!(!parsed.identity().contains("spoofed.entity"));
}

#[test]
fn x509_chain_trusts_supplied_identity() {
    let cert = certificate_der("chain.link");
    let data = EntityAuthenticationData::x509_chain(vec![cert], "claimed.entity");
    assert_eq!(data.identity(), "claimed.entity");
}

#[test]
fn x509_chain_without_identity_is_missing_field() {
    let ctx = TestContext::new();
    let envelope = AuthEnvelope {
        scheme: EntityAuthScheme::X509,
        authdata: to_value(&X509Wire {
            x509certificate: None,
            x509chain: Some(vec![certificate_der("chain.link")]),
            identity: None,
        })
        .unwrap(),
    };
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&envelope, &mut bytes).unwrap();

    let err = EntityAuthenticationData::decode(&bytes, &ctx).unwrap_err();
    assert!(matches!(err, MslError::Encoding(_)));
}

#[test]
fn bad_certificate_is_a_parse_error() {
    let err = EntityAuthenticationData::x509(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
    assert!(matches!(err, MslError::CertificateParse(_)));
}

#[test]
fn missing_identity_is_an_encoding_error() {
    let ctx = TestContext::new();
    let envelope = AuthEnvelope {
        scheme: EntityAuthScheme::Preshared,
        authdata: ciborium::Value::Map(Vec::new()),
    };
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&envelope, &mut bytes).unwrap();

    let err = EntityAuthenticationData::decode(&bytes, &ctx).unwrap_err();
    assert!(matches!(err, MslError::Encoding(_)));
}

#[test]
fn garbage_wire_object_is_an_encoding_error() {
    let ctx = TestContext::new();
    let err = EntityAuthenticationData::decode(&[0xff, 0x00, 0x13], &ctx).unwrap_err();
    assert!(matches!(err, MslError::Encoding(_)));
}

#[test]
fn master_token_protected_roundtrip() {
    let ctx = TestContext::new();
    let inner = EntityAuthenticationData::preshared("wrapped-entity");
    let protected = EntityAuthenticationData::master_token_protected(
        &inner,
        ctx.msl_crypto_context().as_ref(),
    )
    .unwrap();

    assert_eq!(protected.scheme(), EntityAuthScheme::MasterTokenProtected);
    assert_eq!(protected.identity(), "wrapped-entity");
    assert_roundtrip(&protected, &ctx);
}

#[test]
fn master_token_protected_rejects_tampering() {
    let ctx = TestContext::new();
    let inner = EntityAuthenticationData::preshared("wrapped-entity");
    let protected = EntityAuthenticationData::master_token_protected(
        &inner,
        ctx.msl_crypto_context().as_ref(),
    )
    .unwrap();

    let EntityAuthenticationData::MasterTokenProtected { identity, ciphertext, mut signature } =
        protected
    else {
        unreachable!("constructed above");
    };
    signature[0] ^= 0x01;
    let tampered =
        EntityAuthenticationData::MasterTokenProtected { identity, ciphertext, signature };

    let err = EntityAuthenticationData::decode(&tampered.encode().unwrap(), &ctx).unwrap_err();
    assert!(matches!(err, MslError::Crypto(_)));
}

#[test]
fn equality_is_identity_based() {
    let a = EntityAuthenticationData::preshared("entity-A");
    let a2 = EntityAuthenticationData::preshared("entity-A");
    let b = EntityAuthenticationData::preshared("entity-B");

    // Reflexive and symmetric over identity.
    assert_eq!(a, a);
    assert_eq!(a, a2);
    assert_eq!(a2, a);
    assert_ne!(a, b);

    // Same identity under a different scheme is a different claim.
    assert_ne!(a, EntityAuthenticationData::unauthenticated("entity-A"));
}

#[test]
fn x509_equality_follows_the_subject() {
    // Two distinct certificates (fresh keys) with the same subject are the
    // same entity.
    let first = EntityAuthenticationData::x509(&certificate_der("shared.subject")).unwrap();
    let second = EntityAuthenticationData::x509(&certificate_der("shared.subject")).unwrap();
    let other = EntityAuthenticationData::x509(&certificate_der("other.subject")).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn key_id_participates_in_equality() {
    let a = EntityAuthenticationData::rsa("entity", "key-1");
    let b = EntityAuthenticationData::rsa("entity", "key-2");
    assert_ne!(a, b);
    assert_eq!(a, EntityAuthenticationData::rsa("entity", "key-1"));

    let c = EntityAuthenticationData::ecc("entity", "key-1");
    let d = EntityAuthenticationData::ecc("entity", "key-2");
    assert_ne!(c, d);
}

proptest! {
    #[test]
    fn simple_variants_roundtrip(identity in "[a-z0-9.-]{1,48}", pubkey_id in "[a-z0-9]{1,16}") {
        let ctx = TestContext::new();
        for data in [
            EntityAuthenticationData::preshared(identity.clone()),
            EntityAuthenticationData::unauthenticated(identity.clone()),
            EntityAuthenticationData::rsa(identity.clone(), pubkey_id.clone()),
            EntityAuthenticationData::ecc(identity, pubkey_id),
        ] {
            let bytes = data.encode().unwrap();
            let parsed = EntityAuthenticationData::decode(&bytes, &ctx).unwrap();
            prop_assert_eq!(&parsed, &data);
            prop_assert_eq!(parsed.encode().unwrap(), bytes);
        }
    }
}
