// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RSA key generation and PKCS#10 certificate signing request construction.

use crate::{cryptography::InMemoryRsaKey, AppleCodesignError};
use bcder::BitString;
use rsa::{pkcs1::ToRsaPublicKey, RsaPrivateKey as RsaConstructedKey};
use x509_certificate::{
    rfc2986::{CertificationRequest, CertificationRequestInfo, Version},
    rfc3280::Name,
    rfc5280::SubjectPublicKeyInfo,
    rfc5958::Attributes,
    KeyAlgorithm, Sign,
};

/// Generate a new in-memory RSA key pair, per spec §4.1 `generate_rsa_keypair`.
///
/// `bits` is normally 2048, matching the key size Apple's developer portal
/// expects for free-tier signing certificates.
pub fn generate_rsa_keypair(bits: usize) -> Result<InMemoryRsaKey, AppleCodesignError> {
    InMemoryRsaKey::generate(bits)
}

/// Build a PKCS#10 certificate signing request for `private_key` with subject
/// `CN=<common_name>, C=US`, signed with SHA-256, per spec §4.1 `build_csr`.
///
/// Returns the PEM-encoded request.
pub fn build_csr(private_key: &InMemoryRsaKey, common_name: &str) -> Result<Vec<u8>, AppleCodesignError> {
    let mut subject = Name::default();
    subject
        .append_common_name_utf8_string(common_name)
        .map_err(|e| AppleCodesignError::CertificateBuildError(format!("{:?}", e)))?;
    subject
        .append_country_utf8_string("US")
        .map_err(|e| AppleCodesignError::CertificateBuildError(format!("{:?}", e)))?;

    let public_key = RsaConstructedKey::from(private_key).to_public_key();
    let der = public_key
        .to_pkcs1_der()
        .map_err(|e| AppleCodesignError::CertificateBuildError(format!("{}", e)))?
        .as_der()
        .to_vec();

    let subject_public_key_info = SubjectPublicKeyInfo {
        algorithm: KeyAlgorithm::Rsa.into(),
        subject_public_key: BitString::new(0, der.into()),
    };

    let certificate_request_info = CertificationRequestInfo {
        version: Version::V1,
        subject,
        subject_public_key_info,
        attributes: Attributes::default(),
    };

    let mut tbs = vec![];
    bcder::encode::Values::write_encoded(
        &certificate_request_info.encode_ref(),
        bcder::Mode::Der,
        &mut tbs,
    )
    .map_err(|e| AppleCodesignError::CertificateBuildError(e.to_string()))?;

    let signing_key_pair: x509_certificate::InMemorySigningKeyPair =
        private_key.clone().try_into()?;
    let (signature, signature_algorithm) = signing_key_pair.sign(&tbs)?;

    let csr = CertificationRequest {
        certificate_request_info,
        signature_algorithm: signature_algorithm.into(),
        signature: BitString::new(0, signature.into()),
    };

    let pem = csr
        .encode_pem()
        .map_err(|e| AppleCodesignError::CertificateBuildError(e.to_string()))?;

    Ok(pem.into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generate_and_build() {
        let key = generate_rsa_keypair(2048).unwrap();
        let pem = build_csr(&key, "iOS Development").unwrap();
        let pem = String::from_utf8(pem).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert!(pem.trim_end().ends_with("-----END CERTIFICATE REQUEST-----"));
    }
}
