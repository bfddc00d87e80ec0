// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data model shared by every stage of the IPA signing engine.
//!
//! This crate holds no I/O: [Certificate] and [ProvisioningProfile] are
//! produced by parsing in `ipasign-core`; [SigningIdentity] validates the
//! linkage between them. Keeping the model I/O-free lets every other crate
//! (and their test suites) construct fixtures without touching PKCS#12, CMS,
//! or the filesystem.

mod app_info;
mod certificate;
mod error;
mod identity;
mod profile;
mod signing_result;

pub use app_info::AppInfo;
pub use certificate::{Certificate, CertificateVariant};
pub use error::IdentityError;
pub use identity::{validate_udid, SigningIdentity, SigningMethod};
pub use profile::{ProfileVariant, ProvisioningProfile};
pub use signing_result::SigningResult;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    fn cert(team_id: &str, sha1: [u8; 20]) -> Certificate {
        Certificate {
            serial_number: "01".to_string(),
            common_name: "Apple Development: A (XYZ)".to_string(),
            team_id: Some(team_id.to_string()),
            variant: CertificateVariant::Development,
            not_before: Utc::now() - Duration::days(1),
            not_after: Utc::now() + Duration::days(300),
            sha1_fingerprint: sha1,
            sha256_fingerprint: [0u8; 32],
            der_bytes: vec![1, 2, 3],
            private_key_pem: None,
        }
    }

    fn profile(team_id: &str, pattern: &str, certs: Vec<Vec<u8>>) -> ProvisioningProfile {
        ProvisioningProfile {
            uuid: "11111111-1111-1111-1111-111111111111".to_string(),
            name: "Test".to_string(),
            team_id: team_id.to_string(),
            app_id_pattern: format!("{team_id}.{pattern}"),
            variant: ProfileVariant::Development,
            not_before: Utc::now() - Duration::days(1),
            not_after: Utc::now() + Duration::days(300),
            provisioned_devices: BTreeSet::new(),
            entitlements: plist::Dictionary::new(),
            developer_certificates: certs,
            raw_data: vec![9, 9, 9],
        }
    }

    #[test]
    fn resolve_bundle_id_wildcard_prefix_match() {
        let p = profile("ABCDE12345", "com.example.*", vec![]);
        assert_eq!(p.resolve_bundle_id("com.example.foo"), "com.example.foo");
    }

    #[test]
    fn resolve_bundle_id_wildcard_no_match_rewrites_last_segment() {
        let p = profile("ABCDE12345", "com.example.*", vec![]);
        assert_eq!(p.resolve_bundle_id("com.other.bar"), "com.example.bar");
    }

    #[test]
    fn resolve_bundle_id_bare_wildcard_keeps_original() {
        let p = profile("ABCDE12345", "*", vec![]);
        assert_eq!(p.resolve_bundle_id("com.example.foo"), "com.example.foo");
    }

    #[test]
    fn resolve_bundle_id_concrete_pattern_wins() {
        let p = profile("ABCDE12345", "com.example.demo", vec![]);
        assert_eq!(p.resolve_bundle_id("com.whatever"), "com.example.demo");
    }

    #[test]
    fn identity_requires_matching_team_id() {
        use sha1::{Digest, Sha1};
        let der = vec![4, 5, 6];
        let fp: [u8; 20] = Sha1::digest(&der).into();
        let c = cert("ABCDE12345", fp);
        let p = profile("FGHIJ67890", "*", vec![der]);
        let err = SigningIdentity::new(c, p, SigningMethod::Annual).unwrap_err();
        assert!(matches!(err, IdentityError::TeamIdMismatch { .. }));
    }

    #[test]
    fn identity_requires_certificate_in_profile() {
        let c = cert("ABCDE12345", [0u8; 20]);
        let p = profile("ABCDE12345", "*", vec![vec![7, 7, 7]]);
        let err = SigningIdentity::new(c, p, SigningMethod::Annual).unwrap_err();
        assert!(matches!(err, IdentityError::CertificateNotInProfile));
    }

    #[test]
    fn identity_succeeds_when_linked() {
        use sha1::{Digest, Sha1};
        let der = vec![4, 5, 6];
        let fp: [u8; 20] = Sha1::digest(&der).into();
        let c = cert("ABCDE12345", fp);
        let p = profile("ABCDE12345", "*", vec![der]);
        assert!(SigningIdentity::new(c, p, SigningMethod::Annual).is_ok());
    }

    #[test]
    fn udid_validator_accepts_exact_language() {
        assert!(validate_udid(&"A".repeat(40)).is_ok());
        assert!(validate_udid(&"a".repeat(40)).is_ok());
        assert!(validate_udid("00008101-001A2D8E3C02").is_err());
        assert!(validate_udid(&"G".repeat(40)).is_err());
    }
}
