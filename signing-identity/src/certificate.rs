// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [Certificate] data model.

use chrono::{DateTime, Utc};

/// The kind of signing certificate, as guessed from its common name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CertificateVariant {
    /// `Apple Development` / `iPhone Developer` style certificate.
    Development,
    /// `Apple Distribution` / `iPhone Distribution` style certificate.
    Distribution,
    /// A certificate minted through the free-tier (Apple ID only) signing
    /// flow rather than a paid developer account.
    Free,
    /// Common name didn't match any recognized pattern.
    Unknown,
}

/// A signing certificate paired with, optionally, its private key.
///
/// Instances are produced by parsing a PKCS#12 container or a bare X.509 DER
/// certificate. The `private_key_pem` field is only populated when the
/// certificate was extracted alongside its key (i.e. from a `.p12`).
#[derive(Clone, Debug)]
pub struct Certificate {
    /// Serial number, rendered as uppercase hex.
    pub serial_number: String,
    /// Subject common name, e.g. `Apple Development: Jane Doe (ABCDE12345)`.
    pub common_name: String,
    /// The 10 character alphanumeric team identifier, if present in the
    /// subject's organizational-unit field.
    pub team_id: Option<String>,
    pub variant: CertificateVariant,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub sha1_fingerprint: [u8; 20],
    pub sha256_fingerprint: [u8; 32],
    /// DER encoding of the certificate.
    pub der_bytes: Vec<u8>,
    /// Private key, in PKCS#8 PEM form, if one was imported alongside the
    /// certificate (e.g. from a `.p12`).
    pub private_key_pem: Option<String>,
}

impl Certificate {
    /// Whether `not_before <= now <= not_after`.
    pub fn is_temporally_valid(&self) -> bool {
        let now = Utc::now();
        self.not_before <= now && now <= self.not_after
    }

    /// SHA-1 fingerprint rendered as lowercase hex, Apple's conventional form.
    pub fn sha1_hex(&self) -> String {
        hex::encode(self.sha1_fingerprint)
    }

    /// SHA-256 fingerprint rendered as lowercase hex.
    pub fn sha256_hex(&self) -> String {
        hex::encode(self.sha256_fingerprint)
    }

    /// Guess a [CertificateVariant] from a certificate's common name.
    ///
    /// Matches case-insensitively: `development`/`developer` anywhere in the
    /// name implies [CertificateVariant::Development]; `distribution` implies
    /// [CertificateVariant::Distribution]. Free-tier certificates are
    /// classified by their issuing flow, not their common name, so callers
    /// that know a certificate came from the weekly/free pipeline should
    /// override this guess with [CertificateVariant::Free].
    pub fn guess_variant_from_common_name(common_name: &str) -> CertificateVariant {
        let lower = common_name.to_lowercase();

        if lower.contains("development") || lower.contains("developer") {
            CertificateVariant::Development
        } else if lower.contains("distribution") {
            CertificateVariant::Distribution
        } else {
            CertificateVariant::Unknown
        }
    }
}
