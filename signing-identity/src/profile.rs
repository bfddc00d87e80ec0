// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [ProvisioningProfile] data model.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// What a provisioning profile authorizes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileVariant {
    Development,
    AdHoc,
    AppStore,
    Enterprise,
}

/// A parsed `.mobileprovision`.
///
/// The `raw_data` field retains the full signed CMS envelope verbatim, since
/// `sign_archive` embeds it byte-for-byte into the output bundle rather than
/// re-serializing the parsed plist.
#[derive(Clone, Debug)]
pub struct ProvisioningProfile {
    pub uuid: String,
    pub name: String,
    /// `TeamIdentifier[0]` from the payload plist.
    pub team_id: String,
    /// The application-identifier pattern, e.g. `ABCDE12345.com.example.*`.
    pub app_id_pattern: String,
    pub variant: ProfileVariant,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub provisioned_devices: BTreeSet<String>,
    pub entitlements: plist::Dictionary,
    pub developer_certificates: Vec<Vec<u8>>,
    /// The full signed CMS bytes, retained verbatim for re-embedding.
    pub raw_data: Vec<u8>,
}

impl ProvisioningProfile {
    /// Whether `not_before <= now <= not_after`.
    pub fn is_temporally_valid(&self) -> bool {
        let now = Utc::now();
        self.not_before <= now && now <= self.not_after
    }

    /// The bundle-id portion of [Self::app_id_pattern], i.e. everything after
    /// the first `.`.
    ///
    /// Per spec §3: `app_id_pattern` is `<team-id>.<bundle-id-pattern>`.
    pub fn bundle_id_pattern(&self) -> &str {
        self.app_id_pattern
            .split_once('.')
            .map(|(_, rest)| rest)
            .unwrap_or("*")
    }

    /// Resolve the effective bundle id for an app whose current bundle id is
    /// `current_bundle_id`, per spec §4.3 step 3.
    pub fn resolve_bundle_id(&self, current_bundle_id: &str) -> String {
        let pattern = self.bundle_id_pattern();

        if pattern == "*" {
            current_bundle_id.to_string()
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            if current_bundle_id.starts_with(prefix) {
                current_bundle_id.to_string()
            } else {
                let last_segment = current_bundle_id
                    .rsplit('.')
                    .next()
                    .unwrap_or(current_bundle_id);
                format!("{prefix}{last_segment}")
            }
        } else {
            pattern.to_string()
        }
    }

    /// Whether `fingerprint` (SHA-1 over a certificate's DER encoding)
    /// appears among [Self::developer_certificates].
    pub fn contains_certificate_fingerprint(&self, fingerprint: &[u8; 20]) -> bool {
        self.developer_certificates.iter().any(|der| {
            use sha1::{Digest, Sha1};
            let digest = Sha1::digest(der);
            digest.as_slice() == fingerprint
        })
    }
}
