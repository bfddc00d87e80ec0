// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Validation failures arising from the linkage between a [crate::Certificate]
/// and a [crate::ProvisioningProfile], or malformed data within either.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("certificate has expired")]
    CertificateExpired,

    #[error("provisioning profile has expired")]
    ProfileExpired,

    #[error("certificate team id ({certificate}) does not match profile team id ({profile})")]
    TeamIdMismatch {
        certificate: String,
        profile: String,
    },

    #[error("signing certificate's fingerprint was not found among the profile's embedded certificates")]
    CertificateNotInProfile,

    #[error("provisioning profile is malformed: {0}")]
    MalformedProfile(String),

    #[error("UDID {0:?} does not match the expected 40 hex character form")]
    InvalidUdid(String),
}

impl IdentityError {
    /// Whether this failure kind should ever be retried. All identity
    /// validation failures are permanent per spec §7 ("validation failures
    /// are always surfaced (no retry)").
    pub fn is_retryable(&self) -> bool {
        false
    }
}
