// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Failures arising from C6 (the free-tier developer-services client).
///
/// Apple does not return quota-remaining metadata on success (spec §9):
/// `CertQuotaExceeded`/`AppIdQuotaExceeded`/`DeviceQuotaExceeded` are only
/// observable by a creation call failing, so these variants carry Apple's
/// raw error text rather than a count.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("session has expired; re-authenticate")]
    SessionExpired,

    #[error("unable to determine remaining quota")]
    QuotaUnknown,

    #[error("weekly certificate quota (3/week) exceeded: {0}")]
    CertQuotaExceeded(String),

    #[error("certificate signing request was rejected: {0}")]
    CsrRejected(String),

    #[error("weekly app id quota (10/week) exceeded: {0}")]
    AppIdQuotaExceeded(String),

    #[error("invalid bundle identifier: {0}")]
    InvalidBundleId(String),

    #[error("invalid device UDID: {0}")]
    InvalidUdid(String),

    #[error("device quota (100) exceeded: {0}")]
    DeviceQuotaExceeded(String),

    #[error("failed to create provisioning profile: {0}")]
    ProfileCreationFailed(String),

    #[error("certificate not found: {0}")]
    CertNotFound(String),

    #[error("Apple API returned HTTP {status}: {detail}")]
    ApiError { status: u16, detail: String },

    #[error("Apple service is temporarily unavailable")]
    ServiceUnavailable,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("crypto/profile error: {0}")]
    Core(#[from] ipasign_core::AppleCodesignError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisioningError {
    /// Transient failures retried up to twice with 500ms exponential
    /// backoff, per spec §7.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProvisioningError::ServiceUnavailable)
    }
}
