// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::PendingVerification;
use thiserror::Error;

/// Failures arising from C5 (Apple ID authentication).
///
/// Mirrors the "auth", "remote", and "io" kinds from spec §7 that are
/// observable at this layer; `ApiError`/`ServiceUnavailable` are shared with
/// `ipasign-provisioning`, which reuses this type for its own requests since
/// both crates sit on the same Apple session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("incorrect Apple ID or password")]
    BadCredentials,

    #[error("account is locked or requires verification at appleid.apple.com")]
    AccountLocked,

    /// Not a terminal failure: the state machine suspends here pending a
    /// user-supplied code. Carries the session handle needed to resume via
    /// [crate::AuthClient::authenticate_with_code].
    #[error("two-factor authentication code required")]
    TwoFactorRequired(PendingVerification),

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired or already used")]
    CodeExpired,

    #[error("unable to obtain anisette data from any configured server: {0}")]
    AnisetteUnavailable(String),

    #[error("Apple API returned HTTP {status}: {detail}")]
    ApiError { status: u16, detail: String },

    #[error("Apple service is temporarily unavailable")]
    ServiceUnavailable,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Transient failures retried up to twice with 500ms exponential
    /// backoff, per spec §7.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable)
    }
}
