// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [AuthClient]: the C5 state machine driving Apple ID authentication.

use crate::{
    anisette::{fetch_anisette, AnisetteHeaders, DEFAULT_ANISETTE_SERVERS},
    session::AppleSession,
    AuthError,
};
use log::{info, warn};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

const AUTH_ENDPOINT: &str = "https://idmsa.apple.com/appleauth/auth";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const WIDGET_KEY: &str = "e0b80c3bf78523bfe80974d320935bfa30add02e1bff88ec2166c6bd5a706c42";
const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Configuration for an [AuthClient].
#[derive(Clone, Debug)]
pub struct AuthClientConfig {
    /// Anisette servers tried in order, per spec §4.5/§6.
    pub anisette_servers: Vec<String>,
    /// Per-request timeout, overriding [REQUEST_TIMEOUT]. Mirrors the
    /// `timeout_seconds` option from spec §6.
    pub timeout: Duration,
}

impl Default for AuthClientConfig {
    fn default() -> Self {
        Self {
            anisette_servers: DEFAULT_ANISETTE_SERVERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// The state a caller must hold to resume authentication after a two-factor
/// challenge. Carries exactly the anisette bundle and anti-replay nonces
/// captured during `initiate`, per the design note that illegal
/// transitions (verifying a code before authenticating) be unrepresentable:
/// there is no way to construct one of these outside this crate, so
/// [AuthClient::authenticate_with_code] can only ever be called with a
/// handle this crate itself produced.
#[derive(Clone, Debug)]
pub struct PendingVerification {
    anisette: AnisetteHeaders,
    scnt: String,
    session_id: String,
}

/// A single authentication attempt's state machine, per spec §4.5.
///
/// ```text
/// START --fetch_anisette--> READY --initiate--> CHALLENGED
///                              |-- password-only success --> AUTHENTICATED
///                              `-- 2FA required --> AWAITING_CODE
///                                     |-- verify(code) OK --> AUTHENTICATED
///                                     `-- invalid/expired --> FAILED
/// ```
///
/// `authenticate` drives START through CHALLENGED in one call; a 2FA
/// requirement surfaces as `Err(AuthError::TwoFactorRequired(pending))`
/// rather than advancing further, and `authenticate_with_code` resumes from
/// AWAITING_CODE using the carried [PendingVerification].
pub struct AuthClient {
    http: reqwest::blocking::Client,
    config: AuthClientConfig,
    cancelled: AtomicBool,
}

impl AuthClient {
    pub fn new(config: AuthClientConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            config,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request that any in-flight or subsequent call on this client fail
    /// with [AuthError::Cancelled]. Cooperative: the next I/O point observes
    /// it, per spec §5.
    pub fn abort(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> Result<(), AuthError> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(AuthError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `f`, retrying up to [MAX_RETRIES] times with exponential backoff
    /// starting at [RETRY_BACKOFF] when it returns a retryable error, per
    /// spec §7.
    fn with_retry<T>(&self, mut f: impl FnMut() -> Result<T, AuthError>) -> Result<T, AuthError> {
        let mut attempt = 0;
        loop {
            self.check_cancelled()?;

            match f() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!("retrying after transient error (attempt {attempt}): {e}");
                    std::thread::sleep(RETRY_BACKOFF * 2u32.pow(attempt - 1));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Authenticate with `apple_id`/`password`.
    ///
    /// On success with no 2FA challenge, returns the [AppleSession]. If
    /// Apple demands two-factor verification, returns
    /// `Err(AuthError::TwoFactorRequired(pending))` — per spec §4.5/§7 this
    /// is not a terminal failure; callers should match on it and proceed to
    /// [Self::authenticate_with_code] once the user supplies a code.
    pub fn authenticate(&self, apple_id: &str, password: &str) -> Result<AppleSession, AuthError> {
        self.check_cancelled()?;

        info!("authenticating as {apple_id}");
        let anisette = self.with_retry(|| fetch_anisette(&self.http, &self.config.anisette_servers))?;

        let (scnt, session_id) = self.init_session(&anisette)?;
        self.sign_in(apple_id, password, anisette, scnt, session_id)
    }

    /// Resume authentication after a [AuthError::TwoFactorRequired], with
    /// the user-supplied 6-digit `code`.
    pub fn authenticate_with_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AppleSession, AuthError> {
        self.check_cancelled()?;

        let code: String = code.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::InvalidCode);
        }

        let url = format!("{AUTH_ENDPOINT}/verify/trusteddevice/securitycode");
        let response = self.with_retry(|| {
            let body = serde_json::json!({ "securityCode": { "code": code } });
            pending
                .anisette
                .apply(
                    self.http
                        .post(&url)
                        .header("scnt", &pending.scnt)
                        .header("X-Apple-ID-Session-Id", &pending.session_id)
                        .header("Content-Type", "application/json")
                        .timeout(self.config.timeout),
                )
                .json(&body)
                .send()
                .map_err(AuthError::from)
        })?;

        let scnt = header_or(&response, "scnt", &pending.scnt);
        let session_id = header_or(&response, "X-Apple-ID-Session-Id", &pending.session_id);

        match response.status().as_u16() {
            200 | 204 => {
                self.trust_session(&pending.anisette, &scnt, &session_id);
                self.finalize_session(&pending.anisette, scnt, session_id, response)
            }
            401 => Err(AuthError::InvalidCode),
            400 => Err(AuthError::CodeExpired),
            503 => Err(AuthError::ServiceUnavailable),
            status => Err(AuthError::ApiError {
                status,
                detail: response.text().unwrap_or_default(),
            }),
        }
    }

    fn init_session(&self, anisette: &AnisetteHeaders) -> Result<(String, String), AuthError> {
        let url = format!("{AUTH_ENDPOINT}/signin");
        let response = self.with_retry(|| {
            anisette
                .apply(
                    self.http
                        .get(&url)
                        .query(&[("widgetKey", WIDGET_KEY)])
                        .header("Accept", "application/json")
                        .timeout(self.config.timeout),
                )
                .send()
                .map_err(AuthError::from)
        })?;

        Ok((
            header_or(&response, "scnt", ""),
            header_or(&response, "X-Apple-ID-Session-Id", ""),
        ))
    }

    fn sign_in(
        &self,
        apple_id: &str,
        password: &str,
        anisette: AnisetteHeaders,
        scnt: String,
        session_id: String,
    ) -> Result<AppleSession, AuthError> {
        let url = format!("{AUTH_ENDPOINT}/signin");
        let body = serde_json::json!({
            "accountName": apple_id,
            "password": password,
            "rememberMe": true,
        });

        let response = self.with_retry(|| {
            anisette
                .apply(
                    self.http
                        .post(&url)
                        .query(&[("isRememberMeEnabled", "true")])
                        .header("scnt", &scnt)
                        .header("X-Apple-ID-Session-Id", &session_id)
                        .header("Content-Type", "application/json")
                        .timeout(self.config.timeout),
                )
                .json(&body)
                .send()
                .map_err(AuthError::from)
        })?;

        let scnt = header_or(&response, "scnt", &scnt);
        let session_id = header_or(&response, "X-Apple-ID-Session-Id", &session_id);

        match response.status().as_u16() {
            200 => self.finalize_session(&anisette, scnt, session_id, response),
            409 => {
                info!("two-factor authentication required");
                self.request_2fa_code(&anisette, &scnt, &session_id);
                Err(AuthError::TwoFactorRequired(PendingVerification {
                    anisette,
                    scnt,
                    session_id,
                }))
            }
            401 => Err(AuthError::BadCredentials),
            403 => Err(AuthError::AccountLocked),
            503 => Err(AuthError::ServiceUnavailable),
            status => Err(AuthError::ApiError {
                status,
                detail: response.text().unwrap_or_default(),
            }),
        }
    }

    /// Ask Apple to push a verification code to trusted devices. Best
    /// effort: a PUT that's rejected falls back to a GET on `2sv/trust`, per
    /// spec §4.5. Neither failure mode prevents the caller from still
    /// entering a code they received through some other channel.
    fn request_2fa_code(&self, anisette: &AnisetteHeaders, scnt: &str, session_id: &str) {
        let headers = |builder: reqwest::blocking::RequestBuilder| {
            anisette.apply(
                builder
                    .header("scnt", scnt)
                    .header("X-Apple-ID-Session-Id", session_id)
                    .timeout(self.config.timeout),
            )
        };

        let put_result = headers(self.http.put(format!("{AUTH_ENDPOINT}/verify/trusteddevice")))
            .json(&serde_json::json!({}))
            .send();

        if matches!(&put_result, Ok(r) if r.status().is_success()) {
            return;
        }

        let _ = headers(self.http.get(format!("{AUTH_ENDPOINT}/2sv/trust"))).send();
    }

    /// Mark a freshly verified session as trusted. Best-effort per spec
    /// §4.5: failures here don't fail authentication.
    fn trust_session(&self, anisette: &AnisetteHeaders, scnt: &str, session_id: &str) {
        let _ = anisette
            .apply(
                self.http
                    .get(format!("{AUTH_ENDPOINT}/2sv/trust"))
                    .header("scnt", scnt)
                    .header("X-Apple-ID-Session-Id", session_id)
                    .timeout(Duration::from_secs(10)),
            )
            .send();
    }

    fn finalize_session(
        &self,
        anisette: &AnisetteHeaders,
        scnt: String,
        session_id: String,
        response: reqwest::blocking::Response,
    ) -> Result<AppleSession, AuthError> {
        let dsid = header_or(&response, "X-Apple-DS-ID", "");
        let token = header_or(&response, "X-Apple-Session-Token", "");
        Ok(AppleSession::new(dsid, token, scnt, session_id, anisette.clone()))
    }
}

fn header_or(response: &reqwest::blocking::Response, name: &str, default: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn abort_causes_next_call_to_be_cancelled() {
        let client = AuthClient::new(AuthClientConfig::default());
        client.abort();
        let err = client.authenticate("user@example.com", "pw").unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
    }

    #[test]
    fn rejects_malformed_two_factor_code() {
        let client = AuthClient::new(AuthClientConfig::default());
        let pending = PendingVerification {
            anisette: AnisetteHeaders::empty(),
            scnt: String::new(),
            session_id: String::new(),
        };
        let err = client.authenticate_with_code(&pending, "12345").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode));
    }
}
