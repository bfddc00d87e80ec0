// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [AppleSession]: the durable result of a successful authentication, and
//! its opt-in JSON persistence.

use crate::{anisette::AnisetteHeaders, AuthError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_SESSION_VALIDITY_DAYS: i64 = 30;

/// An authenticated Apple ID session, per spec §3 `SigningSession`.
///
/// Every field here travels together: the anisette bundle baked into a
/// session must be reproduced on every subsequent call, per the invariant in
/// §3 ("mutation without re-authentication invalidates the session").
/// `ipasign-provisioning` borrows this type but never mutates its anisette
/// field directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppleSession {
    /// Apple's durable per-account identifier, from `X-Apple-DS-ID`.
    pub dsid: String,
    /// Session token, from `X-Apple-Session-Token`.
    pub token: String,
    /// Last-observed anti-replay nonce.
    pub scnt: String,
    /// Last-observed anti-replay session id.
    pub session_id: String,
    pub(crate) anisette: AnisetteHeaders,
    /// Team id, populated once `listTeams` has been called (see
    /// `ipasign-provisioning`).
    pub team_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AppleSession {
    pub(crate) fn new(
        dsid: String,
        token: String,
        scnt: String,
        session_id: String,
        anisette: AnisetteHeaders,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            dsid,
            token,
            scnt,
            session_id,
            anisette,
            team_id: None,
            created_at,
            expires_at: created_at + Duration::days(DEFAULT_SESSION_VALIDITY_DAYS),
        }
    }

    /// Whether `now` is before [Self::expires_at].
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }

    /// Build an authenticated `developerservices2.apple.com` request from
    /// `client`, attaching this session's anisette bundle, cookie, and
    /// identity headers, per spec §4.6.
    pub fn authorize(
        &self,
        client: &reqwest::blocking::Client,
        method: reqwest::Method,
        url: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let builder = client
            .request(method, url)
            .header("User-Agent", "Xcode")
            .header("X-Xcode-Version", "15.0 (15A240d)")
            .header("X-Apple-I-Identity-Id", &self.dsid)
            .header("Cookie", format!("myacinfo={}", self.token));

        self.anisette.apply(builder)
    }

    /// Serialize this session (including its frozen anisette bundle) to
    /// `path` as a single JSON document, per spec §3/§6's opt-in session
    /// cache.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a session previously written by [Self::save]. Returns
    /// `Ok(None)` if the cached session has since expired rather than an
    /// error, mirroring the prototype's `load_session` returning `false`.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, AuthError> {
        let data = std::fs::read_to_string(path)?;
        let session: Self = serde_json::from_str(&data)?;

        if session.is_valid() {
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::anisette::AnisetteHeaders;

    fn sample() -> AppleSession {
        AppleSession::new(
            "12345".to_string(),
            "tok".to_string(),
            "scnt".to_string(),
            "sess".to_string(),
            AnisetteHeaders::empty(),
        )
    }

    #[test]
    fn fresh_session_is_valid() {
        assert!(sample().is_valid());
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = sample();
        session.save(&path).unwrap();

        let loaded = AppleSession::load(&path).unwrap().unwrap();
        assert_eq!(loaded.dsid, session.dsid);
        assert_eq!(loaded.token, session.token);
    }

    #[test]
    fn expired_session_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = sample();
        session.expires_at = Utc::now() - Duration::days(1);
        session.save(&path).unwrap();

        assert!(AppleSession::load(&path).unwrap().is_none());
    }
}
