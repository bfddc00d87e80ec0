// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Anisette acquisition: the anti-replay fingerprint bundle required by
//! every Apple authentication request.

use crate::AuthError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Community-operated anisette servers tried in order, matching the
/// prototype's `ANISETTE_SERVERS` list. Callers may supply their own list
/// via [crate::AuthClientConfig::anisette_servers].
pub const DEFAULT_ANISETTE_SERVERS: &[&str] = &[
    "https://ani.sidestore.io/",
    "https://sideloadly.io/anisette/generate",
];

const ANISETTE_TIMEOUT: Duration = Duration::from_secs(15);

/// The anti-replay header set returned by an anisette server, plus the
/// session tokens that accompany Apple's responses.
///
/// Per the design notes, the anisette bundle and session tokens form one
/// logical object: this type has no public constructor outside the crate
/// and exposes no way to mutate or extract individual headers, only to
/// apply the whole set to an outgoing request. Splitting them risks
/// server-side session invalidation (spec §3, §9).
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct AnisetteHeaders {
    headers: BTreeMap<String, String>,
}

impl AnisetteHeaders {
    pub(crate) fn new(headers: BTreeMap<String, String>) -> Self {
        Self { headers }
    }

    /// An empty bundle, used only as a placeholder before the first fetch.
    pub(crate) fn empty() -> Self {
        Self {
            headers: BTreeMap::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Apply every header in this bundle to a request builder.
    pub fn apply(&self, mut builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder
    }
}

fn default_header(data: &serde_json::Value, key: &str, default: impl Into<String>) -> String {
    data.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| default.into())
}

/// Fetch anisette data from the first server in `servers` that returns a
/// non-empty `X-Apple-I-MD` and `X-Apple-I-MD-M`, per spec §4.5.
///
/// The full header set returned (with Apple's conventional defaults filled
/// in for fields the server omitted) must be reused verbatim for every
/// subsequent request in the resulting session.
pub fn fetch_anisette(
    client: &reqwest::blocking::Client,
    servers: &[String],
) -> Result<AnisetteHeaders, AuthError> {
    let mut last_error = String::new();

    for server_url in servers {
        let response = match client
            .get(server_url)
            .header("User-Agent", "AltStore/1.6.1")
            .timeout(ANISETTE_TIMEOUT)
            .send()
        {
            Ok(r) => r,
            Err(e) => {
                last_error = e.to_string();
                continue;
            }
        };

        if !response.status().is_success() {
            last_error = format!("HTTP {} from {}", response.status(), server_url);
            continue;
        }

        let data: serde_json::Value = match response.json() {
            Ok(v) => v,
            Err(e) => {
                last_error = e.to_string();
                continue;
            }
        };

        let md = default_header(&data, "X-Apple-I-MD", "");
        let md_m = default_header(&data, "X-Apple-I-MD-M", "");

        if md.is_empty() || md_m.is_empty() {
            last_error = format!("{server_url} returned incomplete anisette data");
            continue;
        }

        let mut headers = BTreeMap::new();
        headers.insert("X-Apple-I-MD".to_string(), md);
        headers.insert("X-Apple-I-MD-M".to_string(), md_m);
        headers.insert(
            "X-Apple-I-MD-RINFO".to_string(),
            default_header(&data, "X-Apple-I-MD-RINFO", "17106176"),
        );
        headers.insert(
            "X-Apple-I-MD-LU".to_string(),
            default_header(&data, "X-Apple-I-MD-LU", ""),
        );
        headers.insert(
            "X-Apple-I-SRL-NO".to_string(),
            default_header(&data, "X-Apple-I-SRL-NO", "0"),
        );
        headers.insert(
            "X-Mme-Client-Info".to_string(),
            default_header(
                &data,
                "X-Mme-Client-Info",
                "<iMac20,1> <Mac OS X;13.0;22A380> <com.apple.AuthKit/1 (com.apple.dt.Xcode/3594.4.19)>",
            ),
        );
        headers.insert(
            "X-Mme-Device-Id".to_string(),
            default_header(
                &data,
                "X-Mme-Device-Id",
                uuid::Uuid::new_v4().to_string().to_uppercase(),
            ),
        );
        headers.insert(
            "X-Apple-I-TimeZone".to_string(),
            default_header(&data, "X-Apple-I-TimeZone", "UTC"),
        );
        headers.insert(
            "X-Apple-I-Client-Time".to_string(),
            default_header(
                &data,
                "X-Apple-I-Client-Time",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
        );
        headers.insert(
            "X-Apple-Locale".to_string(),
            default_header(&data, "X-Apple-Locale", "en_US"),
        );

        return Ok(AnisetteHeaders::new(headers));
    }

    Err(AuthError::AnisetteUnavailable(last_error))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_bundle_reports_empty() {
        assert!(AnisetteHeaders::empty().is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Apple-I-MD".to_string(), "md".to_string());
        let bundle = AnisetteHeaders::new(headers);
        let json = serde_json::to_string(&bundle).unwrap();
        let back: AnisetteHeaders = serde_json::from_str(&json).unwrap();
        assert_eq!(bundle, back);
    }
}
