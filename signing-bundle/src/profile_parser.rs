// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing a `.mobileprovision` into the [ProvisioningProfile] data model.

use crate::{cms_payload::extract_cms_payload, AppleCodesignError};
use ipasign_identity::{ProfileVariant, ProvisioningProfile};
use std::{collections::BTreeSet, io::Cursor, time::SystemTime};

fn plist_string(dict: &plist::Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(|v| v.as_string()).map(str::to_string)
}

fn plist_date(dict: &plist::Dictionary, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    match dict.get(key) {
        Some(plist::Value::Date(d)) => {
            let system_time: SystemTime = d.clone().into();
            Some(chrono::DateTime::<chrono::Utc>::from(system_time))
        }
        _ => None,
    }
}

fn plist_bool(dict: &plist::Dictionary, key: &str) -> bool {
    dict.get(key).and_then(|v| v.as_boolean()).unwrap_or(false)
}

fn plist_string_array(dict: &plist::Dictionary, key: &str) -> Vec<String> {
    dict.get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_string().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn plist_data_array(dict: &plist::Dictionary, key: &str) -> Vec<Vec<u8>> {
    dict.get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_data().map(|d| d.to_vec()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a `.mobileprovision` file's raw bytes into a [ProvisioningProfile],
/// per spec §4.2 `parse_profile`.
pub fn parse_profile(bytes: &[u8]) -> Result<ProvisioningProfile, AppleCodesignError> {
    let payload = extract_cms_payload(bytes)?;

    let value = plist::Value::from_reader_xml(Cursor::new(payload))
        .map_err(|e| AppleCodesignError::MalformedProfile(e.to_string()))?;

    let dict = value
        .as_dictionary()
        .ok_or_else(|| AppleCodesignError::MalformedProfile("payload is not a dictionary".into()))?;

    let uuid = plist_string(dict, "UUID")
        .ok_or_else(|| AppleCodesignError::MalformedProfile("missing UUID".into()))?;
    let name = plist_string(dict, "Name").unwrap_or_default();

    let team_id = dict
        .get("TeamIdentifier")
        .and_then(|v| v.as_array())
        .and_then(|items| items.first())
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| AppleCodesignError::MalformedProfile("missing TeamIdentifier".into()))?;

    let not_before = plist_date(dict, "CreationDate")
        .ok_or_else(|| AppleCodesignError::MalformedProfile("missing CreationDate".into()))?;
    let not_after = plist_date(dict, "ExpirationDate")
        .ok_or_else(|| AppleCodesignError::MalformedProfile("missing ExpirationDate".into()))?;

    let provisioned_devices: BTreeSet<String> =
        plist_string_array(dict, "ProvisionedDevices").into_iter().collect();

    let entitlements = dict
        .get("Entitlements")
        .and_then(|v| v.as_dictionary())
        .cloned()
        .unwrap_or_default();

    let developer_certificates = plist_data_array(dict, "DeveloperCertificates");

    let app_id_pattern = entitlements
        .get("application-identifier")
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| {
            AppleCodesignError::MalformedProfile("missing application-identifier entitlement".into())
        })?;

    let provisions_all_devices = plist_bool(dict, "ProvisionsAllDevices");
    let get_task_allow = entitlements
        .get("get-task-allow")
        .and_then(|v| v.as_boolean())
        .unwrap_or(false);

    let variant = if provisions_all_devices {
        ProfileVariant::Enterprise
    } else if get_task_allow {
        ProfileVariant::Development
    } else if !provisioned_devices.is_empty() {
        ProfileVariant::AdHoc
    } else {
        ProfileVariant::AppStore
    };

    Ok(ProvisioningProfile {
        uuid,
        name,
        team_id,
        app_id_pattern,
        variant,
        not_before,
        not_after,
        provisioned_devices,
        entitlements,
        developer_certificates,
        raw_data: bytes.to_vec(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_plist(extra: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>UUID</key>
    <string>11111111-2222-3333-4444-555555555555</string>
    <key>Name</key>
    <string>iOS Team Provisioning Profile</string>
    <key>TeamIdentifier</key>
    <array><string>ABCDE12345</string></array>
    <key>CreationDate</key>
    <date>2026-01-01T00:00:00Z</date>
    <key>ExpirationDate</key>
    <date>2027-01-01T00:00:00Z</date>
    <key>ProvisionedDevices</key>
    <array></array>
    <key>DeveloperCertificates</key>
    <array><data>AAAA</data></array>
    <key>Entitlements</key>
    <dict>
        <key>application-identifier</key>
        <string>ABCDE12345.com.example.app</string>
        {extra}
    </dict>
</dict>
</plist>"#,
            extra = extra
        )
        .into_bytes()
    }

    #[test]
    fn parses_app_store_profile() {
        let profile = parse_profile(&sample_plist("")).unwrap();
        assert_eq!(profile.team_id, "ABCDE12345");
        assert_eq!(profile.variant, ProfileVariant::AppStore);
        assert_eq!(profile.app_id_pattern, "ABCDE12345.com.example.app");
    }

    #[test]
    fn development_entitlement_wins_over_empty_devices() {
        let plist = sample_plist("<key>get-task-allow</key><true/>");
        let profile = parse_profile(&plist).unwrap();
        assert_eq!(profile.variant, ProfileVariant::Development);
    }

    #[test]
    fn missing_plist_markers_fail() {
        assert!(parse_profile(b"not a provisioning profile").is_err());
    }
}
