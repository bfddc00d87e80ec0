// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The [AppInfo] data model, extracted from an app bundle's `Info.plist`.

/// Fields of interest extracted from an `.app`'s `Info.plist`.
#[derive(Clone, Debug)]
pub struct AppInfo {
    pub bundle_id: String,
    pub display_name: String,
    pub version: String,
    pub build: String,
    pub minimum_os_version: String,
    pub executable_name: String,
}

impl AppInfo {
    /// Build from a parsed `Info.plist` dictionary.
    ///
    /// Missing optional keys fall back to conventional defaults; a missing
    /// `CFBundleIdentifier` or `CFBundleExecutable` is the caller's problem
    /// to detect (surfaced as [crate::IdentityError::MalformedProfile]-style
    /// validation upstream in `ipasign-core`, which owns `Info.plist` I/O).
    pub fn from_plist_dict(dict: &plist::Dictionary) -> Option<Self> {
        let bundle_id = dict.get("CFBundleIdentifier")?.as_string()?.to_string();
        let executable_name = dict.get("CFBundleExecutable")?.as_string()?.to_string();

        Some(Self {
            bundle_id,
            display_name: dict
                .get("CFBundleDisplayName")
                .or_else(|| dict.get("CFBundleName"))
                .and_then(|v| v.as_string())
                .unwrap_or_default()
                .to_string(),
            version: dict
                .get("CFBundleShortVersionString")
                .and_then(|v| v.as_string())
                .unwrap_or("1.0")
                .to_string(),
            build: dict
                .get("CFBundleVersion")
                .and_then(|v| v.as_string())
                .unwrap_or("1")
                .to_string(),
            minimum_os_version: dict
                .get("MinimumOSVersion")
                .and_then(|v| v.as_string())
                .unwrap_or("9.0")
                .to_string(),
            executable_name,
        })
    }
}
