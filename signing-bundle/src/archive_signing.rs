// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level IPA rewriting: unpack, mutate, re-sign, repack.

use crate::{
    native_signer::{native_codesign_available, sign_with_native_tool},
    signing::UnifiedSigner,
    signing_settings::{SettingsScope, SigningSettings},
    AppleCodesignError,
};
use apple_bundles::{IosAppBundle, NestedBinary};
use ipasign_identity::{SigningIdentity, SigningResult};
use log::warn;
use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

/// Entitlement keys merged forward from an app's previously embedded
/// entitlements, per spec §4.3 step 5. Each is carried over only when both
/// the old app and the new profile already declare it.
const CARRY_FORWARD_ENTITLEMENT_KEYS: &[&str] = &[
    "aps-environment",
    "com.apple.developer.associated-domains",
    "com.apple.developer.icloud-container-identifiers",
    "com.apple.developer.icloud-container-development-container-identifiers",
    "com.apple.developer.ubiquity-container-identifiers",
    "com.apple.developer.default-data-protection",
    "com.apple.developer.networking.wifi-info",
    "com.apple.developer.healthkit",
    "com.apple.developer.homekit",
    "com.apple.developer.siri",
];

/// Re-sign an IPA archive, per spec §4.3 `sign_archive`.
///
/// This never returns `Err`: every failure mode is reported as a
/// `SigningResult` with `success = false`, per spec §7's error-handling
/// design for this operation.
pub fn sign_archive(
    input: &Path,
    output: &Path,
    identity: &SigningIdentity,
    bundle_id_override: Option<&str>,
) -> SigningResult {
    let start = Instant::now();

    match try_sign_archive(input, output, identity, bundle_id_override, start) {
        Ok(result) => result,
        Err(e) => {
            let _ = std::fs::remove_file(output);
            SigningResult::failure(input.to_path_buf(), e.to_string(), vec![e.to_string()])
        }
    }
}

fn try_sign_archive(
    input: &Path,
    output: &Path,
    identity: &SigningIdentity,
    bundle_id_override: Option<&str>,
    start: Instant,
) -> Result<SigningResult, AppleCodesignError> {
    let mut warnings = Vec::new();

    let work_dir = tempfile::tempdir()?;

    extract_zip(input, work_dir.path())?;

    let payload_dir = work_dir.path().join("Payload");
    if !payload_dir.is_dir() {
        return Err(AppleCodesignError::NoPayload);
    }

    let app_dir = find_app_dir(&payload_dir, &mut warnings)?;
    let app = IosAppBundle::new_from_path(&app_dir)
        .map_err(|_| AppleCodesignError::MissingInfoPlist)?;

    let current_bundle_id = app.info().bundle_id.clone();

    let effective_bundle_id = match bundle_id_override {
        Some(v) => v.to_string(),
        None => identity.profile.resolve_bundle_id(&current_bundle_id),
    };

    if effective_bundle_id != current_bundle_id {
        rewrite_info_plist(&app.info_plist_path(), &effective_bundle_id)?;
    }

    let old_entitlements = read_xcent(&app.entitlements_path());
    let merged_entitlements = merge_entitlements(
        &identity.profile.entitlements,
        &old_entitlements,
        &identity.profile.team_id,
        &effective_bundle_id,
    );
    write_xcent(&app.entitlements_path(), &merged_entitlements)?;

    std::fs::write(app.embedded_profile_path(), &identity.profile.raw_data)?;

    let mut nested = app.frameworks().map_err(AppleCodesignError::DirectoryBundle)?;
    nested.extend(app.plugins().map_err(AppleCodesignError::DirectoryBundle)?);

    for binary in &nested {
        sign_one_binary(&binary.executable_path, identity, None)?;
    }

    let entitlements_xml = entitlements_to_xml(&merged_entitlements)?;
    sign_one_binary(
        &app.main_executable_path(),
        identity,
        Some(entitlements_xml.as_bytes()),
    )?;

    repack_zip(work_dir.path(), output)?;

    Ok(SigningResult::success(
        input.to_path_buf(),
        output.to_path_buf(),
        effective_bundle_id,
        start.elapsed(),
        warnings,
    ))
}

fn sign_one_binary(
    path: &Path,
    identity: &SigningIdentity,
    entitlements_xml: Option<&[u8]>,
) -> Result<(), AppleCodesignError> {
    if !is_macho(path)? {
        return Ok(());
    }

    if native_codesign_available() {
        let entitlements_path = if let Some(xml) = entitlements_xml {
            let path = path.with_extension("entitlements-tmp.plist");
            std::fs::write(&path, xml)?;
            Some(path)
        } else {
            None
        };

        let result = sign_with_native_tool(
            path,
            &identity.certificate.sha1_hex(),
            entitlements_path.as_deref(),
        );

        if let Some(path) = &entitlements_path {
            let _ = std::fs::remove_file(path);
        }

        result.map_err(|e| AppleCodesignError::BinarySignFailed(path.to_path_buf(), e.to_string()))
    } else {
        let mut settings = SigningSettings::default();

        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        settings.set_binary_identifier(SettingsScope::Main, identifier);

        if let Some(xml) = entitlements_xml {
            settings
                .set_entitlements_xml(SettingsScope::Main, String::from_utf8_lossy(xml))
                .map_err(|e| AppleCodesignError::BinarySignFailed(path.to_path_buf(), e.to_string()))?;
        }

        let signer = UnifiedSigner::new(settings);
        signer
            .sign_path_in_place(path)
            .map_err(|e| AppleCodesignError::BinarySignFailed(path.to_path_buf(), e.to_string()))
    }
}

fn is_macho(path: &Path) -> Result<bool, AppleCodesignError> {
    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(false),
    };
    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_err() {
        return Ok(false);
    }

    Ok(matches!(
        magic,
        [0xfe, 0xed, 0xfa, 0xce]
            | [0xfe, 0xed, 0xfa, 0xcf]
            | [0xce, 0xfa, 0xed, 0xfe]
            | [0xcf, 0xfa, 0xed, 0xfe]
            | [0xca, 0xfe, 0xba, 0xbe]
            | [0xbe, 0xba, 0xfe, 0xca]
    ))
}

fn find_app_dir(payload_dir: &Path, warnings: &mut Vec<String>) -> Result<PathBuf, AppleCodesignError> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(payload_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.extension().map(|e| e == "app").unwrap_or(false))
        .collect();

    candidates.sort();

    if candidates.is_empty() {
        return Err(AppleCodesignError::NoAppBundle);
    }

    if candidates.len() > 1 {
        warnings.push(format!(
            "multiple .app bundles found under Payload/; using {}",
            candidates[0].display()
        ));
    }

    Ok(candidates.remove(0))
}

fn rewrite_info_plist(path: &Path, bundle_id: &str) -> Result<(), AppleCodesignError> {
    let mut value = plist::Value::from_file(path)
        .map_err(|e| AppleCodesignError::UnwritablePlist(e.to_string()))?;

    let dict = value
        .as_dictionary_mut()
        .ok_or_else(|| AppleCodesignError::UnwritablePlist("Info.plist is not a dictionary".into()))?;

    dict.insert(
        "CFBundleIdentifier".to_string(),
        plist::Value::String(bundle_id.to_string()),
    );

    let fh = std::fs::File::create(path)?;
    value
        .to_writer_binary(fh)
        .map_err(|e| AppleCodesignError::UnwritablePlist(e.to_string()))
}

fn read_xcent(path: &Path) -> plist::Dictionary {
    plist::Value::from_file(path)
        .ok()
        .and_then(|v| v.as_dictionary().cloned())
        .unwrap_or_default()
}

fn merge_entitlements(
    profile_entitlements: &plist::Dictionary,
    old_app_entitlements: &plist::Dictionary,
    team_id: &str,
    effective_bundle_id: &str,
) -> plist::Dictionary {
    let mut merged = profile_entitlements.clone();

    merged.insert(
        "application-identifier".to_string(),
        plist::Value::String(format!("{team_id}.{effective_bundle_id}")),
    );
    merged.insert(
        "com.apple.developer.team-identifier".to_string(),
        plist::Value::String(team_id.to_string()),
    );

    for key in CARRY_FORWARD_ENTITLEMENT_KEYS {
        if let (Some(old_value), true) = (
            old_app_entitlements.get(*key),
            profile_entitlements.contains_key(*key),
        ) {
            merged.insert(key.to_string(), old_value.clone());
        }
    }

    merged
}

fn entitlements_to_xml(entitlements: &plist::Dictionary) -> Result<String, AppleCodesignError> {
    let mut buf = Vec::new();
    plist::Value::Dictionary(entitlements.clone())
        .to_writer_xml(&mut buf)
        .map_err(|e| AppleCodesignError::UnwritablePlist(e.to_string()))?;

    String::from_utf8(buf).map_err(|e| AppleCodesignError::UnwritablePlist(e.to_string()))
}

fn write_xcent(path: &Path, entitlements: &plist::Dictionary) -> Result<(), AppleCodesignError> {
    let xml = entitlements_to_xml(entitlements)?;
    std::fs::write(path, xml.as_bytes())?;
    Ok(())
}

fn extract_zip(input: &Path, dest: &Path) -> Result<(), AppleCodesignError> {
    let fh = std::fs::File::open(input)?;
    let mut archive = zip::ZipArchive::new(fh)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative_path) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };

        let out_path = dest.join(&relative_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }

    Ok(())
}

fn repack_zip(root: &Path, output: &Path) -> Result<(), AppleCodesignError> {
    let fh = std::fs::File::create(output)
        .map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;
    let mut zf = zip::ZipWriter::new(fh);

    let mut entries = Vec::new();
    collect_files(root, root, &mut entries).map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;
    entries.sort();

    for relative_path in entries {
        let absolute_path = root.join(&relative_path);
        let metadata = std::fs::metadata(&absolute_path)
            .map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;

        let mode = unix_mode(&metadata);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(mode);

        zf.start_file(relative_path.to_string_lossy(), options)
            .map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;

        let mut data = std::fs::File::open(&absolute_path)
            .map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;
        std::io::copy(&mut data, &mut zf).map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;
    }

    zf.finish()
        .map_err(|e| AppleCodesignError::RepackFailed(e.to_string()))?;

    Ok(())
}

#[cfg(unix)]
fn unix_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_entitlements_overwrites_identity_keys() {
        let mut profile_entitlements = plist::Dictionary::new();
        profile_entitlements.insert(
            "application-identifier".to_string(),
            plist::Value::String("ABCDE12345.*".to_string()),
        );
        profile_entitlements.insert(
            "aps-environment".to_string(),
            plist::Value::String("production".to_string()),
        );

        let mut old_app_entitlements = plist::Dictionary::new();
        old_app_entitlements.insert(
            "aps-environment".to_string(),
            plist::Value::String("development".to_string()),
        );
        old_app_entitlements.insert(
            "com.apple.developer.homekit".to_string(),
            plist::Value::Boolean(true),
        );

        let merged = merge_entitlements(
            &profile_entitlements,
            &old_app_entitlements,
            "ABCDE12345",
            "com.example.demo",
        );

        assert_eq!(
            merged.get("application-identifier").and_then(|v| v.as_string()),
            Some("ABCDE12345.com.example.demo")
        );
        assert_eq!(
            merged.get("com.apple.developer.team-identifier").and_then(|v| v.as_string()),
            Some("ABCDE12345")
        );
        // carried forward: both old app and new profile declare it.
        assert_eq!(
            merged.get("aps-environment").and_then(|v| v.as_string()),
            Some("development")
        );
        // not carried forward: new profile doesn't declare homekit.
        assert!(!merged.contains_key("com.apple.developer.homekit"));
    }

    #[test]
    fn is_macho_detects_fat_binary_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, [0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 0]).unwrap();
        assert!(is_macho(&path).unwrap());
    }

    #[test]
    fn is_macho_rejects_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Info.plist");
        std::fs::write(&path, b"<?xml version=\"1.0\"?>").unwrap();
        assert!(!is_macho(&path).unwrap());
    }
}
