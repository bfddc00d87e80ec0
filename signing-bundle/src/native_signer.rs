// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delegating signing to the host's native `codesign` tool.
//!
//! This is one of the two C4 back-ends: when a real `codesign` binary is
//! present (macOS, or a cross-compiled toolchain on the PATH), delegating
//! to it produces a signature indistinguishable from Xcode's own output.
//! The portable ad-hoc back-end (see [crate::signing_settings]) is used
//! everywhere else.

use crate::AppleCodesignError;
use log::{error, warn};
use std::path::Path;

/// Whether a native `codesign` executable is available on this host.
pub fn native_codesign_available() -> bool {
    which::which("codesign").is_ok()
}

/// Sign `binary_path` in place using the host's `codesign` tool.
///
/// `identity_fingerprint` is the SHA-1 hex fingerprint of the signing
/// certificate, as accepted by `codesign -s`. `entitlements_path`, when
/// given, is passed via `--entitlements`.
pub fn sign_with_native_tool(
    binary_path: &Path,
    identity_fingerprint: &str,
    entitlements_path: Option<&Path>,
) -> Result<(), AppleCodesignError> {
    let codesign_exe = which::which("codesign").map_err(|_| AppleCodesignError::NativeToolNotFound)?;

    let mut args = vec![
        "--force".to_string(),
        "--sign".to_string(),
        identity_fingerprint.to_string(),
    ];

    if let Some(entitlements_path) = entitlements_path {
        args.push("--entitlements".to_string());
        args.push(format!("{}", entitlements_path.display()));
    }

    args.push(format!("{}", binary_path.display()));

    warn!("invoking {} with args: {:?}", codesign_exe.display(), args);

    let output = duct::cmd(&codesign_exe, &args)
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .run()
        .map_err(|e| AppleCodesignError::NativeToolFailed(e.to_string()))?;

    if !output.status.success() {
        let output = String::from_utf8_lossy(&output.stdout);
        error!("codesign> {}", output);
        return Err(AppleCodesignError::NativeToolFailed(output.trim().to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capability_probe_does_not_panic() {
        let _ = native_codesign_available();
    }
}
