// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Annual pipeline: C1 -> C2 -> C3, per spec §2.

use crate::{options::SigningOptions, pipeline::sign_with_timeout};
use ipasign_core::{parse_p12, parse_profile};
use ipasign_identity::{SigningIdentity, SigningMethod, SigningResult};
use log::info;
use std::path::Path;

/// Sign `input` using a caller-supplied P12 certificate and provisioning
/// profile, producing `output`.
///
/// Never returns `Err`: a bad P12 password, malformed profile, or failed
/// identity linkage is reported the same way `sign_archive` itself reports
/// failures, as a `SigningResult` with `success = false`.
pub fn sign_annual(
    p12_bytes: &[u8],
    p12_password: &str,
    profile_bytes: &[u8],
    input: &Path,
    output: &Path,
    options: &SigningOptions,
) -> SigningResult {
    match build_identity(p12_bytes, p12_password, profile_bytes, options) {
        Ok(identity) => {
            info!(
                "annual identity resolved, team {:?}",
                identity.certificate.team_id
            );
            sign_with_timeout(
                input,
                output,
                identity,
                options.timeout_seconds,
                options.new_bundle_id.clone(),
            )
        }
        Err(message) => {
            SigningResult::failure(input.to_path_buf(), message.clone(), vec![message])
        }
    }
}

fn build_identity(
    p12_bytes: &[u8],
    p12_password: &str,
    profile_bytes: &[u8],
    options: &SigningOptions,
) -> Result<SigningIdentity, String> {
    let certificate = parse_p12(p12_bytes, p12_password).map_err(|e| e.to_string())?;
    let profile = parse_profile(profile_bytes).map_err(|e| e.to_string())?;

    if options.skip_verification {
        Ok(SigningIdentity::new_unchecked(
            certificate,
            profile,
            SigningMethod::Annual,
        ))
    } else {
        SigningIdentity::new(certificate, profile, SigningMethod::Annual).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn malformed_inputs_fail_without_touching_output() {
        let result = sign_annual(
            b"not a p12",
            "wrong",
            b"not a profile",
            Path::new("/tmp/ipasign-engine-test-in.ipa"),
            Path::new("/tmp/ipasign-engine-test-out.ipa"),
            &SigningOptions::default(),
        );
        assert!(!result.success);
        assert!(result.output_path.is_none());
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn skip_verification_still_requires_parseable_inputs() {
        let mut options = SigningOptions::default();
        options.skip_verification = true;

        let result = sign_annual(
            b"not a p12",
            "wrong",
            b"not a profile",
            Path::new("/tmp/ipasign-engine-test-in2.ipa"),
            Path::new("/tmp/ipasign-engine-test-out2.ipa"),
            &options,
        );
        assert!(!result.success);
    }
}
