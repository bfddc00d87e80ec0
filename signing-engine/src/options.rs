// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Caller-facing configuration for the Annual and Weekly pipelines.

/// Options exposed to callers of [crate::sign_annual] / [crate::sign_weekly],
/// per spec §6.
#[derive(Clone, Debug)]
pub struct SigningOptions {
    /// Ignore any existing signature on the input archive. `sign_archive`
    /// always rewrites every binary's signature unconditionally, so this
    /// has no further effect beyond documenting intent; it exists so
    /// callers that pass it through from a GUI checkbox have somewhere to
    /// put it.
    pub force_reinstall: bool,
    /// Skip identity-linkage verification ([ipasign_identity::SigningIdentity::new])
    /// and construct the identity with
    /// [ipasign_identity::SigningIdentity::new_unchecked] instead.
    pub skip_verification: bool,
    /// End-to-end wall-clock budget for a single `sign_archive` call.
    pub timeout_seconds: u64,
    /// Reserved for callers; no core effect, per spec §6.
    pub preserve_data: bool,
    /// Override the effective bundle id computed in `sign_archive` step 3.
    pub new_bundle_id: Option<String>,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            force_reinstall: false,
            skip_verification: false,
            timeout_seconds: 300,
            preserve_data: false,
            new_bundle_id: None,
        }
    }
}
