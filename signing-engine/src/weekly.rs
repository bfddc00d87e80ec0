// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Weekly pipeline: C5 -> C6 -> C3, per spec §2.

use crate::{options::SigningOptions, pipeline::sign_with_timeout};
use ipasign_auth::{AppleSession, AuthClient, AuthClientConfig, AuthError, PendingVerification};
use ipasign_identity::{SigningIdentity, SigningMethod, SigningResult};
use ipasign_provisioning::{ProvisioningClient, ProvisioningClientConfig};
use log::info;
use std::{path::Path, time::Duration};

/// Drives C5's authentication state machine up to an [AppleSession].
///
/// Two-factor verification is unavoidably interactive, so unlike
/// [sign_weekly] this is a small stateful wrapper rather than a single
/// function: call [Self::authenticate], and if it returns
/// `Err(AuthError::TwoFactorRequired(pending))`, collect a code from the
/// user and call [Self::authenticate_with_code] with it.
pub struct AppleIdSession {
    client: AuthClient,
}

impl AppleIdSession {
    pub fn new(config: AuthClientConfig) -> Self {
        Self {
            client: AuthClient::new(config),
        }
    }

    pub fn authenticate(&self, apple_id: &str, password: &str) -> Result<AppleSession, AuthError> {
        self.client.authenticate(apple_id, password)
    }

    pub fn authenticate_with_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AppleSession, AuthError> {
        self.client.authenticate_with_code(pending, code)
    }

    /// Cooperative cancellation, per spec §5: the next (or in-flight) HTTP
    /// call made through this session fails with `AuthError::Cancelled`.
    pub fn abort(&self) {
        self.client.abort();
    }
}

/// Sign `input` using a certificate and provisioning profile minted on
/// demand through an already-authenticated [AppleSession], producing
/// `output`.
///
/// `bundle_id` and `device_udid` drive `register_app_id`/`register_device`
/// inside C6 before a fresh certificate and team provisioning profile are
/// requested and handed to `sign_archive`.
pub fn sign_weekly(
    session: AppleSession,
    bundle_id: &str,
    device_udid: &str,
    input: &Path,
    output: &Path,
    options: &SigningOptions,
) -> SigningResult {
    let provisioning = ProvisioningClient::new(
        session,
        ProvisioningClientConfig {
            timeout: Duration::from_secs(options.timeout_seconds),
        },
    );

    match mint_identity(&provisioning, bundle_id, device_udid, options) {
        Ok(identity) => {
            info!("weekly identity minted for bundle id {bundle_id}");
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

fn mint_identity(
    provisioning: &ProvisioningClient,
    bundle_id: &str,
    device_udid: &str,
    options: &SigningOptions,
) -> Result<SigningIdentity, String> {
    let certificate = provisioning.create_certificate().map_err(|e| e.to_string())?;
    let profile = provisioning
        .create_profile(bundle_id, device_udid, &certificate)
        .map_err(|e| e.to_string())?;

    if options.skip_verification {
        Ok(SigningIdentity::new_unchecked(
            certificate,
            profile,
            SigningMethod::Weekly,
        ))
    } else {
        SigningIdentity::new(certificate, profile, SigningMethod::Weekly).map_err(|e| e.to_string())
    }
}
