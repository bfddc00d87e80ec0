// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [SigningIdentity]: the certificate/profile pair `sign_archive` consumes.

use crate::{Certificate, IdentityError, ProvisioningProfile};

/// How a [SigningIdentity] was obtained.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigningMethod {
    /// Annual pipeline: certificate + profile supplied directly by the caller.
    Annual,
    /// Weekly pipeline: certificate + profile minted on demand via the free
    /// provisioning protocol.
    Weekly,
}

/// A certificate paired with a provisioning profile, validated for use
/// together.
///
/// Construction via [SigningIdentity::new] enforces the invariants from spec
/// §3: both components temporally valid, team ids equal, and the
/// certificate's fingerprint present in the profile's embedded-certificate
/// list. `sign_archive` accepts only an already-validated `SigningIdentity`
/// so it never needs to re-derive these checks.
#[derive(Clone, Debug)]
pub struct SigningIdentity {
    pub certificate: Certificate,
    pub profile: ProvisioningProfile,
    pub method: SigningMethod,
}

impl SigningIdentity {
    /// Validate and wrap a certificate/profile pair.
    ///
    /// Mirrors the Python prototype's standalone `AnnualSigner.validate()`:
    /// callers can pre-flight an identity before attempting a full bundle
    /// rewrite.
    pub fn new(
        certificate: Certificate,
        profile: ProvisioningProfile,
        method: SigningMethod,
    ) -> Result<Self, IdentityError> {
        if !certificate.is_temporally_valid() {
            return Err(IdentityError::CertificateExpired);
        }

        if !profile.is_temporally_valid() {
            return Err(IdentityError::ProfileExpired);
        }

        match &certificate.team_id {
            Some(cert_team) if *cert_team == profile.team_id => {}
            Some(cert_team) => {
                return Err(IdentityError::TeamIdMismatch {
                    certificate: cert_team.clone(),
                    profile: profile.team_id.clone(),
                })
            }
            None => {
                return Err(IdentityError::TeamIdMismatch {
                    certificate: String::new(),
                    profile: profile.team_id.clone(),
                })
            }
        }

        if !profile.contains_certificate_fingerprint(&certificate.sha1_fingerprint) {
            return Err(IdentityError::CertificateNotInProfile);
        }

        Ok(Self {
            certificate,
            profile,
            method,
        })
    }

    /// Construct without re-validating; used by callers (e.g. the weekly
    /// pipeline) that already proved the invariants hold by construction.
    pub fn new_unchecked(
        certificate: Certificate,
        profile: ProvisioningProfile,
        method: SigningMethod,
    ) -> Self {
        Self {
            certificate,
            profile,
            method,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.certificate.is_temporally_valid() && self.profile.is_temporally_valid()
    }

    /// Minimum of the certificate's and profile's remaining validity, in
    /// whole days. Negative if either has already expired.
    pub fn days_remaining(&self) -> i64 {
        let cert_days = (self.certificate.not_after - chrono::Utc::now()).num_days();
        let profile_days = (self.profile.not_after - chrono::Utc::now()).num_days();
        cert_days.min(profile_days)
    }
}

/// Validate a device UDID per spec §4.6 / §8 property 8: the language
/// `[0-9A-F-]{40}` matched case-insensitively.
pub fn validate_udid(udid: &str) -> Result<(), IdentityError> {
    if udid.len() == 40 && udid.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        Ok(())
    } else {
        Err(IdentityError::InvalidUdid(udid.to_string()))
    }
}
