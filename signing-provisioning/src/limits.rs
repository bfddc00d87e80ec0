// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple's free-tier quota constants.
//!
//! Ported from the prototype's `FreeSigningLimits` (`weekly.py`): the spec
//! only mentions these figures inline in error-message prose (§4.6, §9); the
//! prototype surfaced them as named constants so a caller could pre-flight
//! without round-tripping to Apple. Apple itself never reports how much
//! quota remains (spec §9), so these are informational ceilings, not a
//! substitute for handling the corresponding `*QuotaExceeded` errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FreeSigningLimits {
    pub max_certificates_per_week: u32,
    pub max_app_ids_per_week: u32,
    pub max_devices: u32,
    pub signature_validity_days: u32,
}

impl Default for FreeSigningLimits {
    fn default() -> Self {
        Self {
            max_certificates_per_week: 3,
            max_app_ids_per_week: 10,
            max_devices: 100,
            signature_validity_days: 7,
        }
    }
}

/// The limits in effect for every [crate::ProvisioningClient]; Apple applies
/// these uniformly, so there is nothing per-instance to configure here.
pub const FREE_SIGNING_LIMITS: FreeSigningLimits = FreeSigningLimits {
    max_certificates_per_week: 3,
    max_app_ids_per_week: 10,
    max_devices: 100,
    signature_validity_days: 7,
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_matches_constant() {
        assert_eq!(FreeSigningLimits::default(), FREE_SIGNING_LIMITS);
    }
}
