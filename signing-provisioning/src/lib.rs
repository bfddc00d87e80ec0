// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-tier Apple developer-services client.
//!
//! This crate implements C6 from the IPA signing engine: given an
//! authenticated [ipasign_auth::AppleSession] from `ipasign-auth` (C5), it
//! creates development certificates, registers app ids and devices, and
//! downloads team provisioning profiles against Apple's `QH65B2`
//! developer-services endpoint, all within the quotas Apple applies to
//! Apple-ID-only ("weekly") accounts — see [FreeSigningLimits].
//!
//! Every operation is scoped to the team resolved by [ProvisioningClient::team_id]:
//! spec-wise, "the first team returned from `listTeams`". There is
//! deliberately no way to select a different team; multi-team accounts are
//! out of scope for the free-tier flow this crate models.

mod client;
mod error;
mod limits;

pub use client::{ProvisioningClient, ProvisioningClientConfig, Team};
pub use error::ProvisioningError;
pub use limits::{FreeSigningLimits, FREE_SIGNING_LIMITS};
