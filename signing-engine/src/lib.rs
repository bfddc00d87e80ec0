// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orchestration layer wiring the Annual and Weekly signing pipelines named
//! in spec §2.
//!
//! - [sign_annual]: C1 (`parse_p12`) -> C2 (`parse_profile`) -> C3
//!   (`sign_archive`), for callers who already hold a `.p12` and a
//!   provisioning profile.
//! - [AppleIdSession] + [sign_weekly]: C5 (authentication) -> C6
//!   (certificate/profile minting) -> C3, for callers signing against a
//!   free Apple ID with no existing certificate.
//!
//! C3 is identity-agnostic (spec §2): both pipelines converge on the same
//! `SigningIdentity` type before handing off to `sign_archive`, so this
//! crate is the only place that distinguishes them.

mod annual;
mod options;
mod pipeline;
mod weekly;

pub use annual::sign_annual;
pub use options::SigningOptions;
pub use weekly::{sign_weekly, AppleIdSession};

pub use ipasign_auth::{AppleSession, AuthClientConfig, AuthError, PendingVerification};
pub use ipasign_identity::{SigningIdentity, SigningMethod, SigningResult};
