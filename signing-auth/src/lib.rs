// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple ID authentication for the free-tier ("weekly") signing pipeline.
//!
//! This crate implements C5 from the IPA signing engine: acquiring anisette
//! anti-replay data, performing password sign-in against
//! `idmsa.apple.com`, and driving the two-factor challenge/verify exchange
//! to produce an [AppleSession] that `ipasign-provisioning` (C6) can use to
//! talk to `developerservices2.apple.com`.
//!
//! The state machine is deliberately small: [AuthClient::authenticate]
//! drives everything through password sign-in, surfacing a two-factor
//! requirement as `Err(AuthError::TwoFactorRequired(pending))` rather than
//! a distinct polling API, and [AuthClient::authenticate_with_code] resumes
//! from there. See spec §4.5 for the full transition diagram.

mod anisette;
mod client;
mod error;
mod session;

pub use anisette::{AnisetteHeaders, DEFAULT_ANISETTE_SERVERS};
pub use client::{AuthClient, AuthClientConfig, PendingVerification};
pub use error::AuthError;
pub use session::AppleSession;
