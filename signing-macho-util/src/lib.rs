// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mach-O load-command and universal-binary primitives.
//!
//! This crate holds the pieces of Mach-O editing that are independent of the
//! embedded code signature format: reading fat/universal headers and
//! reassembling per-architecture Mach-O slices into a universal binary after
//! each slice has been signed separately.

mod macho;
pub use macho::*;
