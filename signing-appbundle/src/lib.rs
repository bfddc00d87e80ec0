// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for working with Apple application bundles on disk.
//!
//! A bundle is a directory tree following one of Apple's conventions for
//! packaging an application, framework, or plug-in. This crate knows how to
//! open an existing bundle, classify its package type, read its `Info.plist`,
//! and enumerate the files and nested bundles it contains.

mod directory_bundle;
pub use directory_bundle::*;
mod ios_app_bundle;
pub use ios_app_bundle::*;

/// The type of bundle, as sniffed from its directory name and layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundlePackageType {
    /// An application bundle (`.app`).
    App,
    /// A framework bundle (`.framework`).
    Framework,
    /// A plug-in bundle (`.appex`, `.bundle`, and similar).
    Bundle,
}

impl BundlePackageType {
    /// The 4 character `CFBundlePackageType` value Apple associates with this type.
    pub fn package_type_string(&self) -> &'static str {
        match self {
            Self::App => "APPL",
            Self::Framework => "FMWK",
            Self::Bundle => "BNDL",
        }
    }
}

impl std::fmt::Display for BundlePackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.package_type_string())
    }
}
