// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cryptographic primitives, provisioning profile parsing, and IPA bundle
//! rewriting/signing for Apple platforms.
//!
//! This crate implements application code signing for iOS applications
//! packaged as `.ipa` archives. A goal of this crate is to serve as a
//! stand-in replacement for Apple's `codesign` (and similar tools) without a
//! dependency on an Apple hardware device or operating system: you should be
//! able to sign and release iOS binaries from Linux, Windows, or other
//! non-Apple environments if you want to.
//!
//! Apple code signing is complex and there are likely several areas where
//! this crate and Apple's implementations don't align. It is highly
//! recommended to validate output against what Apple's official tools
//! produce.
//!
//! # Features and Capabilities
//!
//! This crate can:
//!
//! * Find code signature data embedded in Mach-O binaries (both single and
//!   multi-arch/fat/universal binaries). (See [AppleSignable] trait and its
//!   methods.)
//! * Deeply parse code signature data into Rust structs. (See
//!   [EmbeddedSignature], [BlobData], and e.g. [CodeDirectoryBlob].
//! * Generate new embedded signature data, including cryptographically
//!   signing that data using any signing key and X.509 certificate chain
//!   you provide. (See [MachOSigner].)
//! * Write a new Mach-O file containing new signature data. (See
//!   [MachOSigner].)
//! * Parse a PKCS#12 (`.p12`) archive into a certificate and signing key
//!   (see [parse_p12]).
//! * Parse the DER fields of an X.509 certificate into the data model
//!   consumed by the rest of the signing pipeline (see [parse_x509_der]).
//! * Extract the embedded property list payload from a `.mobileprovision`
//!   file without depending on a full CMS parser (see [extract_cms_payload]).
//! * Parse a provisioning profile's payload into [ProvisioningProfile]
//!   (see [parse_profile]).
//! * Generate RSA key pairs and build PKCS#10 certificate signing requests
//!   (see [generate_rsa_keypair] and [build_csr]).
//! * Rewrite and re-sign an IPA archive end to end (see [sign_archive]).
//! * Delegate to the host's native `codesign` tool when present (see
//!   [native_codesign_available] and [sign_with_native_tool]).
//!
//! # Getting Started
//!
//! [sign_archive] is the entry point used by the orchestration layer to turn
//! an unsigned `.ipa` into a signed one. [MachOSigner] is the lower-level
//! type responsible for signing individual Mach-O files.

mod archive_signing;
pub use archive_signing::*;
mod bundle_signing;
pub use bundle_signing::*;
mod cms_payload;
pub use cms_payload::*;
mod code_directory;
pub use code_directory::*;
mod code_hash;
pub use code_hash::*;
pub mod code_requirement;
pub use code_requirement::*;
mod code_resources;
pub use code_resources::*;
mod cryptography;
pub use cryptography::*;
mod csr;
pub use csr::*;
mod digest;
pub use digest::*;
pub mod embedded_signature;
pub use embedded_signature::*;
pub mod embedded_signature_builder;
pub use embedded_signature_builder::*;
pub mod entitlements;
mod error;
pub use error::*;
mod macho;
pub use macho::*;
mod macho_signing;
pub use macho_signing::*;
mod native_signer;
pub use native_signer::*;
mod pkcs12;
pub use pkcs12::*;
mod profile_parser;
pub use profile_parser::*;
mod signing_settings;
pub use signing_settings::*;
mod signing;
pub use signing::*;
pub mod specification;
mod x509_fields;
pub use x509_fields::*;
