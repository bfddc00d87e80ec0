// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [SigningResult]: the user-visible outcome of a signing attempt.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a `sign_archive` call, whether it succeeded or failed.
///
/// Per spec §7, a failed operation is represented as a `SigningResult` with
/// `success = false` rather than only a `Result::Err`; `errors` carries the
/// full chain while `message` is the one line meant for a human.
#[derive(Clone, Debug)]
pub struct SigningResult {
    pub success: bool,
    pub message: String,
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub signing_time: Duration,
    pub bundle_id: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl SigningResult {
    pub fn success(
        input_path: PathBuf,
        output_path: PathBuf,
        bundle_id: String,
        signing_time: Duration,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            message: format!("signed {bundle_id}"),
            input_path,
            output_path: Some(output_path),
            signing_time,
            bundle_id: Some(bundle_id),
            warnings,
            errors: Vec::new(),
        }
    }

    pub fn failure(input_path: PathBuf, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            input_path,
            output_path: None,
            signing_time: Duration::default(),
            bundle_id: None,
            warnings: Vec::new(),
            errors,
        }
    }
}
