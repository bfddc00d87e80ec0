// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-clock bound on `sign_archive`, per spec §6 `timeout_seconds`.

use ipasign_core::sign_archive;
use ipasign_identity::{SigningIdentity, SigningResult};
use std::{
    path::Path,
    sync::mpsc,
    time::Duration,
};

/// Run `sign_archive` on a worker thread, giving up after `timeout_seconds`.
///
/// `sign_archive` itself has no cancellation hook (per spec §5, C3 is not
/// cancellable mid-signature of a single binary); a timed-out call leaves
/// its worker thread running to completion in the background rather than
/// killing it, and reports `Timeout` to the caller immediately.
pub(crate) fn sign_with_timeout(
    input: &Path,
    output: &Path,
    identity: SigningIdentity,
    timeout_seconds: u64,
    bundle_id_override: Option<String>,
) -> SigningResult {
    let input_buf = input.to_path_buf();
    let output_buf = output.to_path_buf();

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = sign_archive(
            &input_buf,
            &output_buf,
            &identity,
            bundle_id_override.as_deref(),
        );
        let _ = tx.send(result);
    });

    match rx.recv_timeout(Duration::from_secs(timeout_seconds)) {
        Ok(result) => result,
        Err(_) => {
            let _ = std::fs::remove_file(output);
            SigningResult::failure(
                input.to_path_buf(),
                format!("signing timed out after {timeout_seconds}s"),
                vec!["Timeout".to_string()],
            )
        }
    }
}
