// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extracting the [ipasign_identity::Certificate] data model out of a parsed
//! X.509 certificate.

use crate::{digest::sha1, digest::sha256, AppleCodesignError};
use ipasign_identity::Certificate;
use once_cell::sync::Lazy;
use regex::Regex;
use x509_certificate::{asn1time::Time, rfc5280::Validity, CapturedX509Certificate};

static TEAM_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new("[A-Z0-9]{10}").unwrap());

fn time_to_chrono(time: &Time) -> chrono::DateTime<chrono::Utc> {
    match time {
        Time::UtcTime(t) => **t,
        Time::GeneralTime(t) => t.clone().into(),
    }
}

/// Extract the fields of an already-parsed certificate into our data model.
///
/// Per spec §4.1: team id from the organisational-unit component matching
/// `[A-Z0-9]{10}` (null if absent); variant heuristic on the common name.
pub fn certificate_fields_from_parsed(
    cert: &CapturedX509Certificate,
) -> Result<Certificate, AppleCodesignError> {
    let der_bytes = cert.constructed_data().to_vec();

    let common_name = cert
        .subject_name()
        .iter_common_name()
        .next()
        .and_then(|atv| atv.to_string().ok())
        .unwrap_or_default();

    let team_id = cert
        .subject_name()
        .iter_organizational_unit()
        .filter_map(|atv| atv.to_string().ok())
        .find_map(|s| TEAM_ID_RE.find(&s).map(|m| m.as_str().to_string()));

    let Validity {
        not_before,
        not_after,
    } = cert.validity().clone();

    let serial_number = hex::encode(cert.serial_number_asn1().as_ref()).to_uppercase();

    Ok(Certificate {
        serial_number,
        variant: Certificate::guess_variant_from_common_name(&common_name),
        common_name,
        team_id,
        not_before: time_to_chrono(&not_before),
        not_after: time_to_chrono(&not_after),
        sha1_fingerprint: sha1(&der_bytes),
        sha256_fingerprint: sha256(&der_bytes),
        der_bytes,
        private_key_pem: None,
    })
}

/// Parse a bare X.509 DER certificate and extract its fields, per spec §4.1
/// `parse_x509_der`.
pub fn parse_x509_der(bytes: &[u8]) -> Result<Certificate, AppleCodesignError> {
    let cert = CapturedX509Certificate::from_der(bytes.to_vec())?;
    certificate_fields_from_parsed(&cert)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn team_id_regex_matches() {
        assert_eq!(
            TEAM_ID_RE
                .find("iPhone Developer: Jane Doe (ABCDE12345)")
                .unwrap()
                .as_str(),
            "ABCDE12345"
        );
        assert!(TEAM_ID_RE.find("no team id here").is_none());
    }

    #[test]
    fn malformed_der_is_rejected() {
        assert!(parse_x509_der(b"not a certificate").is_err());
    }
}
