// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing a PKCS#12 (`.p12`) container into the [Certificate] data model.

use crate::{cryptography::parse_pfx_data_with_der, x509_fields::certificate_fields_from_parsed};
use crate::AppleCodesignError;
use ipasign_identity::Certificate;

/// Parse a `.p12` archive into a certificate (with its private key attached
/// as PKCS#8 PEM) per spec §4.1 `parse_p12`.
///
/// The empty string is a legitimate password and is attempted like any
/// other; a wrong password surfaces as [AppleCodesignError::BadPassword],
/// a structurally invalid container as
/// [AppleCodesignError::MalformedContainer].
pub fn parse_p12(data: &[u8], password: &str) -> Result<Certificate, AppleCodesignError> {
    let (cert, _key_pair, key_der) = match parse_pfx_data_with_der(data, password) {
        Ok(v) => v,
        Err(AppleCodesignError::PfxBadPassword) => return Err(AppleCodesignError::BadPassword),
        Err(AppleCodesignError::PfxParseError(msg)) => {
            return Err(AppleCodesignError::MalformedContainer(msg))
        }
        Err(e) => return Err(e),
    };

    let mut fields = certificate_fields_from_parsed(&cert)?;

    let pem = pem::encode(&pem::Pem {
        tag: "PRIVATE KEY".to_string(),
        contents: key_der,
    });
    fields.private_key_pem = Some(pem);

    Ok(fields)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn malformed_container_is_rejected() {
        let err = parse_p12(b"not a pfx at all", "irrelevant").unwrap_err();
        assert!(matches!(err, AppleCodesignError::MalformedContainer(_)));
    }
}
