// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extracting the embedded property list from a CMS-wrapped mobileprovision
//! payload.
//!
//! Provisioning profiles are a PKCS#7/CMS `SignedData` structure whose
//! content is an XML property list. Rather than parse the full CMS
//! structure, we locate the plist by its textual markers, which is how
//! `security cms -D` and similar tools extract it in practice.

use crate::AppleCodesignError;

const XML_DECL_MARKER: &[u8] = b"<?xml";
const PLIST_OPEN_MARKER: &[u8] = b"<plist";
const PLIST_CLOSE_MARKER: &[u8] = b"</plist>";

/// Extract the embedded XML property list from a CMS `SignedData` payload,
/// per spec §4.1 `extract_cms_payload`.
///
/// The plist's start is taken as the earlier of the `<?xml` declaration or
/// the `<plist` tag; its end is the end of the last `</plist>` close tag.
/// Fails with [AppleCodesignError::NotACmsPlist] if either bound can't be
/// found.
pub fn extract_cms_payload(bytes: &[u8]) -> Result<Vec<u8>, AppleCodesignError> {
    let xml_start = find_subslice(bytes, XML_DECL_MARKER);
    let plist_start = find_subslice(bytes, PLIST_OPEN_MARKER);

    let start = match (xml_start, plist_start) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Err(AppleCodesignError::NotACmsPlist),
    };

    let close_pos = rfind_subslice(bytes, PLIST_CLOSE_MARKER).ok_or(AppleCodesignError::NotACmsPlist)?;
    let end = close_pos + PLIST_CLOSE_MARKER.len();

    if end <= start {
        return Err(AppleCodesignError::NotACmsPlist);
    }

    Ok(bytes[start..end].to_vec())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }

    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_plist_between_cms_wrapper() {
        let mut data = vec![0x30, 0x82, 0x01, 0x00];
        data.extend_from_slice(b"garbage before");
        data.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        data.extend_from_slice(b"<plist version=\"1.0\"><dict/></plist>");
        data.extend_from_slice(b"trailing signature bytes");

        let extracted = extract_cms_payload(&data).unwrap();
        assert!(extracted.starts_with(b"<?xml"));
        assert!(extracted.ends_with(b"</plist>"));
    }

    #[test]
    fn missing_plist_is_rejected() {
        assert!(matches!(
            extract_cms_payload(b"not a cms blob at all"),
            Err(AppleCodesignError::NotACmsPlist)
        ));
    }

    #[test]
    fn missing_close_tag_is_rejected() {
        assert!(matches!(
            extract_cms_payload(b"<plist version=\"1.0\"><dict/>"),
            Err(AppleCodesignError::NotACmsPlist)
        ));
    }
}
