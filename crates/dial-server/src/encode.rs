//! Percent-encoding rules specific to the LAUNCH handler (spec.md §4.7, SPEC_FULL.md
//! §4.7 "additionalDataUrl is never query-string-encoded twice").
//!
//! Grounded on `gdial_rest_server_handle_POST`'s two distinct `soup_uri_encode` calls:
//! the launch payload is encoded with `=&` forced into the reserved set (on top of the
//! usual control/space characters), while the `additionalDataUrl` is encoded as a
//! whole opaque value exactly once before being handed to the platform launcher.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

const PAYLOAD_RESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b'+')
    .add(b'=')
    .add(b'&');

const ADDITIONAL_DATA_URL_RESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Encodes a launch body payload, treating `=` and `&` as reserved regardless of their
/// position — matching `soup_uri_encode(payload, "=&")`.
pub fn encode_payload(payload: &str) -> String {
    utf8_percent_encode(payload, PAYLOAD_RESERVED).to_string()
}

/// Encodes the constructed `additionalDataUrl` as one opaque value.
pub fn encode_additional_data_url(url: &str) -> String {
    utf8_percent_encode(url, ADDITIONAL_DATA_URL_RESERVED).to_string()
}
