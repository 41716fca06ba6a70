//! Percent-escaping for the delta and patch wire formats.
//!
//! Matches Python's `urllib.parse.quote(text, safe="!~*'();/?:@&=+$,# ")`:
//! alphanumerics and `-_.~` stay literal per RFC 3986, and the listed
//! reserved characters are re-admitted so patch bodies stay readable.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const WIRE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#')
    .remove(b' ');

/// Escape text for a delta token or patch body line.
pub fn escape(text: &str) -> String {
    utf8_percent_encode(text, WIRE_SET).to_string()
}

/// Decode any `%XX` sequences. Fails only when the decoded bytes are not
/// valid UTF-8; stray `%` signs pass through untouched.
pub fn unescape(text: &str) -> Result<String, std::str::Utf8Error> {
    percent_decode_str(text)
        .decode_utf8()
        .map(|cow| cow.into_owned())
}
