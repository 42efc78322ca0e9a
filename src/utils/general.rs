//! General helpers shared by the storage, web and api layers.

use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;

/// Returns `length` cryptographically secure random bytes, hex encoded.
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Decodes an API path argument encoded with the URL-safe base64 alphabet
/// (`-` for `+`, `_` for `/`).
///
/// Returns `None` if the argument is not valid base64. The decoded data may be
/// binary.
pub fn decode_api_string_argument(arg: &str) -> Option<Vec<u8>> {
    let standard: String = arg
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    general_purpose::STANDARD
        .decode(standard.as_bytes())
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(standard.as_bytes()))
        .ok()
}

/// Byte-for-byte string comparison whose running time does not depend on where
/// the first difference is.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Escapes the five HTML special characters.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_length_and_charset() {
        let token = generate_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex::decode(&token).map(|bytes| bytes.len()), Ok(32));
        assert_ne!(token, generate_token(32));
    }

    #[test]
    fn test_decode_api_string_argument() {
        // "hello?>" encodes to "aGVsbG8/Pg==" in the standard alphabet
        assert_eq!(
            decode_api_string_argument("aGVsbG8_Pg==").as_deref(),
            Some(b"hello?>".as_slice())
        );
        assert_eq!(
            decode_api_string_argument("aGVsbG8_Pg").as_deref(),
            Some(b"hello?>".as_slice())
        );
        assert!(decode_api_string_argument("***").is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("T1", "T1"));
        assert!(!constant_time_eq("T1", "T2"));
        assert!(!constant_time_eq("T1", "T10"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }
}
