//! Small conversions shared by the registry, the objector and the models.

use crate::error::{RedditClientError, Result};

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Render a non-negative integer as lowercase base 36 (Reddit's `id36`).
pub fn int_to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    // only ASCII digits were pushed
    String::from_utf8(digits).unwrap_or_default()
}

/// Parse an `id36`. Uppercase input is accepted.
pub fn base36_to_int(s: &str) -> Result<u64> {
    if s.is_empty() {
        return Err(RedditClientError::ClientError(
            "empty base36 identifier".to_string(),
        ));
    }
    u64::from_str_radix(s, 36).map_err(|e| {
        RedditClientError::ClientError(format!("invalid base36 identifier '{}': {}", s, e))
    })
}

/// Convert `camelCase` (and `HTTPStyle` acronyms) to `snake_case`.
///
/// An underscore goes after a lowercase letter or digit followed by an
/// uppercase letter, and after an uppercase letter that starts a new word
/// (`HTTPResponse` -> `http_response`). Already snake-cased input is
/// returned unchanged.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        out.extend(c.to_lowercase());
        let next = chars.get(i + 1).copied();
        let after_next = chars.get(i + 2).copied();
        let boundary = match next {
            Some(n) if n.is_uppercase() => {
                c.is_lowercase()
                    || c.is_ascii_digit()
                    || (c.is_uppercase() && after_next.is_some_and(char::is_lowercase))
            }
            _ => false,
        };
        if boundary {
            out.push('_');
        }
    }
    out
}

/// Join a path onto a base URL, treating the base as a directory.
///
/// `url_join(base, "")` is `base`; a leading slash on `path` never truncates
/// the base.
pub fn url_join(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    let path = path.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Split a fullname into its kind prefix and id36.
pub fn split_fullname(fullname: &str) -> Option<(&str, &str)> {
    let (kind, id) = fullname.split_once('_')?;
    if kind.is_empty() || id.is_empty() {
        return None;
    }
    Some((kind, id))
}
