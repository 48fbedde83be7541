//! Authentication - password hashing, sessions and CSRF tokens

mod csrf;
mod password;
mod session;

pub use csrf::{clear_login_csrf_cookie, login_csrf_cookie, verify_csrf, LOGIN_CSRF_COOKIE};
pub use password::{
    generate_password, hash_password, validate_password, validate_username, verify_password,
    MIN_PASSWORD_LEN,
};
pub use session::{clear_cookie, cookie_value, session_cookie, Session, SessionStore};

use rand::RngCore;
use subtle::ConstantTimeEq;

/// `len` random bytes, hex-encoded
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Compare two secrets without leaking where they differ.
///
/// Both sides are padded to the same length so the comparison always runs
/// over the same number of bytes.
pub fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0u8, 15, 16, 255]), "000f10ff");
    }

    #[test]
    fn test_random_token_length() {
        let token = random_token(32);
        assert_eq!(token.len(), 64);
        assert_ne!(token, random_token(32));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secret2"));
        assert!(!constant_time_eq("", "secret"));
    }
}
