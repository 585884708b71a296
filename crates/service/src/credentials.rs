//! Random credentials for bulk provisioning.
//!
//! Passwords draw from an alphabet without look-alike glyphs so printed
//! sheets can be typed back reliably. Everything comes from the OS CSPRNG.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// No `0 O 1 l I`.
const PASSWORD_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated artifact handles.
pub const FILE_ID_LEN: usize = 8;

/// One generated login, raw password included. Lives only until it is exported.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedCredential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for GeneratedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Random password of exactly `len` characters.
pub fn random_password(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

/// Random ASCII alphanumeric token, used for app keys and file handles.
pub fn random_token(len: usize) -> String {
    OsRng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

pub fn random_file_id() -> String {
    random_token(FILE_ID_LEN)
}

pub fn username_for(prefix: &str, number: i64, suffix: &str) -> String {
    format!("{prefix}{number}{suffix}")
}

/// Longest username the range can produce.
pub fn username_len_bound(from: i64, to: i64, prefix: &str, suffix: &str) -> usize {
    let digits = from.to_string().len().max(to.to_string().len());
    prefix.chars().count() + suffix.chars().count() + digits
}

/// One `prefix + number + suffix` per number in `from..=to`, ascending.
pub fn usernames<'a>(from: i64, to: i64, prefix: &'a str, suffix: &'a str) -> impl Iterator<Item = String> + 'a {
    (from..=to).map(move |n| username_for(prefix, n, suffix))
}

pub fn generate_credentials(
    from: i64,
    to: i64,
    prefix: &str,
    suffix: &str,
    password_length: usize,
) -> Vec<GeneratedCredential> {
    usernames(from, to, prefix, suffix)
        .map(|username| GeneratedCredential { username, password: random_password(password_length) })
        .collect()
}
