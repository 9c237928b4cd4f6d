//! Random tokens for invite codes, money codes and proxy passwords.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Returns `len` random ASCII letters and digits.
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
