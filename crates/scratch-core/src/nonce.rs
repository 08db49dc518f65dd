//! Random tokens for script nonces and scratch ids.

use rand::Rng;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a script nonce.
pub const NONCE_LEN: usize = 32;

/// Generate a random alphanumeric nonce for the content security policy.
pub fn generate_nonce() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Generate a fresh scratch id: 128 random bits as 32 lowercase hex chars.
pub fn generate_scratch_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
