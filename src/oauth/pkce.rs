//! Random `state` tokens and PKCE (RFC 7636) verifiers

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Random `state` value binding an authorization request to its callback.
///
/// 32 random bytes, base64url encoded (43 characters).
pub fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<32>())
}

/// PKCE code verifier (RFC 7636, 64 characters)
pub fn generate_code_verifier() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<48>())
}

/// S256 challenge: `BASE64URL(SHA256(verifier))`
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
