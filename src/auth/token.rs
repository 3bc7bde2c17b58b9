//! Session id and challenge nonce generation.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// Alphabet for challenge nonces: uppercase plus the digits 2-7, so a
/// nonce can be read back to a human over the phone without ambiguity.
/// All characters are alphanumeric, as EIP-4361 requires of a nonce.
const NONCE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7',
];

const NONCE_LEN: usize = 26;

/// Generate a cryptographically random session id.
///
/// Returns a cookie-safe base64 string (43 characters) from 32 random bytes.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically random challenge nonce (130 bits).
pub fn generate_nonce() -> String {
    nanoid::nanoid!(NONCE_LEN, &NONCE_ALPHABET)
}
