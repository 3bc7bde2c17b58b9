//! EIP-4361 challenge decoding and signature verification.
//!
//! The cryptography itself lives in the `siwe` crate; this module only
//! adapts its inputs (hex-encoded wire payloads) and outcomes (typed
//! errors, plain booleans) to the rest of the gateway.

use crate::error::AppError;
use siwe::Message;

/// Decode a hex-encoded (optionally `0x`-prefixed) UTF-8 string and
/// parse it as a structured sign-in message.
///
/// Every decode or parse failure maps to `MalformedChallenge`.
pub fn parse_challenge(encoded: &str) -> Result<Message, AppError> {
    let stripped = encoded.trim();
    let stripped = stripped.strip_prefix("0x").unwrap_or(stripped);

    let bytes = hex::decode(stripped)
        .map_err(|e| AppError::MalformedChallenge(format!("invalid hex encoding: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::MalformedChallenge("challenge is not valid UTF-8".to_string()))?;

    text.parse::<Message>()
        .map_err(|e| AppError::MalformedChallenge(format!("invalid sign-in message: {}", e)))
}

/// Check a hex-encoded 65-byte ECDSA signature against a parsed
/// message. Any decode or verifier failure resolves to `false`; the
/// verifier is never allowed to abort the request.
pub fn signature_is_valid(signature: &str, message: &Message) -> bool {
    let stripped = signature.trim();
    let stripped = stripped.strip_prefix("0x").unwrap_or(stripped);

    let Ok(bytes) = hex::decode(stripped) else {
        return false;
    };
    let Ok(sig) = <[u8; 65]>::try_from(bytes) else {
        return false;
    };

    message.verify_eip191(&sig).is_ok()
}

/// Canonical lowercase `0x…` form of the message's subject address.
pub fn canonical_address(message: &Message) -> String {
    format!("0x{}", hex::encode(message.address))
}

/// Hostname the challenge was signed for, with any port stripped.
pub fn signed_host(message: &Message) -> &str {
    message.domain.host()
}
