//! Request, response, and storage models.
//!
//! All models use serde for serialization/deserialization.
//! `StoredSession` is the Redis row format.

use serde::{Deserialize, Serialize};

/// Session row as stored in Redis under `session:{id}`.
///
/// A session is *pending* while `valid` is true, unexpired, and no
/// address is bound; it is *authenticated* once an address is bound.
/// `valid` flips to false on logout and never flips back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: String,
    /// Unix seconds; set once at creation, never extended.
    pub expires_at: u64,
    pub valid: bool,
    /// Single-use challenge token, bound 1:1 to this session.
    pub nonce: String,
    /// Account address bound by a successful signature verification.
    pub address: Option<String>,
}

impl StoredSession {
    /// True iff the session can still be used: not invalidated and not expired.
    pub fn is_usable(&self, now: u64) -> bool {
        self.valid && self.expires_at > now
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

// ============================================================================
// Login Models
// ============================================================================

/// Query parameters for the login entry point.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Continuation target to return to after a successful sign-in.
    pub next: Option<String>,
}

/// Response carrying the challenge nonce to sign.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub nonce: String,
}

/// Proof submission: hex-encoded sign-in message plus its signature.
#[derive(Debug, Deserialize)]
pub struct ProofRequest {
    pub message: String,
    pub signature: String,
}

/// Response after a successful proof submission.
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub address: String,
    pub authorized: bool,
}

/// Status of an already-authenticated session.
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub address: String,
    pub authorized: bool,
}

// ============================================================================
// Metrics
// ============================================================================

/// Read-only counters for the metrics surface.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub active_sessions: u64,
    pub authenticated_sessions: u64,
    pub expired_sessions: u64,
    pub authorized_addresses: u64,
}

impl MetricsSnapshot {
    /// Plain-text rendering, one `key: value` line per counter.
    pub fn render(&self) -> String {
        format!(
            "active_sessions: {}\nauthenticated_sessions: {}\nexpired_sessions: {}\nauthorized_addresses: {}\n",
            self.active_sessions,
            self.authenticated_sessions,
            self.expired_sessions,
            self.authorized_addresses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(valid: bool, expires_at: u64) -> StoredSession {
        StoredSession {
            id: "s1".to_string(),
            expires_at,
            valid,
            nonce: "NONCE234".to_string(),
            address: None,
        }
    }

    #[test]
    fn test_usable_session() {
        assert!(session(true, 1000).is_usable(999));
    }

    #[test]
    fn test_expired_session_not_usable() {
        // Expiry boundary is exclusive: expires_at == now means expired
        assert!(!session(true, 1000).is_usable(1000));
        assert!(!session(true, 1000).is_usable(1001));
    }

    #[test]
    fn test_invalidated_session_not_usable() {
        // The valid flag wins even when the expiry is in the future
        assert!(!session(false, u64::MAX).is_usable(0));
    }

    #[test]
    fn test_session_round_trip() {
        let mut s = session(true, 42);
        s.address = Some("0xabc".to_string());
        let json = serde_json::to_string(&s).unwrap();
        let back: StoredSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "s1");
        assert_eq!(back.expires_at, 42);
        assert_eq!(back.address.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_metrics_render() {
        let snapshot = MetricsSnapshot {
            active_sessions: 3,
            authenticated_sessions: 2,
            expired_sessions: 1,
            authorized_addresses: 5,
        };
        let text = snapshot.render();
        assert!(text.contains("active_sessions: 3"));
        assert!(text.contains("authenticated_sessions: 2"));
        assert!(text.contains("expired_sessions: 1"));
        assert!(text.contains("authorized_addresses: 5"));
    }
}
