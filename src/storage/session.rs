//! Session Redis operations.
//!
//! Redis key patterns:
//! - `session:{id}` — session row (JSON)
//! - `nonce:{nonce}` — nonce registry entry, value is the owning
//!   session id; its existence enforces nonce uniqueness across
//!   sessions
//!
//! Expiry is always decided by comparing the stored `expires_at`
//! against the caller's clock. The Redis TTL on each key is garbage
//! collection only: it outlives `expires_at` by `GC_GRACE_SECS`, so
//! expired rows remain observable (metrics, audits) for the whole
//! grace window before the store purges them.
//!
//! Every row mutation runs as one Lua script that changes exactly the
//! field it owns: concurrent invalidation and address binding touch
//! disjoint fields and neither can clobber the other's write.
//!
//! Session JSON pulled from Redis is wrapped in `Zeroizing` so nonce
//! material is cleared from this process's memory after use.

use crate::auth::token::{generate_nonce, generate_session_id};
use crate::error::AppError;
use crate::models::StoredSession;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// How long a row outlives its own expiry before Redis purges it.
const GC_GRACE_SECS: u64 = 30 * 86_400;

fn session_key(id: &str) -> String {
    format!("session:{}", id)
}

fn nonce_key(nonce: &str) -> String {
    format!("nonce:{}", nonce)
}

/// Create a new pending session and return `(id, nonce)`.
///
/// The session row and the nonce registry entry are written in one Lua
/// script that refuses to overwrite either key. A collision on freshly
/// generated 256-bit / 130-bit tokens means the id or nonce source is
/// broken, so it is surfaced as a fatal integrity error rather than
/// retried.
pub async fn create_session<C>(
    con: &mut C,
    now: u64,
    ttl_secs: u64,
) -> Result<(String, String), AppError>
where
    C: AsyncCommands,
{
    let id = generate_session_id();
    let nonce = generate_nonce();

    let session = StoredSession {
        id: id.clone(),
        expires_at: now + ttl_secs,
        valid: true,
        nonce: nonce.clone(),
        address: None,
    };
    let json = serde_json::to_string(&session)?;

    // Atomic create: both keys or neither, and never an overwrite
    let script = redis::Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 1 or redis.call('EXISTS', KEYS[2]) == 1 then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
        redis.call('SET', KEYS[2], ARGV[2], 'EX', ARGV[3])
        return 1
        ",
    );

    let created: i32 = script
        .key(session_key(&id))
        .key(nonce_key(&nonce))
        .arg(&json)
        .arg(&id)
        .arg(ttl_secs + GC_GRACE_SECS)
        .invoke_async(con)
        .await?;

    if created != 1 {
        return Err(AppError::Storage(
            "session id or nonce collision on create".to_string(),
        ));
    }

    Ok((id, nonce))
}

/// Get a session row by id.
pub async fn get_session<C>(con: &mut C, id: &str) -> Result<Option<StoredSession>, AppError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(session_key(id)).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let session: StoredSession = serde_json::from_str(&zeroizing_data)?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// True iff a row exists for the id, is not invalidated, and is not
/// expired. An absent id is simply not valid, never an error.
pub async fn session_is_valid<C>(
    con: &mut C,
    session_id: Option<&str>,
    now: u64,
) -> Result<bool, AppError>
where
    C: AsyncCommands,
{
    let Some(id) = session_id else {
        return Ok(false);
    };
    Ok(get_session(con, id)
        .await?
        .map(|s| s.is_usable(now))
        .unwrap_or(false))
}

/// Nonce bound to a session, regardless of the session's validity: an
/// unexpired-but-unauthenticated login page still re-renders it.
/// `None` means the session does not exist.
pub async fn get_nonce<C>(con: &mut C, id: &str) -> Result<Option<String>, AppError>
where
    C: AsyncCommands,
{
    Ok(get_session(con, id).await?.map(|s| s.nonce))
}

/// Invalidate a session (logout). Idempotent: an unknown or
/// already-invalid id is a no-op.
///
/// The flip runs inside Redis, so a bind racing this call can never
/// write a stale `valid=true` back over it.
pub async fn invalidate_session<C>(con: &mut C, id: &str) -> Result<(), AppError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local row = redis.call('GET', KEYS[1])
        if not row then
            return 0
        end
        local session = cjson.decode(row)
        if session.valid == false then
            return 0
        end
        session.valid = false
        redis.call('SET', KEYS[1], cjson.encode(session), 'KEEPTTL')
        return 1
        ",
    );

    let _: i32 = script.key(session_key(id)).invoke_async(con).await?;
    Ok(())
}

/// Bind an address to a session, overwriting any previous binding.
/// `valid`, `expires_at`, and the nonce are untouched; only the
/// `address` field changes, inside Redis, so a concurrent logout
/// cannot be undone by this write. Returns false when no row exists.
pub async fn bind_address<C>(con: &mut C, id: &str, address: &str) -> Result<bool, AppError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local row = redis.call('GET', KEYS[1])
        if not row then
            return 0
        end
        local session = cjson.decode(row)
        session.address = ARGV[1]
        redis.call('SET', KEYS[1], cjson.encode(session), 'KEEPTTL')
        return 1
        ",
    );

    let bound: i32 = script
        .key(session_key(id))
        .arg(address)
        .invoke_async(con)
        .await?;
    Ok(bound == 1)
}

/// Bound address of a session iff it is valid, unexpired, and an
/// address has been bound.
pub async fn session_is_authenticated<C>(
    con: &mut C,
    session_id: Option<&str>,
    now: u64,
) -> Result<Option<String>, AppError>
where
    C: AsyncCommands,
{
    let Some(id) = session_id else {
        return Ok(None);
    };
    Ok(get_session(con, id)
        .await?
        .filter(|s| s.is_usable(now))
        .and_then(|s| s.address))
}

/// Count sessions: `(active, authenticated, expired)`.
///
/// Active rows are valid and unexpired; authenticated rows are active
/// rows with a bound address; expired rows are past `expires_at` but
/// not yet purged by the store.
pub async fn query_metrics<C>(con: &mut C, now: u64) -> Result<(u64, u64, u64), AppError>
where
    C: AsyncCommands,
{
    let keys = super::scan_keys(con, "session:*").await?;

    let mut active = 0u64;
    let mut authenticated = 0u64;
    let mut expired = 0u64;

    for key in keys {
        let json: Option<String> = con.get(&key).await?;
        let Some(data) = json else { continue };
        let zeroizing_data = Zeroizing::new(data);
        let Ok(session) = serde_json::from_str::<StoredSession>(&zeroizing_data) else {
            continue;
        };

        if session.expires_at <= now {
            expired += 1;
        } else if session.valid {
            active += 1;
            if session.address.is_some() {
                authenticated += 1;
            }
        }
    }

    Ok((active, authenticated, expired))
}
