use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    /// Hostnames this gateway answers on. Requests (and signed
    /// challenge domains) presenting any other host are rejected.
    pub hostnames: Vec<String>,

    // Storage
    pub redis_url: String,

    /// Newline-delimited file of authorized account addresses.
    pub allowlist_file: PathBuf,

    // Session cookie
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,

    // Lifetimes (in seconds)
    pub session_ttl_secs: u64,

    // Rate limiting
    pub rate_limit_proof_per_min: u32,

    // Server
    pub bind_addr: SocketAddr,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("hostnames", &self.hostnames)
            .field("redis_url", &"[REDACTED]")
            .field("allowlist_file", &self.allowlist_file)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_secure", &self.cookie_secure)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("rate_limit_proof_per_min", &self.rate_limit_proof_per_min)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Accepted hostnames: comma-separated set, possibly singleton
        let hostnames_raw =
            env::var("ETHERGATE_HOSTNAMES").unwrap_or_else(|_| "localhost".to_string());
        let hostnames: Vec<String> = hostnames_raw
            .split(',')
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        if hostnames.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ETHERGATE_HOSTNAMES".to_string(),
                "must list at least one hostname".to_string(),
            ));
        }

        // Storage — required to prevent silently serving without persistence
        let redis_url = env::var("ETHERGATE_REDIS_URL")
            .map_err(|_| ConfigError::MissingVar("ETHERGATE_REDIS_URL".to_string()))?;

        // Allow-list source — required; an accidentally-absent list must
        // not be mistaken for "no restrictions"
        let allowlist_file = env::var("ETHERGATE_ALLOWLIST_FILE")
            .map_err(|_| ConfigError::MissingVar("ETHERGATE_ALLOWLIST_FILE".to_string()))?;
        if allowlist_file.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ETHERGATE_ALLOWLIST_FILE".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        let allowlist_file = PathBuf::from(allowlist_file);

        // Session cookie
        let cookie_domain = env::var("ETHERGATE_COOKIE_DOMAIN")
            .ok()
            .filter(|d| !d.is_empty());
        let cookie_secure = parse_env_or_default("ETHERGATE_COOKIE_SECURE", true)?;

        // Lifetimes
        let session_ttl_secs = parse_env_or_default("ETHERGATE_SESSION_TTL_SECS", 604_800)?;

        // Rate limiting
        let rate_limit_proof_per_min =
            parse_env_or_default("ETHERGATE_RATE_LIMIT_PROOF_PER_MIN", 30)?;

        // Server
        let bind_addr_str =
            env::var("ETHERGATE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("ETHERGATE_BIND_ADDR".to_string(), e.to_string()))?;

        Ok(Config {
            hostnames,
            redis_url,
            allowlist_file,
            cookie_domain,
            cookie_secure,
            session_ttl_secs,
            rate_limit_proof_per_min,
            bind_addr,
        })
    }

    /// True iff `host` (with any `:port` suffix stripped) is one of the
    /// accepted hostnames.
    pub fn accepts_host(&self, host: &str) -> bool {
        let bare = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
        self.hostnames.iter().any(|h| *h == bare)
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
