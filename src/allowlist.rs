//! Static allow-list of authorized account addresses.
//!
//! Loaded once at startup from a newline-delimited file; blank lines
//! and `#` comments are skipped. Addresses are normalized to lowercase
//! `0x…` hex before storage and lookup, so EIP-55 mixed-case input
//! matches its lowercase form.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    #[error("authorized addresses file unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Set of authorized addresses in canonical form.
///
/// The set is wholly replaced on every load; a lookup always reflects
/// the most recent replacement.
#[derive(Debug, Default)]
pub struct AllowList {
    addresses: RwLock<HashSet<String>>,
}

/// Canonical address form: trimmed, lowercase.
pub fn normalize_address(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

impl AllowList {
    /// Load the allow-list from a file.
    ///
    /// An unreadable file is an error; the process must not start
    /// serving without its configured restrictions.
    pub fn load(path: &Path) -> Result<Self, AllowListError> {
        let raw = fs::read_to_string(path).map_err(|source| AllowListError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::default();
        list.replace(parse_entries(&raw));
        Ok(list)
    }

    /// Atomically replace the whole set. Entries are normalized here.
    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let new: HashSet<String> = entries
            .into_iter()
            .map(|entry| normalize_address(entry.as_ref()))
            .collect();
        *self.write() = new;
    }

    /// Exact-match membership test on the canonical form.
    pub fn is_authorized(&self, address: &str) -> bool {
        self.read().contains(&normalize_address(address))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.addresses.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.addresses.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Yield usable entries from the raw file content.
fn parse_entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
