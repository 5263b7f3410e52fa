//! One-time code generation and storage.
//!
//! Codes are kept only as SHA-256 digests. The store is an injected
//! abstraction so verification can be driven with an explicit clock in
//! tests and backed by a shared cache in production.

use std::collections::HashMap;
use std::sync::Arc;

use chitfund_core::error::ChitFundResult;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Lowest and highest six-digit code.
const CODE_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// Generate a uniformly random six-digit numeric code.
pub fn generate_code() -> String {
    rand::rng().random_range(CODE_RANGE).to_string()
}

/// SHA-256 of a code, hex-encoded.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// A pending one-time code for a single identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEntry {
    pub code_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpEntry {
    pub fn new(code: &str, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            code_hash: hash_code(code),
            issued_at,
            expires_at: issued_at + lifetime,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code_hash == hash_code(code)
    }
}

/// Outcome of [`OtpStore::compare_and_evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerdict {
    /// Code matched; the entry has been evicted.
    Verified,
    NotFound,
    /// The entry was stale and has been evicted.
    Expired,
    /// Code differs; the entry stays in place.
    Mismatch,
}

/// Key-value store for pending one-time codes.
///
/// Keys are exact identity strings. `put` replaces any previous entry
/// for the key, so only the most recent code is ever valid.
pub trait OtpStore: Send + Sync {
    fn put(&self, key: &str, entry: OtpEntry) -> impl Future<Output = ChitFundResult<()>> + Send;
    fn get(&self, key: &str) -> impl Future<Output = ChitFundResult<Option<OtpEntry>>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = ChitFundResult<Option<OtpEntry>>> + Send;
    /// Atomically check expiry and the submitted code, evicting the
    /// entry when it is consumed or stale.
    fn compare_and_evict(
        &self,
        key: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = ChitFundResult<OtpVerdict>> + Send;
}

impl<T: OtpStore> OtpStore for Arc<T> {
    fn put(&self, key: &str, entry: OtpEntry) -> impl Future<Output = ChitFundResult<()>> + Send {
        (**self).put(key, entry)
    }

    fn get(&self, key: &str) -> impl Future<Output = ChitFundResult<Option<OtpEntry>>> + Send {
        (**self).get(key)
    }

    fn remove(&self, key: &str) -> impl Future<Output = ChitFundResult<Option<OtpEntry>>> + Send {
        (**self).remove(key)
    }

    fn compare_and_evict(
        &self,
        key: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = ChitFundResult<OtpVerdict>> + Send {
        (**self).compare_and_evict(key, code, now)
    }
}

/// Process-local [`OtpStore`] guarded by a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry that has expired by `now`. Returns how many
    /// were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }
}

impl OtpStore for InMemoryOtpStore {
    async fn put(&self, key: &str, entry: OtpEntry) -> ChitFundResult<()> {
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> ChitFundResult<Option<OtpEntry>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> ChitFundResult<Option<OtpEntry>> {
        Ok(self.entries.lock().remove(key))
    }

    async fn compare_and_evict(
        &self,
        key: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ChitFundResult<OtpVerdict> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(key) else {
            return Ok(OtpVerdict::NotFound);
        };

        let verdict = if entry.is_expired_at(now) {
            OtpVerdict::Expired
        } else if entry.matches(code) {
            OtpVerdict::Verified
        } else {
            OtpVerdict::Mismatch
        };

        if verdict != OtpVerdict::Mismatch {
            entries.remove(key);
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, issued_at: DateTime<Utc>) -> OtpEntry {
        OtpEntry::new(code, issued_at, Duration::minutes(10))
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!(CODE_RANGE.contains(&n));
        }
    }

    #[test]
    fn entry_stores_hash_not_code() {
        let e = entry("123456", Utc::now());
        assert_ne!(e.code_hash, "123456");
        assert_eq!(e.code_hash.len(), 64);
        assert!(e.matches("123456"));
        assert!(!e.matches("654321"));
    }

    #[test]
    fn expiry_is_exclusive_of_the_deadline() {
        let issued = Utc::now();
        let e = entry("123456", issued);
        assert!(!e.is_expired_at(e.expires_at));
        assert!(e.is_expired_at(e.expires_at + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn verified_code_is_single_use() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        store.put("a@b.com", entry("123456", now)).await.unwrap();

        let first = store.compare_and_evict("a@b.com", "123456", now).await.unwrap();
        assert_eq!(first, OtpVerdict::Verified);

        let second = store.compare_and_evict("a@b.com", "123456", now).await.unwrap();
        assert_eq!(second, OtpVerdict::NotFound);
    }

    #[tokio::test]
    async fn mismatch_keeps_entry() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        store.put("a@b.com", entry("123456", now)).await.unwrap();

        let verdict = store.compare_and_evict("a@b.com", "000000", now).await.unwrap();
        assert_eq!(verdict, OtpVerdict::Mismatch);
        assert!(store.get("a@b.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entry_is_evicted() {
        let store = InMemoryOtpStore::new();
        let issued = Utc::now() - Duration::minutes(11);
        store.put("a@b.com", entry("123456", issued)).await.unwrap();

        let verdict = store
            .compare_and_evict("a@b.com", "123456", Utc::now())
            .await
            .unwrap();
        assert_eq!(verdict, OtpVerdict::Expired);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn keys_match_exactly() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        store.put("a@b.com", entry("123456", now)).await.unwrap();

        let verdict = store.compare_and_evict("A@B.COM", "123456", now).await.unwrap();
        assert_eq!(verdict, OtpVerdict::NotFound);
    }

    #[tokio::test]
    async fn reissue_replaces_previous_code() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        store.put("a@b.com", entry("111111", now)).await.unwrap();
        store.put("a@b.com", entry("222222", now)).await.unwrap();

        assert_eq!(store.len(), 1);
        let verdict = store.compare_and_evict("a@b.com", "111111", now).await.unwrap();
        assert_eq!(verdict, OtpVerdict::Mismatch);
    }

    #[test]
    fn purge_drops_only_stale_entries() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        {
            let mut entries = store.entries.lock();
            entries.insert("old".into(), entry("111111", now - Duration::hours(1)));
            entries.insert("new".into(), entry("222222", now));
        }
        assert_eq!(store.purge_expired(now), 1);
        assert_eq!(store.len(), 1);
    }
}
