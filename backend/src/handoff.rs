//! Short-lived, token-keyed server-side sessions.
//!
//! A `HandoffStore` holds values that one request prepares and a later
//! request picks up: the pending-image queue and report selections. Each
//! entry expires after sitting idle for the store's TTL; reads ignore expired
//! entries and [`start_sweeper`] drops them periodically.
//!
//! The store is cloned into the Actix application state the same way as any
//! other shared handle: the map lives behind an `Arc<RwLock<..>>`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

pub struct HandoffStore<T> {
    entries: Arc<RwLock<HashMap<String, Entry<T>>>>,
    ttl: ChronoDuration,
}

impl<T> Clone for HandoffStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> HandoffStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::minutes(10)),
        }
    }

    /// Stores `value` under a fresh token.
    pub async fn insert(&self, value: T) -> (String, DateTime<Utc>) {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;
        self.entries
            .write()
            .await
            .insert(token.clone(), Entry { value, expires_at });
        (token, expires_at)
    }

    /// Live value for `token`.
    pub async fn get(&self, token: &str) -> Option<(T, DateTime<Utc>)> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| (entry.value.clone(), entry.expires_at))
    }

    /// Applies `f` to a live entry and refreshes its expiry.
    ///
    /// Returns `None` when the token is unknown or expired.
    pub async fn update<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<(R, DateTime<Utc>)> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let entry = entries.get_mut(token).filter(|entry| entry.expires_at > now)?;
        let result = f(&mut entry.value);
        entry.expires_at = now + self.ttl;
        Some((result, entry.expires_at))
    }

    pub async fn remove(&self, token: &str) -> Option<T> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(token)?;
        (entry.expires_at > Utc::now()).then_some(entry.value)
    }

    /// Drops expired entries and returns them.
    pub async fn sweep(&self) -> Vec<T> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Vec<T> {
        let mut entries = self.entries.write().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(token, _)| token.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|token| entries.remove(&token))
            .map(|entry| entry.value)
            .collect()
    }
}

/// Periodically sweeps `store`. Meant to be spawned once at startup.
pub async fn start_sweeper<T>(name: &'static str, store: HandoffStore<T>, every: Duration)
where
    T: Clone + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let dropped = store.sweep().await;
        if !dropped.is_empty() {
            log::info!("Dropped {} expired {name} session(s)", dropped.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_readable_until_they_expire() {
        let store: HandoffStore<Vec<String>> = HandoffStore::new(Duration::from_secs(60));
        let (token, expires_at) = store.insert(vec!["a".into()]).await;

        let (value, seen_expiry) = store.get(&token).await.unwrap();
        assert_eq!(value, vec!["a".to_string()]);
        assert_eq!(seen_expiry, expires_at);

        let swept = store.sweep_at(expires_at + ChronoDuration::seconds(1)).await;
        assert_eq!(swept.len(), 1);
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn update_refreshes_expiry() {
        let store: HandoffStore<u32> = HandoffStore::new(Duration::from_secs(60));
        let (token, first_expiry) = store.insert(1).await;

        let (previous, new_expiry) = store
            .update(&token, |value| {
                *value += 1;
                *value - 1
            })
            .await
            .unwrap();
        assert_eq!(previous, 1);
        assert!(new_expiry >= first_expiry);
        assert_eq!(store.get(&token).await.unwrap().0, 2);
    }

    #[tokio::test]
    async fn unknown_tokens_are_absent() {
        let store: HandoffStore<u32> = HandoffStore::new(Duration::from_secs(60));
        assert!(store.get("nope").await.is_none());
        assert!(store.update("nope", |_| ()).await.is_none());
        assert!(store.remove("nope").await.is_none());
        assert!(store.sweep_at(Utc::now() + ChronoDuration::days(1)).await.is_empty());
    }
}
