// src/store/mod.rs - Persistence seam consumed by the filter registry and tracker

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::{Filter, Person, SteamId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// An identical entry already exists. Admin tooling presents this as
    /// "already exists" rather than a generic failure.
    #[error("duplicate entry")]
    Duplicate,
    /// No matching row. Callers may treat this as a no-op.
    #[error("no result")]
    NoResult,
    #[error("failed to save changes: {0}")]
    SaveChanges(String),
}

/// Narrow persistence interface the moderation core depends on. The real
/// deployment backs this with the site database; tests and the demo
/// binary use [`MemoryStore`].
#[async_trait]
pub trait FilterStore: Send + Sync {
    /// Insert or update a filter. New filters (id 0) are assigned an id,
    /// written back into the passed value.
    async fn save_filter(&self, filter: &mut Filter) -> Result<(), StoreError>;

    async fn drop_filter(&self, filter: &Filter) -> Result<(), StoreError>;

    async fn get_filters(&self) -> Result<Vec<Filter>, StoreError>;

    async fn get_filter_by_id(&self, filter_id: i64) -> Result<Filter, StoreError>;

    /// Resolve a player's profile for notification embeds.
    async fn get_person_by_steam_id(&self, steam_id: SteamId) -> Result<Person, StoreError>;
}

/// In-memory store implementation.
pub struct MemoryStore {
    filters: RwLock<HashMap<i64, Filter>>,
    persons: RwLock<HashMap<SteamId, Person>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            persons: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn put_person(&self, person: Person) {
        self.persons.write().await.insert(person.steam_id, person);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilterStore for MemoryStore {
    async fn save_filter(&self, filter: &mut Filter) -> Result<(), StoreError> {
        let mut filters = self.filters.write().await;

        if filter.filter_id == 0 {
            let duplicate = filters
                .values()
                .any(|existing| existing.pattern == filter.pattern && existing.is_regex == filter.is_regex);
            if duplicate {
                return Err(StoreError::Duplicate);
            }

            filter.filter_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        } else if !filters.contains_key(&filter.filter_id) {
            return Err(StoreError::NoResult);
        }

        filter.updated_on = chrono::Utc::now();
        filters.insert(filter.filter_id, filter.clone());

        Ok(())
    }

    async fn drop_filter(&self, filter: &Filter) -> Result<(), StoreError> {
        let mut filters = self.filters.write().await;
        filters
            .remove(&filter.filter_id)
            .map(|_| ())
            .ok_or(StoreError::NoResult)
    }

    async fn get_filters(&self) -> Result<Vec<Filter>, StoreError> {
        let filters = self.filters.read().await;
        let mut all: Vec<Filter> = filters.values().cloned().collect();
        all.sort_by_key(|filter| filter.filter_id);

        Ok(all)
    }

    async fn get_filter_by_id(&self, filter_id: i64) -> Result<Filter, StoreError> {
        self.filters
            .read()
            .await
            .get(&filter_id)
            .cloned()
            .ok_or(StoreError::NoResult)
    }

    async fn get_person_by_steam_id(&self, steam_id: SteamId) -> Result<Person, StoreError> {
        self.persons
            .read()
            .await
            .get(&steam_id)
            .cloned()
            .ok_or(StoreError::NoResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterAction;

    fn test_filter(pattern: &str) -> Filter {
        Filter::new(
            SteamId::new(76561198044497130),
            pattern.to_string(),
            false,
            FilterAction::Warn,
            "0".to_string(),
            1,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_id() {
        let store = MemoryStore::new();
        let mut filter = test_filter("word");

        store.save_filter(&mut filter).await.unwrap();
        assert!(filter.filter_id > 0);

        let loaded = store.get_filter_by_id(filter.filter_id).await.unwrap();
        assert_eq!(loaded.pattern, "word");
    }

    #[tokio::test]
    async fn test_duplicate_pattern_rejected() {
        let store = MemoryStore::new();
        let mut first = test_filter("word");
        store.save_filter(&mut first).await.unwrap();

        let mut second = test_filter("word");
        let result = store.save_filter(&mut second).await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn test_update_existing_filter() {
        let store = MemoryStore::new();
        let mut filter = test_filter("word");
        store.save_filter(&mut filter).await.unwrap();

        filter.trigger_count = 5;
        store.save_filter(&mut filter).await.unwrap();

        let loaded = store.get_filter_by_id(filter.filter_id).await.unwrap();
        assert_eq!(loaded.trigger_count, 5);
    }

    #[tokio::test]
    async fn test_drop_missing_is_no_result() {
        let store = MemoryStore::new();
        let filter = test_filter("word");

        let result = store.drop_filter(&filter).await;
        assert!(matches!(result, Err(StoreError::NoResult)));
    }

    #[tokio::test]
    async fn test_person_lookup() {
        let store = MemoryStore::new();
        let steam_id = SteamId::new(76561198044497130);

        assert!(matches!(
            store.get_person_by_steam_id(steam_id).await,
            Err(StoreError::NoResult)
        ));

        store
            .put_person(Person {
                steam_id,
                persona_name: "player".to_string(),
                avatar: String::new(),
            })
            .await;

        let person = store.get_person_by_steam_id(steam_id).await.unwrap();
        assert_eq!(person.persona_name, "player");
    }

    #[tokio::test]
    async fn test_get_filters_ordered_by_id() {
        let store = MemoryStore::new();
        for pattern in ["one", "two", "three"] {
            let mut filter = test_filter(pattern);
            store.save_filter(&mut filter).await.unwrap();
        }

        let all = store.get_filters().await.unwrap();
        let ids: Vec<i64> = all.iter().map(|f| f.filter_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
