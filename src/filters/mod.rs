// src/filters/mod.rs - Word filter registry and matcher

use log::info;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::durations::parse_duration;
use crate::store::{FilterStore, StoreError};
use crate::types::{Filter, FilterError, FilterMatch, SteamId};

#[derive(Debug, Error)]
pub enum WordFilterError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid duration")]
    InvalidDuration,
}

/// Fields an admin supplies when creating or editing a filter.
#[derive(Debug, Clone)]
pub struct FilterOpts {
    pub pattern: String,
    pub is_regex: bool,
    pub is_enabled: bool,
    pub action: crate::types::FilterAction,
    pub duration: String,
    pub weight: u32,
}

/// In-memory cache of configured filters, kept in sync with the store.
///
/// Reads (matching every inbound chat line across all servers) take a
/// shared lock and run concurrently; admin mutations take the exclusive
/// lock briefly. A message that matched a filter just before its removal
/// is still honored.
pub struct WordFilters {
    filters: RwLock<Vec<Filter>>,
    store: Arc<dyn FilterStore>,
}

impl WordFilters {
    pub fn new(store: Arc<dyn FilterStore>) -> Self {
        Self {
            filters: RwLock::new(Vec::new()),
            store,
        }
    }

    /// Replace the registry contents with the filters currently persisted,
    /// compiling regex patterns. Called at startup and after bulk edits.
    pub async fn import(&self) -> Result<usize, WordFilterError> {
        let mut loaded = match self.store.get_filters().await {
            Ok(filters) => filters,
            Err(StoreError::NoResult) => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        for filter in &mut loaded {
            filter.compile()?;
        }

        let count = loaded.len();
        *self.filters.write().await = loaded;

        info!("Loaded {} word filters", count);

        Ok(count)
    }

    /// Find the first enabled filter matching any token of the message.
    ///
    /// Filters are scanned in registry insertion order and tokens left to
    /// right, so results are deterministic for a given registry state.
    pub async fn match_message(&self, body: &str) -> Option<(String, FilterMatch)> {
        if body.is_empty() {
            return None;
        }

        let lowered = body.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let filters = self.filters.read().await;
        for filter in filters.iter() {
            for token in &tokens {
                if filter.is_enabled && filter.matches(token) {
                    return Some((token.to_string(), filter.snapshot()));
                }
            }
        }

        None
    }

    /// Diagnostic variant of [`match_message`]: every filter matched by
    /// any token, disabled filters included. Used by admin tooling to dry
    /// test a phrase, never by the live warning path.
    ///
    /// [`match_message`]: WordFilters::match_message
    pub async fn check_message(&self, body: &str) -> Vec<Filter> {
        if body.is_empty() {
            return Vec::new();
        }

        let lowered = body.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let filters = self.filters.read().await;
        let mut found = Vec::new();

        for filter in filters.iter() {
            if tokens.iter().any(|token| filter.matches(token)) {
                found.push(filter.clone());
            }
        }

        found
    }

    /// Validate and persist a new filter, then publish it to the registry.
    pub async fn create(&self, author: SteamId, opts: FilterOpts) -> Result<Filter, WordFilterError> {
        if opts.pattern.is_empty() {
            return Err(FilterError::InvalidPattern.into());
        }

        if opts.weight < 1 {
            return Err(FilterError::InvalidWeight.into());
        }

        parse_duration(&opts.duration).map_err(|_| WordFilterError::InvalidDuration)?;

        let mut filter = Filter::new(
            author,
            opts.pattern,
            opts.is_regex,
            opts.action,
            opts.duration,
            opts.weight,
        )?;
        filter.is_enabled = opts.is_enabled;

        self.store.save_filter(&mut filter).await?;

        self.filters.write().await.push(filter.clone());

        info!("Created filter {} ({})", filter.filter_id, filter.pattern);

        Ok(filter)
    }

    /// Update an existing filter and swap it into the registry.
    pub async fn edit(
        &self,
        author: SteamId,
        filter_id: i64,
        opts: FilterOpts,
    ) -> Result<Filter, WordFilterError> {
        let mut existing = self.store.get_filter_by_id(filter_id).await?;

        existing.author_id = author;
        existing.pattern = opts.pattern;
        existing.is_regex = opts.is_regex;
        existing.is_enabled = opts.is_enabled;
        existing.action = opts.action;
        existing.duration = opts.duration;
        existing.weight = opts.weight;
        existing.compile()?;

        self.store.save_filter(&mut existing).await?;

        let mut filters = self.filters.write().await;
        filters.retain(|filter| filter.filter_id != filter_id);
        filters.push(existing.clone());
        drop(filters);

        info!("Filter {} updated", filter_id);

        Ok(existing)
    }

    /// Delete a filter from storage and the registry. Returns
    /// [`StoreError::NoResult`] when the id is unknown.
    pub async fn drop_filter(&self, filter_id: i64) -> Result<(), WordFilterError> {
        let filter = self.store.get_filter_by_id(filter_id).await?;
        self.store.drop_filter(&filter).await?;

        self.filters
            .write()
            .await
            .retain(|entry| entry.filter_id != filter_id);

        info!("Deleted filter {}", filter_id);

        Ok(())
    }

    /// Increment a filter's trigger counter and persist it. Invoked by the
    /// warning tracker on every match, including matches against disabled
    /// filters and matches seen in dry-run mode.
    pub async fn record_trigger(&self, filter_id: i64) -> Result<(), WordFilterError> {
        let mut filters = self.filters.write().await;
        let filter = filters
            .iter_mut()
            .find(|filter| filter.filter_id == filter_id)
            .ok_or(StoreError::NoResult)?;

        filter.trigger_count += 1;

        let mut to_save = filter.clone();
        drop(filters);

        self.store.save_filter(&mut to_save).await?;

        Ok(())
    }

    /// Snapshot of all registered filters.
    pub async fn state(&self) -> Vec<Filter> {
        self.filters.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::FilterAction;

    fn author() -> SteamId {
        SteamId::new(76561198044497130)
    }

    fn opts(pattern: &str, is_regex: bool, weight: u32) -> FilterOpts {
        FilterOpts {
            pattern: pattern.to_string(),
            is_regex,
            is_enabled: true,
            action: FilterAction::Warn,
            duration: "1d".to_string(),
            weight,
        }
    }

    async fn registry() -> WordFilters {
        WordFilters::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_match_returns_first_in_registry_order() {
        let filters = registry().await;
        filters.create(author(), opts("alpha", false, 1)).await.unwrap();
        filters.create(author(), opts("beta", false, 2)).await.unwrap();

        // Both filters match a token. Registry order wins, not token order.
        let (word, matched) = filters
            .match_message("something beta then alpha")
            .await
            .unwrap();
        assert_eq!(word, "alpha");
        assert_eq!(matched.weight, 1);
    }

    #[tokio::test]
    async fn test_match_is_case_insensitive() {
        let filters = registry().await;
        filters.create(author(), opts("badword", false, 1)).await.unwrap();

        let (word, _) = filters.match_message("you BADWORD you").await.unwrap();
        assert_eq!(word, "badword");
    }

    #[tokio::test]
    async fn test_empty_message_no_match() {
        let filters = registry().await;
        filters.create(author(), opts("badword", false, 1)).await.unwrap();

        assert!(filters.match_message("").await.is_none());
        assert!(filters.match_message("all clean here").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_filter_skipped_by_match_but_not_check() {
        let filters = registry().await;
        let mut filter_opts = opts("badword", false, 1);
        filter_opts.is_enabled = false;
        filters.create(author(), filter_opts).await.unwrap();

        assert!(filters.match_message("badword").await.is_none());

        let found = filters.check_message("badword").await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_check_returns_all_matches() {
        let filters = registry().await;
        filters.create(author(), opts("alpha", false, 1)).await.unwrap();
        filters.create(author(), opts("beta", false, 1)).await.unwrap();
        filters.create(author(), opts("gamma", false, 1)).await.unwrap();

        let found = filters.check_message("alpha beta unrelated").await;
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let filters = registry().await;

        let result = filters.create(author(), opts("", false, 1)).await;
        assert!(matches!(
            result,
            Err(WordFilterError::Filter(FilterError::InvalidPattern))
        ));

        let result = filters.create(author(), opts("word", false, 0)).await;
        assert!(matches!(
            result,
            Err(WordFilterError::Filter(FilterError::InvalidWeight))
        ));

        let result = filters.create(author(), opts("[bad", true, 1)).await;
        assert!(matches!(
            result,
            Err(WordFilterError::Filter(FilterError::InvalidRegex))
        ));

        let mut bad_duration = opts("word", false, 1);
        bad_duration.duration = "nope".to_string();
        let result = filters.create(author(), bad_duration).await;
        assert!(matches!(result, Err(WordFilterError::InvalidDuration)));
    }

    #[tokio::test]
    async fn test_duplicate_create_surfaced() {
        let filters = registry().await;
        filters.create(author(), opts("word", false, 1)).await.unwrap();

        let result = filters.create(author(), opts("word", false, 1)).await;
        assert!(matches!(
            result,
            Err(WordFilterError::Store(StoreError::Duplicate))
        ));
    }

    #[tokio::test]
    async fn test_removed_filter_never_matches_again() {
        let filters = registry().await;
        let filter = filters.create(author(), opts("badword", false, 1)).await.unwrap();

        assert!(filters.match_message("badword").await.is_some());

        filters.drop_filter(filter.filter_id).await.unwrap();
        assert!(filters.match_message("badword").await.is_none());

        // Removing it again is a distinguished no-result, not a crash.
        let result = filters.drop_filter(filter.filter_id).await;
        assert!(matches!(
            result,
            Err(WordFilterError::Store(StoreError::NoResult))
        ));
    }

    #[tokio::test]
    async fn test_record_trigger_increments_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let filters = WordFilters::new(store.clone());
        let filter = filters.create(author(), opts("word", false, 1)).await.unwrap();

        filters.record_trigger(filter.filter_id).await.unwrap();
        filters.record_trigger(filter.filter_id).await.unwrap();

        let in_registry = filters.state().await;
        assert_eq!(in_registry[0].trigger_count, 2);

        let persisted = store.get_filter_by_id(filter.filter_id).await.unwrap();
        assert_eq!(persisted.trigger_count, 2);
    }

    #[tokio::test]
    async fn test_edit_swaps_registry_entry() {
        let filters = registry().await;
        let filter = filters.create(author(), opts("before", false, 1)).await.unwrap();

        let mut updated = opts("after", false, 3);
        updated.is_enabled = true;
        filters.edit(author(), filter.filter_id, updated).await.unwrap();

        assert!(filters.match_message("before").await.is_none());
        let (_, matched) = filters.match_message("after").await.unwrap();
        assert_eq!(matched.weight, 3);
    }

    #[tokio::test]
    async fn test_concurrent_match_and_mutation() {
        let filters = Arc::new(registry().await);
        filters.create(author(), opts("badword", false, 1)).await.unwrap();

        let mut readers = Vec::new();
        for _ in 0..8 {
            let filters = filters.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    // Either the pre- or post-mutation set is observed,
                    // never a torn one; this must simply not panic or race.
                    let _ = filters.match_message("badword or extra").await;
                }
            }));
        }

        let writer = {
            let filters = filters.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let created = filters
                        .create(author(), opts(&format!("extra{i}"), false, 1))
                        .await
                        .unwrap();
                    filters.drop_filter(created.filter_id).await.unwrap();
                }
            })
        };

        for task in readers {
            task.await.unwrap();
        }
        writer.await.unwrap();

        assert!(filters.match_message("badword").await.is_some());
    }
}
