//! Search history and the aggregate context derived from it.
//!
//! History is newest-first and capped; the context keeps recent unique
//! queries, per-category hit counts and per-term frequencies used for
//! suggestions and ranking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    eid::Eid,
    errors::StoreResult,
    preferences::{PriceRange, SearchFilters},
    product::{Product, ProductId},
    storage::{self, StorageManager, SEARCH_HISTORY_KEY, USER_CONTEXT_KEY},
};

pub const MAX_HISTORY_ENTRIES: usize = 100;
pub const MAX_RECENT_QUERIES: usize = 20;
pub const MAX_SUGGESTIONS: usize = 8;
const MAX_RECENT_SUGGESTIONS: usize = 5;
const MIN_TERM_LEN: usize = 3;
const DEFAULT_SUGGESTED_PRICE_MAX: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Eid,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub clicked_results: Vec<ProductId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFrequency {
    pub term: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    /// Queries issued since this engine instance started.
    #[serde(skip)]
    pub current_session: Vec<String>,
    pub recent_queries: Vec<String>,
    pub preferred_categories: Vec<CategoryCount>,
    pub search_patterns: Vec<TermFrequency>,
}

impl UserContext {
    pub fn category_count(&self, category: &str) -> u32 {
        // older ledgers may hold one entry per spelling
        self.preferred_categories
            .iter()
            .filter(|c| c.category.eq_ignore_ascii_case(category.trim()))
            .map(|c| c.count)
            .sum()
    }

    pub fn top_categories(&self, n: usize) -> Vec<String> {
        self.preferred_categories
            .iter()
            .take(n)
            .map(|c| c.category.clone())
            .collect()
    }

    pub fn top_terms(&self, n: usize) -> Vec<TermFrequency> {
        let mut terms = self.search_patterns.clone();
        terms.sort_by(|a, b| b.count.cmp(&a.count));
        terms.truncate(n);
        terms
    }

    fn note_query(&mut self, query: &str) {
        self.current_session.push(query.to_string());

        self.recent_queries.retain(|q| q != query);
        self.recent_queries.insert(0, query.to_string());
        self.recent_queries.truncate(MAX_RECENT_QUERIES);

        for term in tokenize(query) {
            match self.search_patterns.iter_mut().find(|t| t.term == term) {
                Some(existing) => existing.count += 1,
                None => self.search_patterns.push(TermFrequency { term, count: 1 }),
            }
        }
    }

    fn note_categories(&mut self, categories: &[String]) {
        for category in categories {
            match self
                .preferred_categories
                .iter_mut()
                .find(|c| c.category.eq_ignore_ascii_case(category))
            {
                Some(existing) => existing.count += 1,
                None => self.preferred_categories.push(CategoryCount {
                    category: category.clone(),
                    count: 1,
                }),
            }
        }
        self.preferred_categories.sort_by(|a, b| b.count.cmp(&a.count));
    }
}

/// Lowercased whitespace tokens longer than two characters.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .filter(|token| token.chars().count() >= MIN_TERM_LEN)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Recent,
    Popular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    History,
    Patterns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub text: String,
    pub source: SuggestionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualFilters {
    pub suggested_categories: Vec<String>,
    pub suggested_price_range: PriceRange,
}

pub struct SearchContext {
    history: Vec<HistoryEntry>,
    context: UserContext,
    storage: Arc<dyn StorageManager>,
}

impl SearchContext {
    pub fn load(storage: Arc<dyn StorageManager>) -> Self {
        let mut history: Vec<HistoryEntry> =
            storage::load_or_default(storage.as_ref(), SEARCH_HISTORY_KEY);
        history.truncate(MAX_HISTORY_ENTRIES);
        let context = storage::load_or_default(storage.as_ref(), USER_CONTEXT_KEY);

        Self {
            history,
            context,
            storage,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    pub fn total_searches(&self) -> usize {
        self.history.len()
    }

    pub fn record_search(
        &mut self,
        query: &str,
        results: &[Product],
        filters: &SearchFilters,
    ) -> StoreResult<HistoryEntry> {
        let id = match self.history.first() {
            Some(latest) => Eid::after(&latest.id),
            None => Eid::new(),
        };

        let entry = HistoryEntry {
            id,
            query: query.to_string(),
            timestamp: Utc::now(),
            result_count: results.len(),
            filters: filters.clone(),
            clicked_results: vec![],
        };

        let mut history = self.history.clone();
        history.insert(0, entry.clone());
        history.truncate(MAX_HISTORY_ENTRIES);

        let mut context = self.context.clone();
        context.note_query(query);
        context.note_categories(&filters.categories);

        self.persist(&history, &context)?;
        self.history = history;
        self.context = context;

        log::debug!(
            "recorded search {:?} ({} results, {} in history)",
            entry.query,
            entry.result_count,
            self.history.len()
        );

        Ok(entry)
    }

    /// Appends a clicked product to an existing history entry.
    pub fn record_click(&mut self, entry_id: &Eid, product_id: ProductId) -> StoreResult<bool> {
        let Some(idx) = self.history.iter().position(|e| e.id == *entry_id) else {
            return Ok(false);
        };

        let mut history = self.history.clone();
        history[idx].clicked_results.push(product_id);

        storage::write_json(self.storage.as_ref(), SEARCH_HISTORY_KEY, &history)?;
        self.history = history;
        Ok(true)
    }

    pub fn suggest(&self, partial: &str) -> Vec<Suggestion> {
        let needle = partial.trim().to_lowercase();

        let mut suggestions: Vec<Suggestion> = self
            .context
            .recent_queries
            .iter()
            .filter(|q| q.to_lowercase().contains(&needle))
            .take(MAX_RECENT_SUGGESTIONS)
            .map(|q| Suggestion {
                kind: SuggestionKind::Recent,
                text: q.clone(),
                source: SuggestionSource::History,
            })
            .collect();

        let remaining = MAX_SUGGESTIONS.saturating_sub(suggestions.len());
        suggestions.extend(
            self.context
                .search_patterns
                .iter()
                .filter(|t| t.term.contains(&needle))
                .take(remaining)
                .map(|t| Suggestion {
                    kind: SuggestionKind::Popular,
                    text: t.term.clone(),
                    source: SuggestionSource::Patterns,
                }),
        );

        // stable: insertion order within each kind is preserved
        suggestions.sort_by_key(|s| s.kind);
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    pub fn contextual_filters(&self) -> ContextualFilters {
        let price_mins = self
            .history
            .iter()
            .filter_map(|e| e.filters.price_min)
            .filter(|price| *price > 0.0)
            .collect::<Vec<_>>();

        let suggested_price_range = if price_mins.is_empty() {
            PriceRange {
                min: 0.0,
                max: DEFAULT_SUGGESTED_PRICE_MAX,
            }
        } else {
            PriceRange {
                min: price_mins.iter().cloned().fold(f64::INFINITY, f64::min),
                max: price_mins.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            }
        };

        ContextualFilters {
            suggested_categories: self.context.top_categories(3),
            suggested_price_range,
        }
    }

    pub fn clear(&mut self) -> StoreResult<()> {
        let store = self.storage.as_ref();
        storage::remove_key(store, SEARCH_HISTORY_KEY)?;

        if let Err(err) = storage::remove_key(store, USER_CONTEXT_KEY) {
            // put the history back so both ledgers still describe memory
            if let Err(restore_err) = storage::write_json(store, SEARCH_HISTORY_KEY, &self.history)
            {
                log::error!("failed to restore search history: {restore_err}");
            }
            return Err(err);
        }

        self.history.clear();
        self.context = UserContext::default();
        Ok(())
    }

    pub(crate) fn replace(
        &mut self,
        mut history: Vec<HistoryEntry>,
        context: UserContext,
    ) -> StoreResult<()> {
        history.truncate(MAX_HISTORY_ENTRIES);
        self.persist(&history, &context)?;
        self.history = history;
        self.context = context;
        Ok(())
    }

    fn persist(&self, history: &[HistoryEntry], context: &UserContext) -> StoreResult<()> {
        let store = self.storage.as_ref();
        storage::write_json(store, SEARCH_HISTORY_KEY, history)?;

        if let Err(err) = storage::write_json(store, USER_CONTEXT_KEY, context) {
            // keep the two ledgers in step
            if let Err(restore_err) = storage::write_json(store, SEARCH_HISTORY_KEY, &self.history)
            {
                log::error!("failed to restore search history: {restore_err}");
            }
            return Err(err);
        }

        Ok(())
    }
}
