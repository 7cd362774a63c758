use serde::{Deserialize, Serialize};

use crate::{
    backend::{
        BackendError, CatalogLabels, DatasetAnalytics, HealthStatus, SearchBackend, SearchRequest,
    },
    engine::{PersonalizationEngine, ScoredProduct},
    preferences::SearchFilters,
    search_context::HistoryEntry,
};

/// Longest query the backend accepts, in characters.
pub const MAX_QUERY_LEN: usize = 500;
pub const MAX_RESULTS_LIMIT: usize = 50;

/// Search input refused before it reaches the backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidSearch {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("query is {0} characters, at most 500 are allowed")]
    QueryTooLong(usize),

    #[error("max_results must be between 1 and 50, got {0}")]
    MaxResults(usize),
}

/// Checks a query and result count against the backend's request limits.
pub fn validate_search(query: &str, max_results: Option<usize>) -> Result<(), InvalidSearch> {
    let query = query.trim();
    if query.is_empty() {
        return Err(InvalidSearch::EmptyQuery);
    }

    let len = query.chars().count();
    if len > MAX_QUERY_LEN {
        return Err(InvalidSearch::QueryTooLong(len));
    }

    match max_results {
        Some(n) if !(1..=MAX_RESULTS_LIMIT).contains(&n) => Err(InvalidSearch::MaxResults(n)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOpts {
    pub max_results: Option<usize>,
    /// Send the stored preferences as backend filters.
    pub personalize_filters: bool,
    /// Skip personalized re-ranking and keep the backend order.
    pub raw: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedResults {
    pub query: String,
    pub message: String,
    pub entry: HistoryEntry,
    pub results: Vec<ScoredProduct>,
}

/// Connects the search backend to the personalization engine: every search
/// is recorded in the history and its results are ranked before returning.
pub struct ShopService {
    backend: Box<dyn SearchBackend>,
    engine: PersonalizationEngine,
}

impl ShopService {
    pub fn new(backend: Box<dyn SearchBackend>, engine: PersonalizationEngine) -> Self {
        Self { backend, engine }
    }

    pub fn engine(&self) -> &PersonalizationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PersonalizationEngine {
        &mut self.engine
    }

    pub fn search(&mut self, query: &str, opts: SearchOpts) -> anyhow::Result<PersonalizedResults> {
        validate_search(query, opts.max_results)?;
        let query = query.trim();

        let filters = if opts.personalize_filters {
            self.engine.preferences().to_search_filters()
        } else {
            SearchFilters::default()
        };

        let request = SearchRequest {
            query: query.to_string(),
            max_results: opts.max_results,
            filters: opts.personalize_filters.then(|| filters.clone()),
        };

        let response = self.backend.search(&request)?;
        log::info!(
            "backend returned {} results for {:?}",
            response.results.len(),
            query
        );

        // a failed history write should not hide the results
        let entry = match self
            .engine
            .search_context_mut()
            .record_search(query, &response.results, &filters)
        {
            Ok(entry) => entry,
            Err(err) => {
                log::error!("search not recorded: {err}");
                HistoryEntry {
                    id: Default::default(),
                    query: query.to_string(),
                    timestamp: chrono::Utc::now(),
                    result_count: response.results.len(),
                    filters,
                    clicked_results: vec![],
                }
            }
        };

        let results = if opts.raw {
            response
                .results
                .into_iter()
                .map(|product| ScoredProduct {
                    personalized_score: self.engine.score(&product),
                    product,
                })
                .collect()
        } else {
            self.engine.rank(response.results)
        };

        Ok(PersonalizedResults {
            query: query.to_string(),
            message: response.message,
            entry,
            results,
        })
    }

    pub fn health(&self) -> Result<HealthStatus, BackendError> {
        self.backend.health()
    }

    pub fn analytics(&self) -> Result<DatasetAnalytics, BackendError> {
        self.backend.analytics()
    }

    pub fn categories(&self) -> Result<CatalogLabels, BackendError> {
        self.backend.categories()
    }

    pub fn brands(&self) -> Result<CatalogLabels, BackendError> {
        self.backend.brands()
    }
}
