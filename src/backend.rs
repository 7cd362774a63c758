use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{preferences::SearchFilters, product::Product};

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("reqwest error: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search failed: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results_count: usize,
    #[serde(default)]
    pub results: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_method: Option<String>,
    #[serde(default)]
    pub processing_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub dataset_loaded: bool,
    #[serde(default)]
    pub dataset_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOverview {
    pub total_products: u64,
    pub unique_categories: u64,
    pub unique_brands: u64,
    pub unique_materials: u64,
    pub unique_colors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceStats {
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub products_with_prices: u64,
    pub products_without_prices: u64,
}

/// How many products carry each field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataCompleteness {
    pub total_products: u64,
    pub with_title: u64,
    pub with_price: u64,
    pub with_category: u64,
    pub with_brand: u64,
    pub with_material: u64,
    pub with_color: u64,
    pub with_images: u64,
    pub with_description: u64,
}

/// Aggregate dataset statistics reported by the backend. Distributions map a
/// label (a price band such as "Under $50", or a category/brand/material/color
/// name) to its product count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetAnalytics {
    pub overview: AnalyticsOverview,
    pub price_stats: PriceStats,
    pub price_distribution: BTreeMap<String, u64>,
    pub top_categories: BTreeMap<String, u64>,
    pub top_brands: BTreeMap<String, u64>,
    pub top_materials: BTreeMap<String, u64>,
    pub top_colors: BTreeMap<String, u64>,
    pub data_completeness: DataCompleteness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// Catalog labels with their product counts, as listed by the backend's
/// `/api/categories` and `/api/brands`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogLabels {
    #[serde(default, alias = "total_categories", alias = "total_brands")]
    pub total: u64,
    #[serde(default, alias = "categories", alias = "brands")]
    pub counts: BTreeMap<String, u64>,
}

impl CatalogLabels {
    /// Returns the catalog spelling of `label`, matched case-insensitively.
    pub fn find(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.counts
            .keys()
            .find(|known| known.eq_ignore_ascii_case(label))
            .map(|known| known.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, what: &str) -> Result<T, BackendError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(BackendError::Rejected(format!("{what} unavailable"))),
        }
    }
}

/// Furniture search service the engine ranks results from.
pub trait SearchBackend: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
    fn health(&self) -> Result<HealthStatus, BackendError>;
    fn analytics(&self) -> Result<DatasetAnalytics, BackendError>;
    fn categories(&self) -> Result<CatalogLabels, BackendError>;
    fn brands(&self) -> Result<CatalogLabels, BackendError>;
}

pub struct BackendRemote {
    remote_addr: String,
}

impl BackendRemote {
    pub fn new(addr: &str) -> BackendRemote {
        let remote_addr = addr.strip_suffix("/").unwrap_or(addr).to_string();

        BackendRemote { remote_addr }
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        log::info!("GET {}{}", self.remote_addr, url);
        reqwest::blocking::Client::new().get(format!("{}{}", self.remote_addr, url))
    }

    fn post(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        log::info!("POST {}{}", self.remote_addr, url);
        reqwest::blocking::Client::new().post(format!("{}{}", self.remote_addr, url))
    }
}

fn handle_response<T>(response: reqwest::blocking::Response) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let text = response.text()?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str::<T>(&text).map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        err.into()
    })
}

impl SearchBackend for BackendRemote {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let resp = self.post("/api/search").json(request).send()?;
        let response: SearchResponse = handle_response(resp)?;

        if !response.success {
            return Err(BackendError::Rejected(response.message));
        }

        Ok(response)
    }

    fn health(&self) -> Result<HealthStatus, BackendError> {
        let resp = self.get("/health").send()?;
        handle_response(resp)
    }

    fn analytics(&self) -> Result<DatasetAnalytics, BackendError> {
        let resp = self.get("/api/analytics").send()?;
        let envelope: Envelope<DatasetAnalytics> = handle_response(resp)?;
        envelope.into_data("analytics")
    }

    fn categories(&self) -> Result<CatalogLabels, BackendError> {
        let resp = self.get("/api/categories").send()?;
        let envelope: Envelope<CatalogLabels> = handle_response(resp)?;
        envelope.into_data("categories")
    }

    fn brands(&self) -> Result<CatalogLabels, BackendError> {
        let resp = self.get("/api/brands").send()?;
        let envelope: Envelope<CatalogLabels> = handle_response(resp)?;
        envelope.into_data("brands")
    }
}
