mod engine;
mod service;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::{
    backend::{
        AnalyticsOverview, BackendError, CatalogLabels, DatasetAnalytics, HealthStatus,
        SearchBackend, SearchRequest, SearchResponse,
    },
    engine::PersonalizationEngine,
    product::{Product, ProductId},
    service::ShopService,
    storage::BackendMemory,
};

pub fn product(id: u64, category: &str, price: f64) -> Product {
    Product {
        id: ProductId::from(id),
        title: format!("{category} piece {id}"),
        price: Some(price),
        category: Some(category.to_string()),
        ..Default::default()
    }
}

pub fn memory_engine() -> (PersonalizationEngine, Arc<BackendMemory>) {
    let storage = Arc::new(BackendMemory::new());
    (PersonalizationEngine::load(storage.clone()), storage)
}

/// Canned backend that remembers the last request it was sent.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub results: Vec<Product>,
    pub fail: Arc<AtomicBool>,
    pub last_request: Arc<Mutex<Option<SearchRequest>>>,
}

impl FakeBackend {
    pub fn with_results(results: Vec<Product>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }
}

impl SearchBackend for FakeBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        *self.last_request.lock().unwrap() = Some(request.clone());

        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 503,
                body: "dataset not loaded".into(),
            });
        }

        Ok(SearchResponse {
            success: true,
            message: format!("Found {} items", self.results.len()),
            query: request.query.clone(),
            results_count: self.results.len(),
            results: self.results.clone(),
            search_method: Some("keyword".into()),
            processing_time: 0.001,
        })
    }

    fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "healthy".into(),
            dataset_loaded: true,
            dataset_size: self.results.len(),
            ..Default::default()
        })
    }

    fn analytics(&self) -> Result<DatasetAnalytics, BackendError> {
        Ok(DatasetAnalytics {
            overview: AnalyticsOverview {
                total_products: self.results.len() as u64,
                ..Default::default()
            },
            top_categories: self.labels(|p| p.category.as_deref()).counts,
            ..Default::default()
        })
    }

    fn categories(&self) -> Result<CatalogLabels, BackendError> {
        Ok(self.labels(|p| p.category.as_deref()))
    }

    fn brands(&self) -> Result<CatalogLabels, BackendError> {
        Ok(self.labels(|p| p.brand.as_deref()))
    }
}

impl FakeBackend {
    fn labels(&self, field: impl Fn(&Product) -> Option<&str>) -> CatalogLabels {
        let mut labels = CatalogLabels::default();
        for label in self.results.iter().filter_map(|p| field(p)) {
            *labels.counts.entry(label.to_string()).or_default() += 1;
        }
        labels.total = labels.counts.len() as u64;
        labels
    }
}

pub fn fake_service(backend: FakeBackend) -> (ShopService, Arc<BackendMemory>) {
    let (engine, storage) = memory_engine();
    (ShopService::new(Box::new(backend), engine), storage)
}
