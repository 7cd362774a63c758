use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    errors::StoreResult,
    preferences::SearchFilters,
    product::{Product, ProductId},
    storage::{self, StorageManager, COMPARISON_KEY},
};

pub const MAX_COMPARISON_ITEMS: usize = 4;

const MATRIX_FEATURES: [&str; 7] = [
    "title", "price", "category", "brand", "material", "color", "rating",
];
const MISSING_VALUE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub product: Product,
    pub added_at: DateTime<Utc>,
}

/// Outcome shown to the user after an add attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub success: bool,
    pub message: String,
}

impl AddOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub feature: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    pub products: Vec<Product>,
    pub features: Vec<FeatureRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSearch {
    pub suggested_filters: SearchFilters,
    pub search_query: String,
}

pub struct ComparisonStore {
    items: Vec<ComparisonItem>,
    storage: Arc<dyn StorageManager>,
}

impl ComparisonStore {
    pub fn load(storage: Arc<dyn StorageManager>) -> Self {
        let items = storage::load_or_default(storage.as_ref(), COMPARISON_KEY);
        Self {
            items: normalize(items),
            storage,
        }
    }

    pub fn add(&mut self, product: &Product) -> AddOutcome {
        if self.contains(&product.id) {
            return AddOutcome::rejected("Product already in comparison");
        }

        if self.items.len() >= MAX_COMPARISON_ITEMS {
            return AddOutcome::rejected(format!(
                "Maximum {MAX_COMPARISON_ITEMS} items for comparison"
            ));
        }

        let mut items = self.items.clone();
        items.push(ComparisonItem {
            product: product.clone(),
            added_at: Utc::now(),
        });

        match self.commit(items) {
            Ok(()) => AddOutcome::ok("Added to comparison"),
            Err(err) => AddOutcome::rejected(format!("Failed to save comparison: {err}")),
        }
    }

    pub fn remove(&mut self, id: &ProductId) -> StoreResult<bool> {
        let Some(idx) = self.items.iter().position(|i| i.product.id == *id) else {
            return Ok(false);
        };

        let mut items = self.items.clone();
        items.remove(idx);
        self.commit(items)?;
        Ok(true)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.iter().any(|i| i.product.id == *id)
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn list(&self) -> &[ComparisonItem] {
        &self.items
    }

    pub fn matrix(&self) -> Option<ComparisonMatrix> {
        if self.items.len() < 2 {
            return None;
        }

        let products = self
            .items
            .iter()
            .map(|i| i.product.clone())
            .collect::<Vec<_>>();

        let features = MATRIX_FEATURES
            .iter()
            .map(|feature| FeatureRow {
                feature: feature.to_string(),
                values: products.iter().map(|p| feature_value(p, feature)).collect(),
            })
            .collect();

        Some(ComparisonMatrix { products, features })
    }

    pub fn suggest_similar(&self) -> Option<SimilarSearch> {
        if self.items.is_empty() {
            return None;
        }

        let categories = distinct(self.items.iter().map(|i| i.product.category.as_deref()));
        let brands = distinct(self.items.iter().map(|i| i.product.brand.as_deref()));
        let materials = distinct(self.items.iter().map(|i| i.product.material.as_deref()));

        let search_query = format!("{} furniture {}", categories.join(" or "), brands.join(" "))
            .trim()
            .to_string();

        Some(SimilarSearch {
            suggested_filters: SearchFilters {
                categories,
                brands,
                materials,
                ..Default::default()
            },
            search_query,
        })
    }

    pub fn clear(&mut self) -> StoreResult<()> {
        storage::remove_key(self.storage.as_ref(), COMPARISON_KEY)?;
        self.items.clear();
        Ok(())
    }

    pub(crate) fn replace(&mut self, items: Vec<ComparisonItem>) -> StoreResult<()> {
        self.commit(normalize(items))
    }

    fn commit(&mut self, items: Vec<ComparisonItem>) -> StoreResult<()> {
        storage::write_json(self.storage.as_ref(), COMPARISON_KEY, &items)?;
        self.items = items;
        Ok(())
    }
}

/// Enforces uniqueness and the size cap on data that did not come through `add`.
fn normalize(mut items: Vec<ComparisonItem>) -> Vec<ComparisonItem> {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.product.id.clone()));
    if items.len() > MAX_COMPARISON_ITEMS {
        log::warn!(
            "dropping {} comparison items over the limit",
            items.len() - MAX_COMPARISON_ITEMS
        );
        items.truncate(MAX_COMPARISON_ITEMS);
    }
    items
}

fn feature_value(product: &Product, feature: &str) -> Value {
    let value = match feature {
        "title" => Some(json!(product.title)).filter(|_| !product.title.is_empty()),
        "price" => product.price.map(|p| json!(p)),
        "category" => product.category.as_ref().map(|v| json!(v)),
        "brand" => product.brand.as_ref().map(|v| json!(v)),
        "material" => product.material.as_ref().map(|v| json!(v)),
        "color" => product.color.as_ref().map(|v| json!(v)),
        "rating" => product.rating.map(|r| json!(r)),
        _ => None,
    };
    value.unwrap_or_else(|| json!(MISSING_VALUE))
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut out: Vec<String> = vec![];
    for value in values.flatten() {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
