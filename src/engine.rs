//! Personalized ranking, suggestions and whole-state export/import on top of
//! the preference, search context, wishlist and comparison stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    comparison::{ComparisonItem, ComparisonStore},
    errors::StoreResult,
    preferences::{BudgetTier, PreferenceStore, Preferences},
    product::{same_label, Product},
    search_context::{
        ContextualFilters, HistoryEntry, SearchContext, Suggestion, TermFrequency, UserContext,
    },
    storage::StorageManager,
    wishlist::{WishlistItem, WishlistStore},
};

const PRICE_MATCH_POINTS: u32 = 10;
const CATEGORY_MATCH_POINTS: u32 = 15;
const BRAND_MATCH_POINTS: u32 = 10;
const HISTORY_POINTS_PER_HIT: u32 = 2;
const HISTORY_POINTS_CAP: u32 = 20;
const WISHLIST_AFFINITY_POINTS: u32 = 5;

const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    pub personalized_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSuggestions {
    pub query_suggestions: Vec<Suggestion>,
    pub filter_suggestions: ContextualFilters,
    pub personalized_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub budget: BudgetTier,
    pub favorite_categories: Vec<String>,
    pub total_searches: usize,
    pub wishlist_size: usize,
    pub active_comparisons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub total_searches: usize,
    pub recent_searches: Vec<HistoryEntry>,
    pub top_search_terms: Vec<TermFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub suggested_searches: Vec<String>,
    pub preferred_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub profile: Profile,
    pub activity: Activity,
    pub recommendations: Recommendations,
}

/// Whole personalization state as exported to, and imported from, a file.
/// Sections absent from an import are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateBundle {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_history: Option<Vec<HistoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wishlist: Option<Vec<WishlistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Vec<ComparisonItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub message: String,
}

impl ImportReport {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub struct PersonalizationEngine {
    preferences: PreferenceStore,
    context: SearchContext,
    wishlist: WishlistStore,
    comparison: ComparisonStore,
}

impl PersonalizationEngine {
    pub fn load(storage: Arc<dyn StorageManager>) -> Self {
        Self {
            preferences: PreferenceStore::load(storage.clone()),
            context: SearchContext::load(storage.clone()),
            wishlist: WishlistStore::load(storage.clone()),
            comparison: ComparisonStore::load(storage),
        }
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut PreferenceStore {
        &mut self.preferences
    }

    pub fn search_context(&self) -> &SearchContext {
        &self.context
    }

    pub fn search_context_mut(&mut self) -> &mut SearchContext {
        &mut self.context
    }

    pub fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }

    pub fn wishlist_mut(&mut self) -> &mut WishlistStore {
        &mut self.wishlist
    }

    pub fn comparison(&self) -> &ComparisonStore {
        &self.comparison
    }

    pub fn comparison_mut(&mut self) -> &mut ComparisonStore {
        &mut self.comparison
    }

    /// Scores every product and sorts by score, highest first. Equal scores
    /// keep their input order.
    pub fn rank(&self, products: Vec<Product>) -> Vec<ScoredProduct> {
        let mut scored = products
            .into_iter()
            .map(|product| {
                let personalized_score = self.score(&product);
                ScoredProduct {
                    product,
                    personalized_score,
                }
            })
            .collect::<Vec<_>>();

        scored.sort_by(|a, b| b.personalized_score.cmp(&a.personalized_score));
        scored
    }

    pub fn score(&self, product: &Product) -> u32 {
        let prefs = self.preferences.get();
        let mut score = 0;

        if let Some(price) = product.price {
            if prefs.price_range.contains(price) {
                score += PRICE_MATCH_POINTS;
            }
        }

        let category = product.category.as_deref();
        let brand = product.brand.as_deref();

        if prefs.categories.iter().any(|c| same_label(category, c)) {
            score += CATEGORY_MATCH_POINTS;
        }

        if prefs.brands.iter().any(|b| same_label(brand, b)) {
            score += BRAND_MATCH_POINTS;
        }

        if let Some(category) = category {
            let hits = self.context.context().category_count(category);
            score += (hits * HISTORY_POINTS_PER_HIT).min(HISTORY_POINTS_CAP);
        }

        let affinity = self
            .wishlist
            .list()
            .iter()
            .filter(|item| {
                item.product
                    .category
                    .as_deref()
                    .map(|c| same_label(category, c))
                    .unwrap_or(false)
                    || item
                        .product
                        .brand
                        .as_deref()
                        .map(|b| same_label(brand, b))
                        .unwrap_or(false)
            })
            .count() as u32;
        score += affinity * WISHLIST_AFFINITY_POINTS;

        score
    }

    pub fn smart_suggestions(&self, partial: &str) -> SmartSuggestions {
        SmartSuggestions {
            query_suggestions: self.context.suggest(partial),
            filter_suggestions: self.context.contextual_filters(),
            personalized_categories: self.preferences.get().categories.clone(),
        }
    }

    pub fn insights(&self) -> Insights {
        let context = self.context.context();
        let total_searches = self.context.total_searches();

        let mut preferred = self.preferences.get().categories.clone();
        preferred.sort_by(|a, b| context.category_count(b).cmp(&context.category_count(a)));
        preferred.truncate(3);

        Insights {
            profile: Profile {
                budget: self.preferences.get().budget,
                favorite_categories: context.top_categories(3),
                total_searches,
                wishlist_size: self.wishlist.len(),
                active_comparisons: self.comparison.count(),
            },
            activity: Activity {
                total_searches,
                recent_searches: self.context.history().iter().take(5).cloned().collect(),
                top_search_terms: context.top_terms(5),
            },
            recommendations: Recommendations {
                suggested_searches: self
                    .context
                    .suggest("")
                    .into_iter()
                    .take(3)
                    .map(|s| s.text)
                    .collect(),
                preferred_categories: preferred,
            },
        }
    }

    pub fn export_all(&self) -> StateBundle {
        StateBundle {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            preferences: Some(self.preferences.get().clone()),
            search_history: Some(self.context.history().to_vec()),
            wishlist: Some(self.wishlist.list().to_vec()),
            comparison: Some(self.comparison.list().to_vec()),
            user_context: Some(self.context.context().clone()),
        }
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export_all())
    }

    /// Applies an exported bundle. Nothing changes unless the whole blob
    /// parses and every section is stored.
    pub fn import_all(&mut self, blob: &str) -> ImportReport {
        let bundle = match serde_json::from_str::<StateBundle>(blob) {
            Ok(bundle) => bundle,
            Err(err) => {
                log::warn!("rejected import: {err}");
                return ImportReport::failed(format!("Invalid import data: {err}"));
            }
        };

        if bundle.version > EXPORT_VERSION {
            return ImportReport::failed(format!(
                "Unsupported export version {} (newest supported is {EXPORT_VERSION})",
                bundle.version
            ));
        }

        match self.apply_bundle(bundle) {
            Ok(()) => ImportReport {
                success: true,
                message: "Data imported successfully".into(),
            },
            Err(err) => {
                log::error!("import failed: {err}");
                ImportReport::failed(format!("Failed to store imported data: {err}"))
            }
        }
    }

    fn apply_bundle(&mut self, bundle: StateBundle) -> StoreResult<()> {
        let snapshot = self.export_all();

        let result = self.apply_sections(bundle);
        if result.is_err() {
            self.restore_sections(snapshot);
        }
        result
    }

    fn apply_sections(&mut self, bundle: StateBundle) -> StoreResult<()> {
        if let Some(prefs) = bundle.preferences {
            self.preferences.replace(prefs)?;
        }

        if bundle.search_history.is_some() || bundle.user_context.is_some() {
            let history = bundle
                .search_history
                .unwrap_or_else(|| self.context.history().to_vec());
            let context = bundle
                .user_context
                .unwrap_or_else(|| self.context.context().clone());
            self.context.replace(history, context)?;
        }

        if let Some(items) = bundle.wishlist {
            self.wishlist.replace(items)?;
        }

        if let Some(items) = bundle.comparison {
            self.comparison.replace(items)?;
        }

        Ok(())
    }

    fn restore_sections(&mut self, snapshot: StateBundle) {
        let restored = [
            self.preferences
                .replace(snapshot.preferences.unwrap_or_default()),
            self.context.replace(
                snapshot.search_history.unwrap_or_default(),
                snapshot.user_context.unwrap_or_default(),
            ),
            self.wishlist.replace(snapshot.wishlist.unwrap_or_default()),
            self.comparison
                .replace(snapshot.comparison.unwrap_or_default()),
        ];

        for err in restored.into_iter().filter_map(Result::err) {
            log::error!("failed to restore state after import error: {err}");
        }
    }

    /// Clears every store, even when an earlier one fails. Each store only
    /// drops its in-memory state once its own records are gone, so a partial
    /// failure leaves memory matching storage. Returns the first error.
    pub fn clear_all(&mut self) -> StoreResult<()> {
        let cleared = [
            self.preferences.reset(),
            self.context.clear(),
            self.wishlist.clear(),
            self.comparison.clear(),
        ];
        cleared.into_iter().collect::<StoreResult<Vec<()>>>()?;

        log::info!("cleared all personalization data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        preferences::{PreferencesUpdate, SearchFilters},
        product::ProductId,
        storage::BackendMemory,
    };

    fn engine() -> (PersonalizationEngine, Arc<BackendMemory>) {
        let backend = Arc::new(BackendMemory::new());
        (PersonalizationEngine::load(backend.clone()), backend)
    }

    fn product(id: u64, category: &str, brand: Option<&str>, price: f64) -> Product {
        Product {
            id: ProductId::from(id),
            title: format!("Item {id}"),
            price: Some(price),
            category: Some(category.into()),
            brand: brand.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn preferred_category_and_wishlist_affinity_win() {
        let (mut engine, _) = engine();
        engine
            .preferences_mut()
            .update(PreferencesUpdate {
                categories: Some(vec!["Office".into()]),
                ..Default::default()
            })
            .unwrap();
        engine
            .wishlist_mut()
            .add(&product(99, "Office", None, 300.0))
            .unwrap();

        let ranked = engine.rank(vec![
            product(2, "Bedroom", None, 100.0),
            product(1, "Office", None, 100.0),
        ]);

        assert_eq!(ranked[0].product.id, ProductId::from(1));
        assert_eq!(ranked[0].personalized_score, 10 + 15 + 5);
        assert_eq!(ranked[1].personalized_score, 10);
    }

    #[test]
    fn history_contribution_is_capped() {
        let (mut engine, _) = engine();
        let filters = SearchFilters {
            categories: vec!["Living".into()],
            ..Default::default()
        };
        for _ in 0..15 {
            engine
                .search_context_mut()
                .record_search("sofa", &[], &filters)
                .unwrap();
        }

        // outside the price range so only history counts
        let score = engine.score(&product(1, "Living", None, 9000.0));
        assert_eq!(score, HISTORY_POINTS_CAP);
    }

    #[test]
    fn brand_and_price_points() {
        let (mut engine, _) = engine();
        engine
            .preferences_mut()
            .update(PreferencesUpdate {
                brands: Some(vec!["acme".into()]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(engine.score(&product(1, "Patio", Some("ACME"), 50.0)), 20);
        assert_eq!(engine.score(&product(2, "Patio", Some("Other"), 5000.0)), 10);
        assert_eq!(
            engine.score(&Product {
                id: ProductId::from(3),
                title: "unpriced".into(),
                ..Default::default()
            }),
            0
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let (engine, _) = engine();
        let ranked = engine.rank(vec![
            product(3, "A", None, 10.0),
            product(1, "B", None, 10.0),
            product(2, "C", None, 10.0),
        ]);
        let ids = ranked
            .iter()
            .map(|p| p.product.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn insights_summarize_state() {
        let (mut engine, _) = engine();
        engine
            .preferences_mut()
            .update(PreferencesUpdate {
                categories: Some(vec!["Patio".into(), "Office".into()]),
                budget: Some(BudgetTier::Low),
                ..Default::default()
            })
            .unwrap();

        let office = SearchFilters {
            categories: vec!["Office".into()],
            ..Default::default()
        };
        engine
            .search_context_mut()
            .record_search("standing desk", &[], &office)
            .unwrap();
        engine
            .search_context_mut()
            .record_search("desk lamp", &[], &office)
            .unwrap();
        engine.comparison_mut().add(&product(1, "Office", None, 10.0));

        let insights = engine.insights();
        assert_eq!(insights.profile.budget, BudgetTier::Low);
        assert_eq!(insights.profile.favorite_categories, vec!["Office"]);
        assert_eq!(insights.profile.total_searches, 2);
        assert_eq!(insights.profile.active_comparisons, 1);
        assert_eq!(insights.activity.recent_searches[0].query, "desk lamp");
        assert_eq!(
            insights.activity.top_search_terms[0],
            TermFrequency { term: "desk".into(), count: 2 }
        );
        assert_eq!(
            insights.recommendations.suggested_searches,
            vec!["desk lamp", "standing desk", "standing"]
        );
        assert_eq!(
            insights.recommendations.preferred_categories,
            vec!["Office", "Patio"]
        );
    }

    #[test]
    fn malformed_import_changes_nothing() {
        let (mut engine, _) = engine();
        engine
            .wishlist_mut()
            .add(&product(1, "Office", None, 10.0))
            .unwrap();

        let report = engine.import_all(r#"{"wishlist": "#);
        assert!(!report.success);
        assert!(report.message.starts_with("Invalid import data"));

        let report = engine.import_all(
            r#"{"exported_at": "2024-01-01T00:00:00Z", "preferences": {}, "wishlist": 12}"#,
        );
        assert!(!report.success);
        assert_eq!(engine.wishlist().len(), 1);
        assert_eq!(engine.preferences().get(), &Preferences::default());
    }

    #[test]
    fn failed_import_write_rolls_back() {
        let (mut engine, backend) = engine();
        engine
            .wishlist_mut()
            .add(&product(1, "Office", None, 10.0))
            .unwrap();
        let blob = engine.export_json().unwrap();
        engine.wishlist_mut().remove(&ProductId::from(1)).unwrap();

        backend.reject_writes(true);
        let report = engine.import_all(&blob);
        assert!(!report.success);
        assert!(engine.wishlist().is_empty());
    }
}
