use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    errors::StoreResult,
    storage::{self, StorageManager, PREFERENCES_KEY},
};

const DEFAULT_PRICE_MIN: f64 = 0.0;
const DEFAULT_PRICE_MAX: f64 = 5000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_PRICE_MIN,
            max: DEFAULT_PRICE_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

/// Stored shopping preferences. Fields missing from an older record are
/// filled from `Default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub price_range: PriceRange,
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    pub materials: Vec<String>,
    pub colors: Vec<String>,
    pub styles: Vec<String>,
    pub budget: BudgetTier,
    pub priorities: Vec<String>,
    pub notifications: bool,
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            price_range: PriceRange::default(),
            categories: vec![],
            brands: vec![],
            materials: vec![],
            colors: vec![],
            styles: vec![],
            budget: BudgetTier::default(),
            priorities: vec!["price".into(), "quality".into(), "style".into()],
            notifications: true,
            theme: Theme::default(),
        }
    }
}

/// Partial update; only present fields replace the stored ones.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priorities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.price_range.is_none()
            && self.categories.is_none()
            && self.brands.is_none()
            && self.materials.is_none()
            && self.colors.is_none()
            && self.styles.is_none()
            && self.budget.is_none()
            && self.priorities.is_none()
            && self.notifications.is_none()
            && self.theme.is_none()
    }

    fn apply(self, prefs: &mut Preferences) {
        if let Some(price_range) = self.price_range {
            prefs.price_range = price_range;
        }
        if let Some(categories) = self.categories {
            prefs.categories = categories;
        }
        if let Some(brands) = self.brands {
            prefs.brands = brands;
        }
        if let Some(materials) = self.materials {
            prefs.materials = materials;
        }
        if let Some(colors) = self.colors {
            prefs.colors = colors;
        }
        if let Some(styles) = self.styles {
            prefs.styles = styles;
        }
        if let Some(budget) = self.budget {
            prefs.budget = budget;
        }
        if let Some(priorities) = self.priorities {
            prefs.priorities = priorities;
        }
        if let Some(notifications) = self.notifications {
            prefs.notifications = notifications;
        }
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
    }
}

/// Filter shape accepted by the search backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

pub struct PreferenceStore {
    prefs: Preferences,
    storage: Arc<dyn StorageManager>,
}

impl PreferenceStore {
    pub fn load(storage: Arc<dyn StorageManager>) -> Self {
        let prefs = storage::load_or_default(storage.as_ref(), PREFERENCES_KEY);
        Self { prefs, storage }
    }

    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    pub fn update(&mut self, update: PreferencesUpdate) -> StoreResult<&Preferences> {
        let mut next = self.prefs.clone();
        update.apply(&mut next);

        storage::write_json(self.storage.as_ref(), PREFERENCES_KEY, &next)?;
        self.prefs = next;
        Ok(&self.prefs)
    }

    pub fn reset(&mut self) -> StoreResult<()> {
        storage::remove_key(self.storage.as_ref(), PREFERENCES_KEY)?;
        self.prefs = Preferences::default();
        Ok(())
    }

    pub fn to_search_filters(&self) -> SearchFilters {
        SearchFilters {
            price_min: Some(self.prefs.price_range.min),
            price_max: Some(self.prefs.price_range.max),
            categories: self.prefs.categories.clone(),
            brands: self.prefs.brands.clone(),
            materials: self.prefs.materials.clone(),
            colors: self.prefs.colors.clone(),
        }
    }

    pub(crate) fn replace(&mut self, prefs: Preferences) -> StoreResult<()> {
        storage::write_json(self.storage.as_ref(), PREFERENCES_KEY, &prefs)?;
        self.prefs = prefs;
        Ok(())
    }
}
