use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::StoreResult,
    product::{Product, ProductId},
    storage::{self, StorageManager, WISHLIST_KEY},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product: Product,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

pub struct WishlistStore {
    items: Vec<WishlistItem>,
    storage: Arc<dyn StorageManager>,
}

impl WishlistStore {
    pub fn load(storage: Arc<dyn StorageManager>) -> Self {
        let items = storage::load_or_default(storage.as_ref(), WISHLIST_KEY);
        Self {
            items: dedupe(items),
            storage,
        }
    }

    /// Returns `false` when the product is already saved.
    pub fn add(&mut self, product: &Product) -> StoreResult<bool> {
        if self.contains(&product.id) {
            return Ok(false);
        }

        let mut items = self.items.clone();
        items.push(WishlistItem {
            product: product.clone(),
            added_at: Utc::now(),
            notes: String::new(),
        });

        self.commit(items)?;
        log::info!("added {} to wishlist", product.id);
        Ok(true)
    }

    pub fn remove(&mut self, id: &ProductId) -> StoreResult<bool> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };

        let mut items = self.items.clone();
        items.remove(idx);
        self.commit(items)?;
        Ok(true)
    }

    pub fn set_note(&mut self, id: &ProductId, notes: &str) -> StoreResult<bool> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };

        let mut items = self.items.clone();
        items[idx].notes = notes.to_string();
        self.commit(items)?;
        Ok(true)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn list(&self) -> &[WishlistItem] {
        &self.items
    }

    /// Newest first; items saved in the same instant keep the later insertion first.
    pub fn recent(&self, n: usize) -> Vec<WishlistItem> {
        let mut items = self.items.iter().rev().cloned().collect::<Vec<_>>();
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        items.truncate(n);
        items
    }

    pub fn by_category(&self, category: &str) -> Vec<WishlistItem> {
        let needle = category.to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                item.product
                    .category
                    .as_ref()
                    .map(|c| c.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) -> StoreResult<()> {
        storage::remove_key(self.storage.as_ref(), WISHLIST_KEY)?;
        self.items.clear();
        Ok(())
    }

    pub(crate) fn replace(&mut self, items: Vec<WishlistItem>) -> StoreResult<()> {
        self.commit(dedupe(items))
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| item.product.id == *id)
    }

    fn commit(&mut self, items: Vec<WishlistItem>) -> StoreResult<()> {
        storage::write_json(self.storage.as_ref(), WISHLIST_KEY, &items)?;
        self.items = items;
        Ok(())
    }
}

/// Keeps the first entry per product id.
fn dedupe(mut items: Vec<WishlistItem>) -> Vec<WishlistItem> {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.product.id.clone()));
    items
}
