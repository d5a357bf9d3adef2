//! # Categories
//!
//! Vehicle categories. Read-only over HTTP; seeded from
//! `config/categories.toml` when the collection is empty.

use crate::error::{MarketError, MarketResult};
use crate::store::{find_as, find_one_as, to_document, Collection, Filter, SharedStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A listing category (e.g. "Sedan", "SUV")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Seed file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySeed {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl CategorySeed {
    /// Load seed from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[derive(Clone)]
pub struct CategoryCatalog {
    store: SharedStore,
}

impl CategoryCatalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> MarketResult<Vec<Category>> {
        find_as(self.store.as_ref(), Collection::Categories, &Filter::all()).await
    }

    pub async fn get(&self, id: &str) -> MarketResult<Category> {
        find_one_as(self.store.as_ref(), Collection::Categories, &Filter::by_id(id))
            .await?
            .ok_or_else(|| MarketError::not_found("Category", id))
    }

    /// Insert the seed categories if the collection is empty. Returns how many were inserted.
    pub async fn seed_if_empty(&self, seed: &CategorySeed) -> MarketResult<usize> {
        if self.store.count(Collection::Categories, &Filter::all()).await? > 0 {
            return Ok(0);
        }

        for category in &seed.categories {
            self.store
                .insert_one(Collection::Categories, to_document(category)?)
                .await?;
        }

        info!("Seeded {} categories", seed.categories.len());
        Ok(seed.categories.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    const SEED: &str = r#"
        [[categories]]
        id = "sedan"
        name = "Sedan"

        [[categories]]
        id = "suv"
        name = "SUV"
        image = "https://img.example/suv.png"
    "#;

    #[test]
    fn test_seed_from_toml() {
        let seed = CategorySeed::from_toml(SEED).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[1].image.as_deref(), Some("https://img.example/suv.png"));
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let catalog = CategoryCatalog::new(Arc::new(MemoryStore::new()));
        let seed = CategorySeed::from_toml(SEED).unwrap();

        assert_eq!(catalog.seed_if_empty(&seed).await.unwrap(), 2);
        assert_eq!(catalog.seed_if_empty(&seed).await.unwrap(), 0);
        assert_eq!(catalog.list().await.unwrap().len(), 2);

        assert_eq!(catalog.get("suv").await.unwrap().name, "SUV");
        assert_eq!(catalog.get("truck").await.unwrap_err().status_code(), 404);
    }
}
