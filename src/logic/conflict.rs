use std::collections::BTreeSet;

use crate::error::CatalogError;
use crate::model::{Id, ModelKey};
use crate::store::traits::{BrandStore, CategoryStore, ModelStore, Store};

/// Pre-insert existence checks. These close the common duplicate paths
/// early with a readable message; the racing window between the check and
/// the insert is covered by the store's own unique constraints, which the
/// catalog operations surface as the same conflict kind at commit time.

pub async fn ensure_brand_name_free<S: Store>(store: &S, name: &str) -> Result<(), CatalogError> {
    if store.brand_by_name(name).await?.is_some() {
        return Err(CatalogError::Conflict(format!("Brand '{name}' already exists")));
    }
    Ok(())
}

pub async fn ensure_category_name_free<S: Store>(store: &S, name: &str) -> Result<(), CatalogError> {
    if store.category_by_name(name).await?.is_some() {
        return Err(CatalogError::Conflict(format!(
            "Category '{name}' already exists"
        )));
    }
    Ok(())
}

/// A model counts as a duplicate only when both the composite key and the
/// full category set match an existing record. Same key with a different
/// category set passes the guard; the store's unique constraint on the key
/// then has the final word.
pub async fn ensure_model_free<S: Store>(
    store: &S,
    key: &ModelKey,
    categories: &BTreeSet<Id>,
) -> Result<(), CatalogError> {
    if let Some(existing) = store.model_by_key(key).await? {
        if existing.categories == *categories {
            return Err(CatalogError::Conflict("This model already exists".to_string()));
        }
    }
    Ok(())
}
