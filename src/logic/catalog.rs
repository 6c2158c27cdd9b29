use std::collections::BTreeSet;

use crate::error::{CatalogError, StoreError};
use crate::logic::conflict;
use crate::logic::links::CategoryRelink;
use crate::logic::paging::PageRequest;
use crate::logic::sort::SortCriteria;
use crate::logic::validate;
use crate::model::{
    Brand, Car, Category, Id, Model, ModelKey, NewBrand, NewCar, NewCategory, NewModel,
};
use crate::store::traits::{BrandStore, CarStore, CategoryStore, ModelStore, Store};

/// Field bundle for creating or replacing a model; references are by name
/// and get resolved against the store before anything is written.
#[derive(Debug, Clone)]
pub struct ModelInput {
    pub brand: String,
    pub name: String,
    pub production_year: i32,
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct CarInput {
    pub number: String,
    pub brand: String,
    pub model: String,
    pub production_year: i32,
}

pub struct BrandOps;
pub struct CategoryOps;
pub struct ModelOps;
pub struct CarOps;

/// Keeps a unique-constraint loss distinct from other store failures: the
/// loser of a create/create race observes the same conflict kind as a
/// guard hit, with the operation's own message.
fn duplicate_on_unique(err: StoreError, message: String) -> CatalogError {
    match err {
        StoreError::UniqueViolation(_) => CatalogError::Conflict(message),
        other => other.into(),
    }
}

impl BrandOps {
    pub async fn list<S: Store>(
        store: &S,
        page: i64,
        criteria: &SortCriteria,
    ) -> Result<Vec<Brand>, CatalogError> {
        let clause = criteria.for_brands();
        let brands = store.list_brands(clause, PageRequest::of(page)).await?;
        if brands.is_empty() {
            return Err(CatalogError::NotFound("Brands not found".to_string()));
        }
        Ok(brands)
    }

    pub async fn get<S: Store>(store: &S, name: &str) -> Result<Brand, CatalogError> {
        store
            .brand_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Brand '{name}' not found")))
    }

    pub async fn create<S: Store>(store: &S, name: &str) -> Result<Brand, CatalogError> {
        validate::validate_brand_name(name)?;
        conflict::ensure_brand_name_free(store, name).await?;
        store
            .insert_brand(NewBrand {
                name: name.to_string(),
            })
            .await
            .map_err(|err| duplicate_on_unique(err, format!("Brand '{name}' already exists")))
    }

    pub async fn rename<S: Store>(
        store: &S,
        name: &str,
        new_name: &str,
    ) -> Result<Brand, CatalogError> {
        validate::validate_brand_name(new_name)?;
        let mut brand = Self::get(store, name).await?;
        conflict::ensure_brand_name_free(store, new_name).await?;
        brand.name = new_name.to_string();
        store
            .update_brand(brand.clone())
            .await
            .map_err(|err| duplicate_on_unique(err, format!("Brand '{new_name}' already exists")))?;
        Ok(brand)
    }

    pub async fn delete<S: Store>(store: &S, name: &str) -> Result<u64, CatalogError> {
        Ok(store.delete_brand(name).await?)
    }
}

impl CategoryOps {
    pub async fn list<S: Store>(
        store: &S,
        page: i64,
        criteria: &SortCriteria,
    ) -> Result<Vec<Category>, CatalogError> {
        let clause = criteria.for_categories();
        let categories = store.list_categories(clause, PageRequest::of(page)).await?;
        if categories.is_empty() {
            return Err(CatalogError::NotFound("Categories not found".to_string()));
        }
        Ok(categories)
    }

    pub async fn get<S: Store>(store: &S, name: &str) -> Result<Category, CatalogError> {
        store
            .category_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Category '{name}' not found")))
    }

    pub async fn create<S: Store>(store: &S, name: &str) -> Result<Category, CatalogError> {
        validate::validate_category_name(name)?;
        conflict::ensure_category_name_free(store, name).await?;
        store
            .insert_category(NewCategory {
                name: name.to_string(),
            })
            .await
            .map_err(|err| duplicate_on_unique(err, format!("Category '{name}' already exists")))
    }

    pub async fn rename<S: Store>(
        store: &S,
        name: &str,
        new_name: &str,
    ) -> Result<Category, CatalogError> {
        validate::validate_category_name(new_name)?;
        let mut category = Self::get(store, name).await?;
        conflict::ensure_category_name_free(store, new_name).await?;
        category.name = new_name.to_string();
        store
            .update_category(category.clone())
            .await
            .map_err(|err| {
                duplicate_on_unique(err, format!("Category '{new_name}' already exists"))
            })?;
        Ok(category)
    }

    pub async fn delete<S: Store>(store: &S, name: &str) -> Result<u64, CatalogError> {
        Ok(store.delete_category(name).await?)
    }
}

impl ModelOps {
    pub async fn list<S: Store>(
        store: &S,
        page: i64,
        criteria: &SortCriteria,
    ) -> Result<Vec<Model>, CatalogError> {
        // Sort resolution fails before anything is fetched.
        let clause = criteria.for_models()?;
        let models = store.list_models(clause, PageRequest::of(page)).await?;
        if models.is_empty() {
            return Err(CatalogError::NotFound("Models not found".to_string()));
        }
        Ok(models)
    }

    pub async fn get<S: Store>(store: &S, key: &ModelKey) -> Result<Model, CatalogError> {
        store
            .model_by_key(key)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Model not found".to_string()))
    }

    pub async fn create<S: Store>(store: &S, input: ModelInput) -> Result<Model, CatalogError> {
        validate::validate_model_fields(&input.brand, &input.name, input.production_year)?;
        let brand = store
            .brand_by_name(&input.brand)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Brand '{}' not found", input.brand)))?;
        let categories = resolve_categories(store, &input.categories).await?;
        let key = ModelKey {
            brand: input.brand.clone(),
            name: input.name.clone(),
            production_year: input.production_year,
        };
        conflict::ensure_model_free(store, &key, &categories).await?;
        store
            .insert_model(NewModel {
                name: input.name,
                brand_id: brand.id,
                production_year: input.production_year,
                categories,
            })
            .await
            .map_err(|err| duplicate_on_unique(err, "This model already exists".to_string()))
    }

    /// Replaces every field of the model at `key` with the proposed input.
    /// All referenced entities are resolved before any mutation, so a
    /// missing category leaves the persisted state untouched.
    pub async fn update<S: Store>(
        store: &S,
        key: &ModelKey,
        input: ModelInput,
    ) -> Result<Model, CatalogError> {
        validate::validate_model_fields(&input.brand, &input.name, input.production_year)?;
        let brand = store
            .brand_by_name(&input.brand)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Brand '{}' not found", input.brand)))?;
        let categories = resolve_categories(store, &input.categories).await?;
        let proposed_key = ModelKey {
            brand: input.brand.clone(),
            name: input.name.clone(),
            production_year: input.production_year,
        };
        conflict::ensure_model_free(store, &proposed_key, &categories).await?;
        let existing = Self::get(store, key).await?;
        let relink = CategoryRelink::for_update(&existing.categories, &categories);
        let updated = Model {
            id: existing.id,
            name: input.name,
            brand,
            production_year: input.production_year,
            categories,
        };
        store
            .update_model(updated.clone(), relink)
            .await
            .map_err(|err| duplicate_on_unique(err, "This model already exists".to_string()))?;
        Ok(updated)
    }

    pub async fn delete<S: Store>(store: &S, key: &ModelKey) -> Result<u64, CatalogError> {
        Ok(store.delete_model(key).await?)
    }
}

impl CarOps {
    pub async fn list<S: Store>(
        store: &S,
        page: i64,
        criteria: &SortCriteria,
    ) -> Result<Vec<Car>, CatalogError> {
        let clause = criteria.for_cars()?;
        let cars = store.list_cars(clause, PageRequest::of(page)).await?;
        if cars.is_empty() {
            return Err(CatalogError::NotFound("Cars not found".to_string()));
        }
        Ok(cars)
    }

    pub async fn get<S: Store>(store: &S, number: &str) -> Result<Car, CatalogError> {
        store
            .car_by_number(number)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Car with number '{number}' not found")))
    }

    /// Car numbers have no pre-insert guard; the store's unique constraint
    /// is authoritative and its violation surfaces as a conflict here.
    pub async fn create<S: Store>(store: &S, input: CarInput) -> Result<Car, CatalogError> {
        validate::validate_car_fields(&input.number, &input.brand, &input.model, input.production_year)?;
        let key = ModelKey {
            brand: input.brand,
            name: input.model,
            production_year: input.production_year,
        };
        let model = store
            .model_by_key(&key)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Model not found".to_string()))?;
        store
            .insert_car(NewCar {
                number: input.number.clone(),
                model_id: model.id,
            })
            .await
            .map_err(|err| {
                duplicate_on_unique(
                    err,
                    format!("Car with number '{}' already exists", input.number),
                )
            })
    }

    pub async fn renumber<S: Store>(
        store: &S,
        number: &str,
        new_number: &str,
    ) -> Result<Car, CatalogError> {
        validate::validate_car_number(new_number)?;
        let mut car = Self::get(store, number).await?;
        car.number = new_number.to_string();
        store
            .update_car(car.clone())
            .await
            .map_err(|err| {
                duplicate_on_unique(err, format!("Car with number '{new_number}' already exists"))
            })?;
        Ok(car)
    }

    pub async fn delete<S: Store>(store: &S, number: &str) -> Result<u64, CatalogError> {
        Ok(store.delete_car(number).await?)
    }
}

async fn resolve_categories<S: Store>(
    store: &S,
    names: &BTreeSet<String>,
) -> Result<BTreeSet<Id>, CatalogError> {
    let mut ids = BTreeSet::new();
    for name in names {
        let category = store
            .category_by_name(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Category '{name}' not found")))?;
        ids.insert(category.id);
    }
    Ok(ids)
}
