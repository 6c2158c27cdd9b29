use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::logic::catalog::{CarInput, ModelInput};
use crate::model::{Brand, Car, Category, Id, Model};
use crate::store::traits::{CategoryStore, Store};

/// Wire shapes, camelCase like the public API. All request fields default
/// on deserialization so missing input reaches field validation instead of
/// dying in the JSON layer.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandDto {
    pub brand_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryDto {
    pub category_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelDto {
    pub brand_name: String,
    pub model_name: String,
    pub production_year: i32,
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarDto {
    pub number: String,
    pub brand_name: String,
    pub model_name: String,
    pub production_year: i32,
    pub categories: BTreeSet<String>,
}

impl BrandDto {
    pub fn from_record(brand: &Brand) -> Self {
        Self {
            brand_name: brand.name.clone(),
        }
    }
}

impl CategoryDto {
    pub fn from_record(category: &Category) -> Self {
        Self {
            category_name: category.name.clone(),
        }
    }
}

impl ModelDto {
    pub fn into_input(self) -> ModelInput {
        ModelInput {
            brand: self.brand_name,
            name: self.model_name,
            production_year: self.production_year,
            categories: self.categories,
        }
    }
}

impl CarDto {
    pub fn into_input(self) -> CarInput {
        CarInput {
            number: self.number,
            brand: self.brand_name,
            model: self.model_name,
            production_year: self.production_year,
        }
    }
}

/// Conversions that have to resolve referenced names take the store as an
/// explicit parameter instead of reaching for shared service state.

pub async fn model_to_dto<S: Store>(store: &S, model: &Model) -> Result<ModelDto, CatalogError> {
    Ok(ModelDto {
        brand_name: model.brand.name.clone(),
        model_name: model.name.clone(),
        production_year: model.production_year,
        categories: category_names(store, &model.categories).await?,
    })
}

pub async fn car_to_dto<S: Store>(store: &S, car: &Car) -> Result<CarDto, CatalogError> {
    Ok(CarDto {
        number: car.number.clone(),
        brand_name: car.model.brand.name.clone(),
        model_name: car.model.name.clone(),
        production_year: car.model.production_year,
        categories: category_names(store, &car.model.categories).await?,
    })
}

async fn category_names<S: Store>(
    store: &S,
    ids: &BTreeSet<Id>,
) -> Result<BTreeSet<String>, CatalogError> {
    let mut names = BTreeSet::new();
    for id in ids {
        if let Some(category) = store.category_by_id(*id).await? {
            names.insert(category.name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_fields_are_camel_case_and_optional() {
        let dto: ModelDto = serde_json::from_str(
            r#"{"brandName": "Toyota", "modelName": "Corolla", "productionYear": 2020}"#,
        )
        .unwrap();
        assert_eq!(dto.brand_name, "Toyota");
        assert_eq!(dto.production_year, 2020);
        assert!(dto.categories.is_empty());

        // Entirely empty input still deserializes; validation rejects it later.
        let dto: CarDto = serde_json::from_str("{}").unwrap();
        assert_eq!(dto.number, "");
        assert_eq!(dto.production_year, 0);
    }

    #[test]
    fn responses_serialize_camel_case() {
        let json = serde_json::to_string(&BrandDto {
            brand_name: "Audi".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"brandName":"Audi"}"#);
    }
}
