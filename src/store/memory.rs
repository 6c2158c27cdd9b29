use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use itertools::Itertools;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::logic::links::{self, CategoryRelink};
use crate::logic::paging::PageRequest;
use crate::logic::sort::{
    BrandField, CarField, CategoryField, ModelField, SortClause, SortDirection,
};
use crate::model::{
    Brand, Car, Category, Id, Model, ModelKey, NewBrand, NewCar, NewCategory, NewModel,
};
use crate::store::traits::{BrandStore, CarStore, CategoryStore, ModelStore, Store};

const BRAND_NAME_UNIQUE: &str = "brands.name";
const CATEGORY_NAME_UNIQUE: &str = "categories.name";
const MODEL_IDENTITY_UNIQUE: &str = "models.name_production_year_brand";
const CAR_NUMBER_UNIQUE: &str = "cars.number";

/// Embedded storage backend holding the whole catalog behind one lock.
/// Every trait method takes the lock exactly once, which makes each
/// operation a single atomic unit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<CatalogState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    next_id: Id,
    brands: HashMap<Id, Brand>,
    categories: HashMap<Id, Category>,
    models: HashMap<Id, ModelRow>,
    cars: HashMap<Id, CarRow>,
}

/// Normalized model row; the owning brand is referenced by id.
#[derive(Debug, Clone)]
struct ModelRow {
    id: Id,
    name: String,
    brand_id: Id,
    production_year: i32,
    categories: BTreeSet<Id>,
}

#[derive(Debug, Clone)]
struct CarRow {
    id: Id,
    number: String,
    model_id: Id,
}

impl CatalogState {
    fn allocate_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn brand_named(&self, name: &str) -> Option<&Brand> {
        self.brands.values().find(|brand| brand.name == name)
    }

    fn category_named(&self, name: &str) -> Option<&Category> {
        self.categories.values().find(|category| category.name == name)
    }

    fn model_row_by_key(&self, key: &ModelKey) -> Option<&ModelRow> {
        self.models.values().find(|row| {
            row.name == key.name
                && row.production_year == key.production_year
                && self
                    .brands
                    .get(&row.brand_id)
                    .is_some_and(|brand| brand.name == key.brand)
        })
    }

    fn model_record(&self, row: &ModelRow) -> StoreResult<Model> {
        let brand = self.brands.get(&row.brand_id).ok_or_else(|| {
            StoreError::Backend(anyhow!(
                "model {} references missing brand {}",
                row.id,
                row.brand_id
            ))
        })?;
        Ok(Model {
            id: row.id,
            name: row.name.clone(),
            brand: brand.clone(),
            production_year: row.production_year,
            categories: row.categories.clone(),
        })
    }

    fn car_record(&self, row: &CarRow) -> StoreResult<Car> {
        let model_row = self.models.get(&row.model_id).ok_or_else(|| {
            StoreError::Backend(anyhow!(
                "car {} references missing model {}",
                row.id,
                row.model_id
            ))
        })?;
        Ok(Car {
            id: row.id,
            number: row.number.clone(),
            model: self.model_record(model_row)?,
        })
    }

    /// Removes a model together with its category back-references and cars.
    fn drop_model(&mut self, id: Id) {
        if let Some(row) = self.models.remove(&id) {
            for category_id in &row.categories {
                if let Some(category) = self.categories.get_mut(category_id) {
                    category.models.remove(&id);
                }
            }
            self.cars.retain(|_, car| car.model_id != id);
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn window<T>(items: impl Iterator<Item = T>, page: PageRequest) -> Vec<T> {
    match page.offset() {
        Some(offset) => items.skip(offset as usize).take(page.size).collect(),
        None => Vec::new(),
    }
}

#[async_trait::async_trait]
impl BrandStore for MemoryStore {
    async fn brand_by_name(&self, name: &str) -> StoreResult<Option<Brand>> {
        Ok(self.state.read().brand_named(name).cloned())
    }

    async fn brand_by_id(&self, id: Id) -> StoreResult<Option<Brand>> {
        Ok(self.state.read().brands.get(&id).cloned())
    }

    async fn list_brands(
        &self,
        sort: SortClause<BrandField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Brand>> {
        let state = self.state.read();
        let ordered = state
            .brands
            .values()
            .cloned()
            .sorted_by(|a, b| directed(a.name.cmp(&b.name), sort.direction));
        Ok(window(ordered, page))
    }

    async fn insert_brand(&self, brand: NewBrand) -> StoreResult<Brand> {
        let mut state = self.state.write();
        if state.brand_named(&brand.name).is_some() {
            return Err(StoreError::UniqueViolation(BRAND_NAME_UNIQUE));
        }
        let id = state.allocate_id();
        let record = Brand {
            id,
            name: brand.name,
        };
        state.brands.insert(id, record.clone());
        Ok(record)
    }

    async fn update_brand(&self, brand: Brand) -> StoreResult<()> {
        let mut state = self.state.write();
        if state
            .brands
            .values()
            .any(|other| other.id != brand.id && other.name == brand.name)
        {
            return Err(StoreError::UniqueViolation(BRAND_NAME_UNIQUE));
        }
        match state.brands.get_mut(&brand.id) {
            Some(row) => {
                row.name = brand.name;
                Ok(())
            }
            None => Err(StoreError::Backend(anyhow!("brand {} is not persisted", brand.id))),
        }
    }

    async fn delete_brand(&self, name: &str) -> StoreResult<u64> {
        let mut state = self.state.write();
        let Some(id) = state.brand_named(name).map(|brand| brand.id) else {
            return Ok(0);
        };
        state.brands.remove(&id);
        let model_ids: Vec<Id> = state
            .models
            .values()
            .filter(|row| row.brand_id == id)
            .map(|row| row.id)
            .collect();
        for model_id in model_ids {
            state.drop_model(model_id);
        }
        Ok(1)
    }
}

#[async_trait::async_trait]
impl CategoryStore for MemoryStore {
    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self.state.read().category_named(name).cloned())
    }

    async fn category_by_id(&self, id: Id) -> StoreResult<Option<Category>> {
        Ok(self.state.read().categories.get(&id).cloned())
    }

    async fn list_categories(
        &self,
        sort: SortClause<CategoryField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Category>> {
        let state = self.state.read();
        let ordered = state
            .categories
            .values()
            .cloned()
            .sorted_by(|a, b| directed(a.name.cmp(&b.name), sort.direction));
        Ok(window(ordered, page))
    }

    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.state.write();
        if state.category_named(&category.name).is_some() {
            return Err(StoreError::UniqueViolation(CATEGORY_NAME_UNIQUE));
        }
        let id = state.allocate_id();
        let record = Category {
            id,
            name: category.name,
            models: BTreeSet::new(),
        };
        state.categories.insert(id, record.clone());
        Ok(record)
    }

    async fn update_category(&self, category: Category) -> StoreResult<()> {
        let mut state = self.state.write();
        if state
            .categories
            .values()
            .any(|other| other.id != category.id && other.name == category.name)
        {
            return Err(StoreError::UniqueViolation(CATEGORY_NAME_UNIQUE));
        }
        match state.categories.get_mut(&category.id) {
            Some(row) => {
                // Only the name is caller-writable; back-references stay owned
                // by the relationship bookkeeping.
                row.name = category.name;
                Ok(())
            }
            None => Err(StoreError::Backend(anyhow!(
                "category {} is not persisted",
                category.id
            ))),
        }
    }

    async fn delete_category(&self, name: &str) -> StoreResult<u64> {
        let mut state = self.state.write();
        let Some(id) = state.category_named(name).map(|category| category.id) else {
            return Ok(0);
        };
        state.categories.remove(&id);
        for row in state.models.values_mut() {
            row.categories.remove(&id);
        }
        Ok(1)
    }
}

#[async_trait::async_trait]
impl ModelStore for MemoryStore {
    async fn model_by_key(&self, key: &ModelKey) -> StoreResult<Option<Model>> {
        let state = self.state.read();
        state
            .model_row_by_key(key)
            .map(|row| state.model_record(row))
            .transpose()
    }

    async fn model_by_id(&self, id: Id) -> StoreResult<Option<Model>> {
        let state = self.state.read();
        state
            .models
            .get(&id)
            .map(|row| state.model_record(row))
            .transpose()
    }

    async fn list_models(
        &self,
        sort: SortClause<ModelField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Model>> {
        let state = self.state.read();
        let records = state
            .models
            .values()
            .map(|row| state.model_record(row))
            .collect::<StoreResult<Vec<_>>>()?;
        let ordered = records.into_iter().sorted_by(|a, b| {
            let ordering = match sort.field {
                ModelField::BrandName => a.brand.name.cmp(&b.brand.name),
                ModelField::Name => a.name.cmp(&b.name),
                ModelField::ProductionYear => a.production_year.cmp(&b.production_year),
            };
            directed(ordering, sort.direction)
        });
        Ok(window(ordered, page))
    }

    async fn insert_model(&self, model: NewModel) -> StoreResult<Model> {
        let mut state = self.state.write();
        let brand = state
            .brands
            .get(&model.brand_id)
            .cloned()
            .ok_or_else(|| StoreError::Backend(anyhow!("unknown brand id {}", model.brand_id)))?;
        if state.models.values().any(|row| {
            row.name == model.name
                && row.production_year == model.production_year
                && row.brand_id == model.brand_id
        }) {
            return Err(StoreError::UniqueViolation(MODEL_IDENTITY_UNIQUE));
        }
        let id = state.allocate_id();
        let mut model_categories = BTreeSet::new();
        let plan = CategoryRelink::for_create(&model.categories);
        links::apply_relink(id, &mut model_categories, &mut state.categories, &plan);
        let row = ModelRow {
            id,
            name: model.name,
            brand_id: model.brand_id,
            production_year: model.production_year,
            categories: model_categories,
        };
        let record = Model {
            id,
            name: row.name.clone(),
            brand,
            production_year: row.production_year,
            categories: row.categories.clone(),
        };
        state.models.insert(id, row);
        Ok(record)
    }

    async fn update_model(&self, model: Model, relink: CategoryRelink) -> StoreResult<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.models.contains_key(&model.id) {
            return Err(StoreError::Backend(anyhow!("model {} is not persisted", model.id)));
        }
        if state.models.values().any(|row| {
            row.id != model.id
                && row.name == model.name
                && row.production_year == model.production_year
                && row.brand_id == model.brand.id
        }) {
            return Err(StoreError::UniqueViolation(MODEL_IDENTITY_UNIQUE));
        }
        let row = match state.models.get_mut(&model.id) {
            Some(row) => row,
            None => return Err(StoreError::Backend(anyhow!("model {} is not persisted", model.id))),
        };
        row.name = model.name;
        row.brand_id = model.brand.id;
        row.production_year = model.production_year;
        links::apply_relink(model.id, &mut row.categories, &mut state.categories, &relink);
        Ok(())
    }

    async fn delete_model(&self, key: &ModelKey) -> StoreResult<u64> {
        let mut state = self.state.write();
        let Some(id) = state.model_row_by_key(key).map(|row| row.id) else {
            return Ok(0);
        };
        state.drop_model(id);
        Ok(1)
    }
}

#[async_trait::async_trait]
impl CarStore for MemoryStore {
    async fn car_by_number(&self, number: &str) -> StoreResult<Option<Car>> {
        let state = self.state.read();
        state
            .cars
            .values()
            .find(|row| row.number == number)
            .map(|row| state.car_record(row))
            .transpose()
    }

    async fn list_cars(
        &self,
        sort: SortClause<CarField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Car>> {
        let state = self.state.read();
        let records = state
            .cars
            .values()
            .map(|row| state.car_record(row))
            .collect::<StoreResult<Vec<_>>>()?;
        let ordered = records.into_iter().sorted_by(|a, b| {
            let ordering = match sort.field {
                CarField::BrandName => a.model.brand.name.cmp(&b.model.brand.name),
                CarField::Number => a.number.cmp(&b.number),
                CarField::ModelName => a.model.name.cmp(&b.model.name),
                CarField::ProductionYear => a.model.production_year.cmp(&b.model.production_year),
            };
            directed(ordering, sort.direction)
        });
        Ok(window(ordered, page))
    }

    async fn insert_car(&self, car: NewCar) -> StoreResult<Car> {
        let mut state = self.state.write();
        if !state.models.contains_key(&car.model_id) {
            return Err(StoreError::Backend(anyhow!("unknown model id {}", car.model_id)));
        }
        if state.cars.values().any(|row| row.number == car.number) {
            return Err(StoreError::UniqueViolation(CAR_NUMBER_UNIQUE));
        }
        let id = state.allocate_id();
        let row = CarRow {
            id,
            number: car.number,
            model_id: car.model_id,
        };
        let record = state.car_record(&row)?;
        state.cars.insert(id, row);
        Ok(record)
    }

    async fn update_car(&self, car: Car) -> StoreResult<()> {
        let mut state = self.state.write();
        if state
            .cars
            .values()
            .any(|row| row.id != car.id && row.number == car.number)
        {
            return Err(StoreError::UniqueViolation(CAR_NUMBER_UNIQUE));
        }
        match state.cars.get_mut(&car.id) {
            Some(row) => {
                row.number = car.number;
                Ok(())
            }
            None => Err(StoreError::Backend(anyhow!("car {} is not persisted", car.id))),
        }
    }

    async fn delete_car(&self, number: &str) -> StoreResult<u64> {
        let mut state = self.state.write();
        let Some(id) = state
            .cars
            .values()
            .find(|row| row.number == number)
            .map(|row| row.id)
        else {
            return Ok(0);
        };
        state.cars.remove(&id);
        Ok(1)
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::sort::SortCriteria;

    fn clause_for_brands() -> SortClause<BrandField> {
        SortCriteria::new("none", "ASC").for_brands()
    }

    #[tokio::test]
    async fn inserts_assign_fresh_ids_and_enforce_names() {
        let store = MemoryStore::new();
        let audi = store.insert_brand(NewBrand { name: "Audi".to_string() }).await.unwrap();
        let bmw = store.insert_brand(NewBrand { name: "BMW".to_string() }).await.unwrap();
        assert_ne!(audi.id, bmw.id);

        let err = store
            .insert_brand(NewBrand { name: "Audi".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn listing_is_ordered_and_windowed() {
        let store = MemoryStore::new();
        for name in ["Skoda", "Audi", "Volvo", "BMW", "Fiat"] {
            store
                .insert_brand(NewBrand { name: name.to_string() })
                .await
                .unwrap();
        }

        let first = store
            .list_brands(clause_for_brands(), PageRequest::of(0))
            .await
            .unwrap();
        let names: Vec<_> = first.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Audi", "BMW", "Fiat"]);

        let second = store
            .list_brands(clause_for_brands(), PageRequest::of(1))
            .await
            .unwrap();
        let names: Vec<_> = second.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Skoda", "Volvo"]);

        assert!(store
            .list_brands(clause_for_brands(), PageRequest::of(-3))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn deleting_a_brand_cascades_to_models_and_cars() {
        let store = MemoryStore::new();
        let brand = store.insert_brand(NewBrand { name: "Toyota".to_string() }).await.unwrap();
        let category = store
            .insert_category(NewCategory { name: "Sedan".to_string() })
            .await
            .unwrap();
        let model = store
            .insert_model(NewModel {
                name: "Corolla".to_string(),
                brand_id: brand.id,
                production_year: 2020,
                categories: [category.id].into_iter().collect(),
            })
            .await
            .unwrap();
        store
            .insert_car(NewCar {
                number: "AA1234".to_string(),
                model_id: model.id,
            })
            .await
            .unwrap();

        assert_eq!(store.delete_brand("Toyota").await.unwrap(), 1);
        assert!(store.car_by_number("AA1234").await.unwrap().is_none());
        let category = store.category_by_id(category.id).await.unwrap().unwrap();
        assert!(category.models.is_empty());

        // Absent key reports zero rows, not an error.
        assert_eq!(store.delete_brand("Toyota").await.unwrap(), 0);
    }
}
