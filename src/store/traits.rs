use crate::error::StoreResult;
use crate::logic::links::CategoryRelink;
use crate::logic::paging::PageRequest;
use crate::logic::sort::{BrandField, CarField, CategoryField, ModelField, SortClause};
use crate::model::{
    Brand, Car, Category, Id, Model, ModelKey, NewBrand, NewCar, NewCategory, NewModel,
};

/// Storage contract per entity type: exact-match lookup by natural key,
/// ordered paginated listing, insert with uniqueness enforcement, in-place
/// update, and count-returning delete by natural key (0 on absence, never
/// an error). Composite writes are atomic per call.

#[async_trait::async_trait]
pub trait BrandStore: Send + Sync {
    async fn brand_by_name(&self, name: &str) -> StoreResult<Option<Brand>>;
    async fn brand_by_id(&self, id: Id) -> StoreResult<Option<Brand>>;
    async fn list_brands(&self, sort: SortClause<BrandField>, page: PageRequest) -> StoreResult<Vec<Brand>>;
    async fn insert_brand(&self, brand: NewBrand) -> StoreResult<Brand>;
    async fn update_brand(&self, brand: Brand) -> StoreResult<()>;
    /// Deleting a brand cascades to its models and their cars.
    async fn delete_brand(&self, name: &str) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait CategoryStore: Send + Sync {
    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;
    async fn category_by_id(&self, id: Id) -> StoreResult<Option<Category>>;
    async fn list_categories(&self, sort: SortClause<CategoryField>, page: PageRequest) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, category: Category) -> StoreResult<()>;
    /// Deleting a category unlinks it from every model; models survive.
    async fn delete_category(&self, name: &str) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait ModelStore: Send + Sync {
    async fn model_by_key(&self, key: &ModelKey) -> StoreResult<Option<Model>>;
    async fn model_by_id(&self, id: Id) -> StoreResult<Option<Model>>;
    async fn list_models(&self, sort: SortClause<ModelField>, page: PageRequest) -> StoreResult<Vec<Model>>;
    /// Inserts the model and attaches its category links as one atomic unit.
    async fn insert_model(&self, model: NewModel) -> StoreResult<Model>;
    /// Replaces the persisted fields of `model.id` in place and re-points
    /// its category links per `relink` (detach before attach), as one
    /// atomic unit.
    async fn update_model(&self, model: Model, relink: CategoryRelink) -> StoreResult<()>;
    /// Deleting a model cascades to its cars and removes every category
    /// back-reference.
    async fn delete_model(&self, key: &ModelKey) -> StoreResult<u64>;
}

#[async_trait::async_trait]
pub trait CarStore: Send + Sync {
    async fn car_by_number(&self, number: &str) -> StoreResult<Option<Car>>;
    async fn list_cars(&self, sort: SortClause<CarField>, page: PageRequest) -> StoreResult<Vec<Car>>;
    async fn insert_car(&self, car: NewCar) -> StoreResult<Car>;
    async fn update_car(&self, car: Car) -> StoreResult<()>;
    async fn delete_car(&self, number: &str) -> StoreResult<u64>;
}

pub trait Store: BrandStore + CategoryStore + ModelStore + CarStore + Send + Sync {}
