use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::error::{StoreError, StoreResult};
use crate::logic::links::CategoryRelink;
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

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the catalog schema. Uniqueness and cascade rules live in the
    /// database so racing writers are resolved at commit time.
    pub async fn migrate(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS brands (
                brand_id BIGSERIAL PRIMARY KEY,
                name VARCHAR(32) NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                category_id BIGSERIAL PRIMARY KEY,
                name VARCHAR(32) NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS models (
                model_id BIGSERIAL PRIMARY KEY,
                name VARCHAR(32) NOT NULL,
                brand_ref BIGINT NOT NULL REFERENCES brands(brand_id) ON DELETE CASCADE,
                production_year INT NOT NULL,
                UNIQUE (name, production_year, brand_ref)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS category_model (
                category_ref BIGINT NOT NULL REFERENCES categories(category_id) ON DELETE CASCADE,
                model_ref BIGINT NOT NULL REFERENCES models(model_id) ON DELETE CASCADE,
                PRIMARY KEY (category_ref, model_ref)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS cars (
                car_id BIGSERIAL PRIMARY KEY,
                number VARCHAR(12) NOT NULL UNIQUE,
                model_ref BIGINT NOT NULL REFERENCES models(model_id) ON DELETE CASCADE
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run catalog schema migration")?;
        }
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

/// Keeps unique-constraint losses typed; everything else is opaque backend
/// failure.
fn map_unique(err: sqlx::Error, constraint: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::UniqueViolation(constraint)
        }
        _ => StoreError::Backend(anyhow::Error::new(err)),
    }
}

fn brand_from_row(row: &PgRow) -> Brand {
    Brand {
        id: row.get("brand_id"),
        name: row.get("name"),
    }
}

/// Category ids attached to each of the given models, one round trip.
async fn category_links(pool: &PgPool, model_ids: &[Id]) -> Result<HashMap<Id, BTreeSet<Id>>> {
    let mut links: HashMap<Id, BTreeSet<Id>> = HashMap::new();
    if model_ids.is_empty() {
        return Ok(links);
    }
    let rows = sqlx::query(
        "SELECT category_ref, model_ref FROM category_model WHERE model_ref = ANY($1)",
    )
    .bind(model_ids)
    .fetch_all(pool)
    .await
    .context("Failed to fetch category links")?;
    for row in rows {
        let category_id: Id = row.get("category_ref");
        let model_id: Id = row.get("model_ref");
        links.entry(model_id).or_default().insert(category_id);
    }
    Ok(links)
}

fn model_from_row(row: &PgRow, categories: BTreeSet<Id>) -> Model {
    Model {
        id: row.get("model_id"),
        name: row.get("model_name"),
        brand: Brand {
            id: row.get("brand_id"),
            name: row.get("brand_name"),
        },
        production_year: row.get("production_year"),
        categories,
    }
}

const MODEL_SELECT: &str = r#"
    SELECT m.model_id, m.name AS model_name, m.production_year,
           b.brand_id, b.name AS brand_name
    FROM models m
    JOIN brands b ON b.brand_id = m.brand_ref
"#;

const CAR_SELECT: &str = r#"
    SELECT c.car_id, c.number,
           m.model_id, m.name AS model_name, m.production_year,
           b.brand_id, b.name AS brand_name
    FROM cars c
    JOIN models m ON m.model_id = c.model_ref
    JOIN brands b ON b.brand_id = m.brand_ref
"#;

impl PostgresStore {
    async fn models_with_links(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Model>> {
        let ids: Vec<Id> = rows.iter().map(|row| row.get("model_id")).collect();
        let mut links = category_links(&self.pool, &ids).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let id: Id = row.get("model_id");
                model_from_row(row, links.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn cars_with_links(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Car>> {
        let ids: Vec<Id> = rows.iter().map(|row| row.get("model_id")).collect();
        let mut links = category_links(&self.pool, &ids).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let model_id: Id = row.get("model_id");
                Car {
                    id: row.get("car_id"),
                    number: row.get("number"),
                    model: model_from_row(row, links.remove(&model_id).unwrap_or_default()),
                }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl BrandStore for PostgresStore {
    async fn brand_by_name(&self, name: &str) -> StoreResult<Option<Brand>> {
        let row = sqlx::query("SELECT brand_id, name FROM brands WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch brand")?;
        Ok(row.as_ref().map(brand_from_row))
    }

    async fn brand_by_id(&self, id: Id) -> StoreResult<Option<Brand>> {
        let row = sqlx::query("SELECT brand_id, name FROM brands WHERE brand_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch brand")?;
        Ok(row.as_ref().map(brand_from_row))
    }

    async fn list_brands(
        &self,
        sort: SortClause<BrandField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Brand>> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };
        let query = format!(
            "SELECT brand_id, name FROM brands ORDER BY name {} OFFSET $1 LIMIT $2",
            direction_sql(sort.direction)
        );
        let rows = sqlx::query(&query)
            .bind(offset as i64)
            .bind(page.size as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list brands")?;
        Ok(rows.iter().map(brand_from_row).collect())
    }

    async fn insert_brand(&self, brand: NewBrand) -> StoreResult<Brand> {
        let row = sqlx::query("INSERT INTO brands (name) VALUES ($1) RETURNING brand_id, name")
            .bind(brand.name.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_unique(err, BRAND_NAME_UNIQUE))?;
        Ok(brand_from_row(&row))
    }

    async fn update_brand(&self, brand: Brand) -> StoreResult<()> {
        sqlx::query("UPDATE brands SET name = $1 WHERE brand_id = $2")
            .bind(brand.name.as_str())
            .bind(brand.id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_unique(err, BRAND_NAME_UNIQUE))?;
        Ok(())
    }

    async fn delete_brand(&self, name: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM brands WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to delete brand")?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl CategoryStore for PostgresStore {
    async fn category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT category_id, name FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch category")?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: Id = row.get("category_id");
        Ok(Some(Category {
            id,
            name: row.get("name"),
            models: self.category_model_ids(id).await?,
        }))
    }

    async fn category_by_id(&self, id: Id) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT category_id, name FROM categories WHERE category_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch category")?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Category {
            id,
            name: row.get("name"),
            models: self.category_model_ids(id).await?,
        }))
    }

    async fn list_categories(
        &self,
        sort: SortClause<CategoryField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Category>> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };
        let query = format!(
            "SELECT category_id, name FROM categories ORDER BY name {} OFFSET $1 LIMIT $2",
            direction_sql(sort.direction)
        );
        let rows = sqlx::query(&query)
            .bind(offset as i64)
            .bind(page.size as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;
        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Id = row.get("category_id");
            categories.push(Category {
                id,
                name: row.get("name"),
                models: self.category_model_ids(id).await?,
            });
        }
        Ok(categories)
    }

    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let row =
            sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING category_id, name")
                .bind(category.name.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|err| map_unique(err, CATEGORY_NAME_UNIQUE))?;
        Ok(Category {
            id: row.get("category_id"),
            name: row.get("name"),
            models: BTreeSet::new(),
        })
    }

    async fn update_category(&self, category: Category) -> StoreResult<()> {
        sqlx::query("UPDATE categories SET name = $1 WHERE category_id = $2")
            .bind(category.name.as_str())
            .bind(category.id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_unique(err, CATEGORY_NAME_UNIQUE))?;
        Ok(())
    }

    async fn delete_category(&self, name: &str) -> StoreResult<u64> {
        // Join rows go with the category; models survive.
        let result = sqlx::query("DELETE FROM categories WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected())
    }
}

impl PostgresStore {
    async fn category_model_ids(&self, category_id: Id) -> StoreResult<BTreeSet<Id>> {
        let rows = sqlx::query("SELECT model_ref FROM category_model WHERE category_ref = $1")
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch category back-references")?;
        Ok(rows.iter().map(|row| row.get("model_ref")).collect())
    }
}

#[async_trait::async_trait]
impl ModelStore for PostgresStore {
    async fn model_by_key(&self, key: &ModelKey) -> StoreResult<Option<Model>> {
        let query = format!(
            "{MODEL_SELECT} WHERE b.name = $1 AND m.name = $2 AND m.production_year = $3"
        );
        let row = sqlx::query(&query)
            .bind(key.brand.as_str())
            .bind(key.name.as_str())
            .bind(key.production_year)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch model")?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.models_with_links(vec![row]).await?.pop())
    }

    async fn model_by_id(&self, id: Id) -> StoreResult<Option<Model>> {
        let query = format!("{MODEL_SELECT} WHERE m.model_id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch model")?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.models_with_links(vec![row]).await?.pop())
    }

    async fn list_models(
        &self,
        sort: SortClause<ModelField>,
        page: PageRequest,
    ) -> StoreResult<Vec<Model>> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };
        let column = match sort.field {
            ModelField::BrandName => "b.name",
            ModelField::Name => "m.name",
            ModelField::ProductionYear => "m.production_year",
        };
        let query = format!(
            "{MODEL_SELECT} ORDER BY {column} {} OFFSET $1 LIMIT $2",
            direction_sql(sort.direction)
        );
        let rows = sqlx::query(&query)
            .bind(offset as i64)
            .bind(page.size as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list models")?;
        self.models_with_links(rows).await
    }

    async fn insert_model(&self, model: NewModel) -> StoreResult<Model> {
        let brand = self
            .brand_by_id(model.brand_id)
            .await?
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("unknown brand id {}", model.brand_id)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let row = sqlx::query(
            "INSERT INTO models (name, brand_ref, production_year) VALUES ($1, $2, $3) RETURNING model_id",
        )
        .bind(model.name.as_str())
        .bind(model.brand_id)
        .bind(model.production_year)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| map_unique(err, MODEL_IDENTITY_UNIQUE))?;
        let id: Id = row.get("model_id");

        for category_id in &model.categories {
            sqlx::query("INSERT INTO category_model (category_ref, model_ref) VALUES ($1, $2)")
                .bind(category_id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to attach category link")?;
        }
        tx.commit().await.context("Failed to commit model insert")?;

        Ok(Model {
            id,
            name: model.name,
            brand,
            production_year: model.production_year,
            categories: model.categories,
        })
    }

    async fn update_model(&self, model: Model, relink: CategoryRelink) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        // Detach before the field replacement, attach after, all in one
        // transaction (see logic::links for the ordering contract).
        let detach: Vec<Id> = relink.detach.iter().copied().collect();
        if !detach.is_empty() {
            sqlx::query("DELETE FROM category_model WHERE model_ref = $1 AND category_ref = ANY($2)")
                .bind(model.id)
                .bind(&detach)
                .execute(&mut *tx)
                .await
                .context("Failed to detach category links")?;
        }

        sqlx::query(
            "UPDATE models SET name = $1, brand_ref = $2, production_year = $3 WHERE model_id = $4",
        )
        .bind(model.name.as_str())
        .bind(model.brand.id)
        .bind(model.production_year)
        .bind(model.id)
        .execute(&mut *tx)
        .await
        .map_err(|err| map_unique(err, MODEL_IDENTITY_UNIQUE))?;

        for category_id in &relink.attach {
            sqlx::query("INSERT INTO category_model (category_ref, model_ref) VALUES ($1, $2)")
                .bind(category_id)
                .bind(model.id)
                .execute(&mut *tx)
                .await
                .context("Failed to attach category link")?;
        }

        tx.commit().await.context("Failed to commit model update")?;
        Ok(())
    }

    async fn delete_model(&self, key: &ModelKey) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM models m
            USING brands b
            WHERE m.brand_ref = b.brand_id
              AND b.name = $1 AND m.name = $2 AND m.production_year = $3
            "#,
        )
        .bind(key.brand.as_str())
        .bind(key.name.as_str())
        .bind(key.production_year)
        .execute(&self.pool)
        .await
        .context("Failed to delete model")?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl CarStore for PostgresStore {
    async fn car_by_number(&self, number: &str) -> StoreResult<Option<Car>> {
        let query = format!("{CAR_SELECT} WHERE c.number = $1");
        let row = sqlx::query(&query)
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch car")?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.cars_with_links(vec![row]).await?.pop())
    }

    async fn list_cars(&self, sort: SortClause<CarField>, page: PageRequest) -> StoreResult<Vec<Car>> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };
        let column = match sort.field {
            CarField::BrandName => "b.name",
            CarField::Number => "c.number",
            CarField::ModelName => "m.name",
            CarField::ProductionYear => "m.production_year",
        };
        let query = format!(
            "{CAR_SELECT} ORDER BY {column} {} OFFSET $1 LIMIT $2",
            direction_sql(sort.direction)
        );
        let rows = sqlx::query(&query)
            .bind(offset as i64)
            .bind(page.size as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list cars")?;
        self.cars_with_links(rows).await
    }

    async fn insert_car(&self, car: NewCar) -> StoreResult<Car> {
        let row = sqlx::query("INSERT INTO cars (number, model_ref) VALUES ($1, $2) RETURNING car_id")
            .bind(car.number.as_str())
            .bind(car.model_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_unique(err, CAR_NUMBER_UNIQUE))?;
        let id: Id = row.get("car_id");
        let model = self
            .model_by_id(car.model_id)
            .await?
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("unknown model id {}", car.model_id)))?;
        Ok(Car {
            id,
            number: car.number,
            model,
        })
    }

    async fn update_car(&self, car: Car) -> StoreResult<()> {
        sqlx::query("UPDATE cars SET number = $1 WHERE car_id = $2")
            .bind(car.number.as_str())
            .bind(car.id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_unique(err, CAR_NUMBER_UNIQUE))?;
        Ok(())
    }

    async fn delete_car(&self, number: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cars WHERE number = $1")
            .bind(number)
            .execute(&self.pool)
            .await
            .context("Failed to delete car")?;
        Ok(result.rows_affected())
    }
}

impl Store for PostgresStore {}
