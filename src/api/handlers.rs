use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::dto::{self, BrandDto, CarDto, CategoryDto, ModelDto};
use crate::error::CatalogError;
use crate::logic::catalog::{BrandOps, CarOps, CategoryOps, ModelOps};
use crate::logic::sort::SortCriteria;
use crate::model::ModelKey;
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

/// Error payload returned for every failed operation: the human-readable
/// message plus a unix-millisecond timestamp.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub timestamp: i64,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            message,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn into_api_error(err: CatalogError) -> ApiError {
    let status = match &err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::InvalidSortKey(_)
        | CatalogError::Conflict(_)
        | CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::Store(cause) => {
            log::error!("store failure: {cause:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

pub type Created = (StatusCode, [(header::HeaderName, String); 1]);

fn created_at(location: String) -> Created {
    (StatusCode::CREATED, [(header::LOCATION, location)])
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// List parameters shared by every collection endpoint: `page` (default 0),
/// `filter` (the sort key; each entity has its own default), and
/// `sortDirection` (default ASC).
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: i64,
    pub filter: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
}

impl ListQuery {
    fn criteria(&self, default_key: &str) -> SortCriteria {
        SortCriteria::new(
            self.filter.clone().unwrap_or_else(|| default_key.to_string()),
            self.sort_direction.clone().unwrap_or_else(|| "ASC".to_string()),
        )
    }
}

// ---- Brands ----

pub async fn list_brands<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BrandDto>>, ApiError> {
    let criteria = query.criteria("none");
    let brands = BrandOps::list(&*store, query.page, &criteria)
        .await
        .map_err(into_api_error)?;
    Ok(Json(brands.iter().map(BrandDto::from_record).collect()))
}

pub async fn get_brand<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<BrandDto>, ApiError> {
    let brand = BrandOps::get(&*store, &name).await.map_err(into_api_error)?;
    Ok(Json(BrandDto::from_record(&brand)))
}

pub async fn add_brand<S: Store>(
    State(store): State<AppState<S>>,
    Json(request): Json<BrandDto>,
) -> Result<Created, ApiError> {
    let brand = BrandOps::create(&*store, &request.brand_name)
        .await
        .map_err(into_api_error)?;
    Ok(created_at(format!("/api/v1/brands/{}", brand.name)))
}

pub async fn update_brand<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
    Json(request): Json<BrandDto>,
) -> Result<Json<BrandDto>, ApiError> {
    let brand = BrandOps::rename(&*store, &name, &request.brand_name)
        .await
        .map_err(into_api_error)?;
    Ok(Json(BrandDto::from_record(&brand)))
}

pub async fn delete_brand<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    match BrandOps::delete(&*store, &name).await.map_err(into_api_error)? {
        0 => Err(bad_request(format!("Brand '{name}' was not deleted"))),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

// ---- Categories ----

pub async fn list_categories<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let criteria = query.criteria("none");
    let categories = CategoryOps::list(&*store, query.page, &criteria)
        .await
        .map_err(into_api_error)?;
    Ok(Json(categories.iter().map(CategoryDto::from_record).collect()))
}

pub async fn get_category<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<CategoryDto>, ApiError> {
    let category = CategoryOps::get(&*store, &name).await.map_err(into_api_error)?;
    Ok(Json(CategoryDto::from_record(&category)))
}

pub async fn add_category<S: Store>(
    State(store): State<AppState<S>>,
    Json(request): Json<CategoryDto>,
) -> Result<Created, ApiError> {
    let category = CategoryOps::create(&*store, &request.category_name)
        .await
        .map_err(into_api_error)?;
    Ok(created_at(format!("/api/v1/categories/{}", category.name)))
}

pub async fn update_category<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
    Json(request): Json<CategoryDto>,
) -> Result<Json<CategoryDto>, ApiError> {
    let category = CategoryOps::rename(&*store, &name, &request.category_name)
        .await
        .map_err(into_api_error)?;
    Ok(Json(CategoryDto::from_record(&category)))
}

pub async fn delete_category<S: Store>(
    State(store): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    match CategoryOps::delete(&*store, &name).await.map_err(into_api_error)? {
        0 => Err(bad_request(format!("Category '{name}' was not deleted"))),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

// ---- Models ----

pub async fn list_models<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ModelDto>>, ApiError> {
    let criteria = query.criteria("model");
    let models = ModelOps::list(&*store, query.page, &criteria)
        .await
        .map_err(into_api_error)?;
    let mut payload = Vec::with_capacity(models.len());
    for model in &models {
        payload.push(dto::model_to_dto(&*store, model).await.map_err(into_api_error)?);
    }
    Ok(Json(payload))
}

pub async fn get_model<S: Store>(
    State(store): State<AppState<S>>,
    Path((brand, model, year)): Path<(String, String, i32)>,
) -> Result<Json<ModelDto>, ApiError> {
    let key = ModelKey {
        brand,
        name: model,
        production_year: year,
    };
    let model = ModelOps::get(&*store, &key).await.map_err(into_api_error)?;
    Ok(Json(dto::model_to_dto(&*store, &model).await.map_err(into_api_error)?))
}

pub async fn add_model<S: Store>(
    State(store): State<AppState<S>>,
    Json(request): Json<ModelDto>,
) -> Result<Created, ApiError> {
    let model = ModelOps::create(&*store, request.into_input())
        .await
        .map_err(into_api_error)?;
    Ok(created_at(format!(
        "/api/v1/models/{}/{}/{}",
        model.brand.name, model.name, model.production_year
    )))
}

pub async fn update_model<S: Store>(
    State(store): State<AppState<S>>,
    Path((brand, model, year)): Path<(String, String, i32)>,
    Json(request): Json<ModelDto>,
) -> Result<Json<ModelDto>, ApiError> {
    let key = ModelKey {
        brand,
        name: model,
        production_year: year,
    };
    let updated = ModelOps::update(&*store, &key, request.into_input())
        .await
        .map_err(into_api_error)?;
    Ok(Json(dto::model_to_dto(&*store, &updated).await.map_err(into_api_error)?))
}

pub async fn delete_model<S: Store>(
    State(store): State<AppState<S>>,
    Path((brand, model, year)): Path<(String, String, i32)>,
) -> Result<StatusCode, ApiError> {
    let key = ModelKey {
        brand,
        name: model,
        production_year: year,
    };
    match ModelOps::delete(&*store, &key).await.map_err(into_api_error)? {
        0 => Err(bad_request("Model was not deleted".to_string())),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

// ---- Cars ----

pub async fn list_cars<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CarDto>>, ApiError> {
    let criteria = query.criteria("brand");
    let cars = CarOps::list(&*store, query.page, &criteria)
        .await
        .map_err(into_api_error)?;
    let mut payload = Vec::with_capacity(cars.len());
    for car in &cars {
        payload.push(dto::car_to_dto(&*store, car).await.map_err(into_api_error)?);
    }
    Ok(Json(payload))
}

pub async fn get_car<S: Store>(
    State(store): State<AppState<S>>,
    Path(number): Path<String>,
) -> Result<Json<CarDto>, ApiError> {
    let car = CarOps::get(&*store, &number).await.map_err(into_api_error)?;
    Ok(Json(dto::car_to_dto(&*store, &car).await.map_err(into_api_error)?))
}

pub async fn register_car<S: Store>(
    State(store): State<AppState<S>>,
    Json(request): Json<CarDto>,
) -> Result<Created, ApiError> {
    let car = CarOps::create(&*store, request.into_input())
        .await
        .map_err(into_api_error)?;
    Ok(created_at(format!("/api/v1/cars/{}", car.number)))
}

pub async fn update_car<S: Store>(
    State(store): State<AppState<S>>,
    Path(number): Path<String>,
    Json(request): Json<CarDto>,
) -> Result<Json<CarDto>, ApiError> {
    let car = CarOps::renumber(&*store, &number, &request.number)
        .await
        .map_err(into_api_error)?;
    Ok(Json(dto::car_to_dto(&*store, &car).await.map_err(into_api_error)?))
}

pub async fn delete_car<S: Store>(
    State(store): State<AppState<S>>,
    Path(number): Path<String>,
) -> Result<StatusCode, ApiError> {
    match CarOps::delete(&*store, &number).await.map_err(into_api_error)? {
        0 => Err(bad_request(format!("Car with number '{number}' was not deleted"))),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}
