use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Brands
        .route("/api/v1/brands", get(handlers::list_brands::<S>))
        .route("/api/v1/brands", post(handlers::add_brand::<S>))
        .route("/api/v1/brands/:name", get(handlers::get_brand::<S>))
        .route("/api/v1/brands/:name", put(handlers::update_brand::<S>))
        .route("/api/v1/brands/:name", delete(handlers::delete_brand::<S>))
        // Categories
        .route("/api/v1/categories", get(handlers::list_categories::<S>))
        .route("/api/v1/categories", post(handlers::add_category::<S>))
        .route("/api/v1/categories/:name", get(handlers::get_category::<S>))
        .route("/api/v1/categories/:name", put(handlers::update_category::<S>))
        .route("/api/v1/categories/:name", delete(handlers::delete_category::<S>))
        // Models, addressed by their composite natural key
        .route("/api/v1/models", get(handlers::list_models::<S>))
        .route("/api/v1/models", post(handlers::add_model::<S>))
        .route("/api/v1/models/:brand/:model/:year", get(handlers::get_model::<S>))
        .route("/api/v1/models/:brand/:model/:year", put(handlers::update_model::<S>))
        .route(
            "/api/v1/models/:brand/:model/:year",
            delete(handlers::delete_model::<S>),
        )
        // Cars
        .route("/api/v1/cars", get(handlers::list_cars::<S>))
        .route("/api/v1/cars", post(handlers::register_car::<S>))
        .route("/api/v1/cars/:number", get(handlers::get_car::<S>))
        .route("/api/v1/cars/:number", put(handlers::update_car::<S>))
        .route("/api/v1/cars/:number", delete(handlers::delete_car::<S>))
}
