//! Cart and product endpoints:
//!
//! - `POST /shopping-carts`                    — create (idempotent per customer)
//! - `GET  /shopping-carts/{id}`               — fetch cart by customer id
//! - `POST /shopping-carts/{id}/items`         — add or update one item
//! - `GET  /products/{product_id}`             — catalog point lookup
//! - `POST /products/{product_id}/details`     — administrative product edit
//! - `GET  /products/search?q=`                — randomized sample search

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use trolley_core::catalog::ProductCatalog;
use trolley_core::domain::product::{Product, ProductId};
use trolley_core::errors::CartError;
use trolley_core::service::CartService;

const SEARCH_SAMPLE_SIZE: usize = 100;
const SEARCH_MAX_RESULTS: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CartService>,
    pub catalog: Arc<ProductCatalog>,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct CreateCartRequest {
    pub customer_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
    pub total_found: usize,
    pub total_searched: usize,
    pub search_time: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/shopping-carts", post(create_cart))
        .route("/shopping-carts/{id}", get(get_cart))
        .route("/shopping-carts/{id}/items", post(add_item))
        .route("/products/search", get(search_products))
        .route("/products/{product_id}", get(get_product))
        .route("/products/{product_id}/details", post(update_product_details))
        .with_state(state)
}

async fn create_cart(
    State(state): State<AppState>,
    Json(body): Json<CreateCartRequest>,
) -> Response {
    let Some(customer_id) = body.customer_id else {
        return error_response(StatusCode::BAD_REQUEST, "customer_id is required");
    };

    match with_deadline(state.request_timeout, state.service.create_cart(customer_id)).await {
        Ok(created) if created.created => (
            StatusCode::CREATED,
            Json(json!({
                "id": created.cart_id,
                "customer_id": created.customer_id,
                "message": format!(
                    "shopping cart {} created for customer {}",
                    created.cart_id, created.customer_id
                ),
                "created_at": created.created_at,
            })),
        )
            .into_response(),
        Ok(existing) => (
            StatusCode::OK,
            Json(json!({
                "message": "shopping cart already exists for this customer",
                "id": existing.cart_id,
                "customer_id": existing.customer_id,
            })),
        )
            .into_response(),
        Err(error) => cart_error_response(error),
    }
}

async fn get_cart(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(customer_id) = id.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "invalid customer id");
    };

    match with_deadline(state.request_timeout, state.service.get_cart(customer_id)).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(error) => cart_error_response(error),
    }
}

async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddItemRequest>,
) -> Response {
    let Ok(customer_id) = id.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "invalid customer id");
    };
    let (Some(product_id), Some(quantity)) = (body.product_id, body.quantity) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "product_id and quantity (min 1) are required",
        );
    };

    let upsert = with_deadline(
        state.request_timeout,
        state.service.add_or_update_item(customer_id, product_id, quantity),
    )
    .await;

    match upsert {
        Ok(upsert) => {
            let status = if upsert.created { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(json!({ "message": "item added to cart", "item": upsert.item })))
                .into_response()
        }
        Err(error) => cart_error_response(error),
    }
}

async fn get_product(State(state): State<AppState>, Path(product_id): Path<String>) -> Response {
    let Ok(product_id) = product_id.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "invalid product id");
    };

    match state.catalog.get(ProductId(product_id)) {
        Some(product) => (StatusCode::OK, Json(product)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "product not found"),
    }
}

/// Whole-record product replace. The body must carry the same product id as
/// the route; readers of the catalog never observe a partial edit.
async fn update_product_details(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(details): Json<Product>,
) -> Response {
    let Ok(product_id) = product_id.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "invalid product id");
    };

    if !state.catalog.contains(ProductId(product_id)) {
        return error_response(StatusCode::NOT_FOUND, "product not found");
    }
    if details.id.0 != product_id {
        return error_response(
            StatusCode::BAD_REQUEST,
            "product_id in body does not match route parameter",
        );
    }

    state.catalog.upsert(details);
    StatusCode::NO_CONTENT.into_response()
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let Some(q) = query.q.filter(|value| !value.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "query parameter `q` is required");
    };

    let started = Instant::now();
    let outcome = state.catalog.sample_search(&q, SEARCH_SAMPLE_SIZE, SEARCH_MAX_RESULTS);
    let search_time = format!("{:.3}s", started.elapsed().as_secs_f64());

    (
        StatusCode::OK,
        Json(SearchResponse {
            products: outcome.products,
            total_found: outcome.total_found,
            total_searched: outcome.total_searched,
            search_time,
        }),
    )
        .into_response()
}

/// Bounds one service call by the configured request deadline. Expiry is
/// indistinguishable from store unavailability to the caller, and always
/// distinguishable from validation/not-found outcomes.
async fn with_deadline<T>(
    timeout: Duration,
    operation: impl Future<Output = Result<T, CartError>>,
) -> Result<T, CartError> {
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(CartError::Unavailable("request deadline exceeded".to_string())),
    }
}

fn cart_error_response(error: CartError) -> Response {
    let status = match error {
        CartError::Validation(_) => StatusCode::BAD_REQUEST,
        CartError::NotFound(_) => StatusCode::NOT_FOUND,
        CartError::Conflict(_) => StatusCode::CONFLICT,
        CartError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
        warn!(event_name = "cart.request_failed", error = %error, "cart operation failed");
    }
    error_response(status, &error.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
