use super::common::{created_response, first_page, lenient_page, parse_availability, pdf_attachment};
use crate::{
    errors::ServiceError,
    reports,
    services::{
        catalog::{ProductInput, ProductPage, ProductSearch},
        reference_lists::{ChoiceOption, ReferenceListKind},
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// 1-based page number
    #[serde(default = "first_page", deserialize_with = "lenient_page")]
    pub page: u64,
    /// Substring of key, name or description
    pub search: Option<String>,
    /// `yes` or `no`; anything else lists every product
    pub available: Option<String>,
}

/// Everything the product form needs to render its selection fields
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductFormData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductInput>,
    pub impresion_options: Vec<ChoiceOption>,
    pub color_options: Vec<ChoiceOption>,
}

/// Keeps a stored label selectable on the edit form after its entry was retired.
fn with_current(mut options: Vec<ChoiceOption>, current: &str) -> Vec<ChoiceOption> {
    if !current.is_empty() && !options.iter().any(|o| o.value == current) {
        options.push(ChoiceOption {
            value: current.to_string(),
            label: current.to_string(),
            codigo_hex: None,
        });
    }
    options
}

async fn form_data(
    state: &AppState,
    product: Option<ProductInput>,
) -> Result<ProductFormData, ServiceError> {
    let lists = &state.services.reference_lists;
    let mut impresion_options = lists.list_active(ReferenceListKind::Impresion).await?;
    let mut color_options = lists.list_active(ReferenceListKind::Colores).await?;
    if let Some(current) = &product {
        impresion_options = with_current(impresion_options, &current.impresion);
        color_options = with_current(color_options, &current.colores);
    }
    Ok(ProductFormData {
        product,
        impresion_options,
        color_options,
    })
}

#[utoipa::path(
    get,
    path = "/products",
    summary = "List products",
    description = "Paginated catalog, newest first, with text and availability filters",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<ProductPage>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<ProductPage>>, ServiceError> {
    let page = state
        .services
        .catalog
        .search(ProductSearch {
            text: query.search,
            available: parse_availability(query.available.as_deref()),
            page: query.page,
        })
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/product/create",
    summary = "Product form options",
    responses((status = 200, description = "Active selection options", body = ApiResponse<ProductFormData>)),
    tag = "Products"
)]
pub async fn new_product_form(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProductFormData>>, ServiceError> {
    Ok(Json(ApiResponse::success(form_data(&state, None).await?)))
}

#[utoipa::path(
    post,
    path = "/product/create",
    summary = "Create product",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Value>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate key", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.create(input).await?;
    Ok(created_response(Json(ApiResponse::success(product))))
}

#[utoipa::path(
    get,
    path = "/product/{id}",
    summary = "Get product",
    params(("id" = String, Path, description = "Product key or numeric id")),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<Value>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.resolve(&id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    get,
    path = "/product/{id}/edit",
    summary = "Product edit form",
    params(("id" = String, Path, description = "Product key or numeric id")),
    responses(
        (status = 200, description = "Current values and selection options", body = ApiResponse<ProductFormData>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn edit_product_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductFormData>>, ServiceError> {
    let product = state.services.catalog.resolve(&id).await?;
    let data = form_data(&state, Some(ProductInput::from(&product))).await?;
    Ok(Json(ApiResponse::success(data)))
}

#[utoipa::path(
    post,
    path = "/product/{id}/edit",
    summary = "Update product",
    params(("id" = String, Path, description = "Product key or numeric id")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Value>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate or referenced key", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = state.services.catalog.resolve(&id).await?;
    let product = state
        .services
        .catalog
        .update(&existing.clave_producto, input)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/product/{id}/toggle-availability",
    summary = "Toggle product availability",
    params(("id" = String, Path, description = "Product key or numeric id")),
    responses(
        (status = 200, description = "Availability flipped", body = ApiResponse<Value>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn toggle_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = state.services.catalog.resolve(&id).await?;
    let product = state
        .services
        .catalog
        .toggle_availability(&existing.clave_producto)
        .await?;
    let status = if product.available {
        "disponible"
    } else {
        "no disponible"
    };
    let mut response = ApiResponse::success(product);
    response.message = Some(format!("Producto marcado como {}.", status));
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/product/{id}/delete",
    summary = "Delete product",
    params(("id" = String, Path, description = "Product key or numeric id")),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<Value>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product is quoted", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let existing = state.services.catalog.resolve(&id).await?;
    state
        .services
        .catalog
        .delete(&existing.clave_producto)
        .await?;
    Ok(Json(ApiResponse::<()>::message(
        "Producto eliminado exitosamente.",
    )))
}

#[utoipa::path(
    get,
    path = "/product/{id}/print",
    summary = "Product fact sheet",
    params(("id" = String, Path, description = "Product key or numeric id")),
    responses(
        (status = 200, description = "PDF document"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Products"
)]
pub async fn print_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.resolve(&id).await?;
    let bytes = reports::render_product(&product, &state.config.company_name, Utc::now())?;
    info!(clave_producto = %product.clave_producto, size = bytes.len(), "Product sheet rendered");
    pdf_attachment(&reports::product_filename(&product.clave_producto), bytes)
}

#[utoipa::path(
    get,
    path = "/products/print-all",
    summary = "Price list",
    description = "Every available product ordered by key",
    responses((status = 200, description = "PDF document")),
    tag = "Products"
)]
pub async fn print_all_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let products = state.services.catalog.list_all().await?;
    let now = Utc::now();
    let bytes = reports::render_catalog(&products, &state.config.company_name, now)?;
    info!(products = products.len(), size = bytes.len(), "Price list rendered");
    pdf_attachment(&reports::catalog_filename(now), bytes)
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/products", get(list_products))
        .route("/products/print-all", get(print_all_products))
        .route("/product/create", get(new_product_form).post(create_product))
        .route("/product/:id", get(get_product))
        .route("/product/:id/edit", get(edit_product_form).post(update_product))
        .route("/product/:id/toggle-availability", post(toggle_availability))
        .route("/product/:id/delete", post(delete_product))
        .route("/product/:id/print", get(print_product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retired_label_stays_selectable_on_edit() {
        let options = vec![ChoiceOption::placeholder()];
        let options = with_current(options, "Fundido");
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].value, "Fundido");

        let again = with_current(options.clone(), "Fundido");
        assert_eq!(again, options);
        assert_eq!(with_current(vec![], "").len(), 0);
    }
}
