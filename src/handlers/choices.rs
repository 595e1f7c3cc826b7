use super::common::created_response;
use crate::{
    errors::ServiceError,
    services::reference_lists::{ChoiceOption, NewChoice, ReferenceChoice, ReferenceListKind},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;

fn parse_kind(kind: &str) -> Result<ReferenceListKind, ServiceError> {
    kind.parse::<ReferenceListKind>()
        .map_err(|_| ServiceError::NotFound(format!("Lista '{}' no existe", kind)))
}

#[utoipa::path(
    get,
    path = "/choices/{kind}",
    summary = "List every entry of a reference list",
    params(("kind" = ReferenceListKind, Path, description = "`impresion` or `colores`")),
    responses(
        (status = 200, description = "Entries ordered by position and name", body = ApiResponse<Vec<ReferenceChoice>>),
        (status = 404, description = "Unknown list", body = crate::errors::ErrorResponse),
    ),
    tag = "Reference lists"
)]
pub async fn list_choices(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReferenceChoice>>>, ServiceError> {
    let kind = parse_kind(&kind)?;
    let entries = state.services.reference_lists.list_all(kind).await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    get,
    path = "/choices/{kind}/active",
    summary = "Selection options",
    description = "Placeholder first, then the active entries",
    params(("kind" = ReferenceListKind, Path, description = "`impresion` or `colores`")),
    responses(
        (status = 200, description = "Options", body = ApiResponse<Vec<ChoiceOption>>),
        (status = 404, description = "Unknown list", body = crate::errors::ErrorResponse),
    ),
    tag = "Reference lists"
)]
pub async fn list_active_choices(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChoiceOption>>>, ServiceError> {
    let kind = parse_kind(&kind)?;
    let options = state.services.reference_lists.list_active(kind).await?;
    Ok(Json(ApiResponse::success(options)))
}

#[utoipa::path(
    post,
    path = "/choices/{kind}",
    summary = "Add an entry",
    params(("kind" = ReferenceListKind, Path, description = "`impresion` or `colores`")),
    request_body = NewChoice,
    responses(
        (status = 201, description = "Entry added", body = ApiResponse<ReferenceChoice>),
        (status = 400, description = "Empty name or bad color code", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already listed", body = crate::errors::ErrorResponse),
    ),
    tag = "Reference lists"
)]
pub async fn add_choice(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<NewChoice>,
) -> Result<Response, ServiceError> {
    let kind = parse_kind(&kind)?;
    let entry = state.services.reference_lists.add(kind, input).await?;
    Ok(created_response(Json(ApiResponse::success(entry))))
}

#[utoipa::path(
    post,
    path = "/choices/{kind}/{id}/toggle",
    summary = "Activate or retire an entry",
    params(
        ("kind" = ReferenceListKind, Path, description = "`impresion` or `colores`"),
        ("id" = i32, Path, description = "Entry id"),
    ),
    responses(
        (status = 200, description = "Entry toggled", body = ApiResponse<ReferenceChoice>),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Reference lists"
)]
pub async fn toggle_choice(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let kind = parse_kind(&kind)?;
    let entry = state.services.reference_lists.toggle_active(kind, id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

#[utoipa::path(
    post,
    path = "/choices/{kind}/{id}/delete",
    summary = "Delete an entry",
    params(
        ("kind" = ReferenceListKind, Path, description = "`impresion` or `colores`"),
        ("id" = i32, Path, description = "Entry id"),
    ),
    responses(
        (status = 200, description = "Entry deleted", body = ApiResponse<Value>),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Reference lists"
)]
pub async fn delete_choice(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let kind = parse_kind(&kind)?;
    state.services.reference_lists.delete(kind, id).await?;
    Ok(Json(ApiResponse::<()>::message("Opción eliminada.")))
}

pub fn choice_routes() -> Router<AppState> {
    Router::new()
        .route("/choices/:kind", get(list_choices).post(add_choice))
        .route("/choices/:kind/active", get(list_active_choices))
        .route("/choices/:kind/:id/toggle", post(toggle_choice))
        .route("/choices/:kind/:id/delete", post(delete_choice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unknown_list_is_not_found() {
        assert_eq!(parse_kind("colores").unwrap(), ReferenceListKind::Colores);
        assert_matches!(parse_kind("tallas"), Err(ServiceError::NotFound(_)));
    }
}
