use crate::errors::ServiceError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer};

/// Standard created response
pub fn created_response<T: IntoResponse>(body: T) -> Response {
    (StatusCode::CREATED, body).into_response()
}

/// PDF download with an attachment disposition.
pub fn pdf_attachment(filename: &str, bytes: Vec<u8>) -> Result<Response, ServiceError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ServiceError::InternalError(format!("invalid filename header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Availability filter as sent by the listing: `yes`, `no` or anything else for all.
pub fn parse_availability(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("yes") | Some("true") | Some("1") => Some(true),
        Some("no") | Some("false") | Some("0") => Some(false),
        _ => None,
    }
}

pub fn first_page() -> u64 {
    1
}

/// Query-string page number; junk and zero fall back to the first page.
pub fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1))
}
