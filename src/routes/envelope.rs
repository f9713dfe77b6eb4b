use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Success body shared by every endpoint: `{success, message?, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T: Serialize>(data: T) -> Reply<T> {
    reply(StatusCode::OK, None, data)
}

pub fn ok_with<T: Serialize>(message: &str, data: T) -> Reply<T> {
    reply(StatusCode::OK, Some(message), data)
}

pub fn created<T: Serialize>(message: &str, data: T) -> Reply<T> {
    reply(StatusCode::CREATED, Some(message), data)
}

pub fn accepted<T: Serialize>(message: &str, data: T) -> Reply<T> {
    reply(StatusCode::ACCEPTED, Some(message), data)
}

fn reply<T: Serialize>(status: StatusCode, message: Option<&str>, data: T) -> Reply<T> {
    (
        status,
        Json(ApiResponse {
            success: true,
            message: message.map(str::to_string),
            data,
        }),
    )
}
