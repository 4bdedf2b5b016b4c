use serde::Serialize;

/// API error payload
#[derive(Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Storage quota report returned by `GET /resource`.
#[derive(Serialize)]
pub struct ResourceResponse {
    pub total_storage: u64,
    pub used_storage: u64,
    pub available_storage: u64,
}

/// Confirmation payload for `DELETE /days/:day`.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
}
