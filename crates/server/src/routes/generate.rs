use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use service::provisioning::GenerateUsersInput;

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::auth::ServerState;

pub const XLSX_CONTENT_TYPE: &str = "application/xlsx";
pub const XLSX_DISPOSITION: &str = "attachment; filename=users.xlsx";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GeneratedFile {
    pub file_id: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    pub file_id: Option<String>,
}

#[utoipa::path(
    post, path = "/admin/generate_user", tag = "generate",
    request_body = crate::openapi::GenerateUsersRequest,
    responses(
        (status = 200, description = "Accounts created", body = GeneratedFile),
        (status = 400, description = "Validation Error"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn generate(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<GenerateUsersInput>,
) -> Result<Json<GeneratedFile>, JsonApiError> {
    let file_id = state.provisioning.generate(input).await?;
    Ok(Json(GeneratedFile { file_id: file_id.into_string() }))
}

#[utoipa::path(
    get, path = "/admin/generate_user", tag = "generate",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Spreadsheet, removed after this response", content_type = "application/xlsx"),
        (status = 400, description = "Missing or illegal file_id"),
        (status = 404, description = "File does not exist")
    )
)]
pub async fn download(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<DownloadQuery>,
) -> Result<Response, JsonApiError> {
    let bytes = state.provisioning.redeem(q.file_id.as_deref()).await?;
    Ok(([(CONTENT_DISPOSITION, XLSX_DISPOSITION), (CONTENT_TYPE, XLSX_CONTENT_TYPE)], bytes).into_response())
}
