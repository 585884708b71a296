use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::accounts::{import_users, ImportUsersInput};
use service::pagination::Pagination;
use service::user_service::{self, EditUserInput, UserQuery, UserView};
use service::Actor;

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::auth::ServerState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Fetch a single account instead of a page.
    pub id: Option<Uuid>,
    pub keyword: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdsQuery {
    /// Comma-separated ids.
    pub id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Created {
    pub created: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Deleted {
    pub deleted: u64,
}

#[utoipa::path(
    post, path = "/admin/user", tag = "user",
    request_body = crate::openapi::ImportUsersRequest,
    responses((status = 200, description = "Imported", body = Created), (status = 400, description = "Malformed row"), (status = 409, description = "Username already exists"))
)]
pub async fn import(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<ImportUsersInput>,
) -> Result<Json<Created>, JsonApiError> {
    let created = import_users(&state.db, input).await?;
    Ok(Json(Created { created }))
}

#[utoipa::path(
    put, path = "/admin/user", tag = "user",
    request_body = crate::openapi::EditUserRequest,
    responses((status = 200, description = "Updated account"), (status = 404, description = "User does not exist"), (status = 409, description = "Username or email taken"))
)]
pub async fn edit(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<EditUserInput>,
) -> Result<Json<UserView>, JsonApiError> {
    Ok(Json(user_service::edit_user(&state.db, input).await?))
}

#[utoipa::path(
    get, path = "/admin/user", tag = "user",
    params(UserListQuery),
    responses((status = 200, description = "One account, or a page of accounts"), (status = 404, description = "User does not exist"))
)]
pub async fn get(State(state): State<ServerState>, ApiQuery(q): ApiQuery<UserListQuery>) -> Result<Response, JsonApiError> {
    if let Some(id) = q.id {
        return Ok(Json(user_service::get_user(&state.db, id).await?).into_response());
    }
    let query = UserQuery { keyword: q.keyword, page: Pagination { limit: q.limit, offset: q.offset } };
    Ok(Json(user_service::list_users(&state.db, query).await?).into_response())
}

#[utoipa::path(
    delete, path = "/admin/user", tag = "user",
    params(IdsQuery),
    responses((status = 200, description = "Deleted", body = Deleted), (status = 400, description = "Missing ids or self-deletion"))
)]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(q): ApiQuery<IdsQuery>,
) -> Result<Json<Deleted>, JsonApiError> {
    let deleted = user_service::delete_users(&state.db, &actor, q.id.as_deref()).await?;
    Ok(Json(Deleted { deleted }))
}
