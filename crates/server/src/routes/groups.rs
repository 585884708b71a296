use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use models::group;
use service::group_service::{self, CreateGroupInput, EditGroupInput, ListQuery};
use service::pagination::Pagination;
use service::Actor;

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::auth::ServerState;
use crate::routes::users::{Deleted, IdsQuery};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupListQuery {
    pub id: Option<Uuid>,
    pub keyword: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[utoipa::path(
    post, path = "/admin/group", tag = "group",
    request_body = crate::openapi::CreateGroupRequest,
    responses((status = 200, description = "Created group"), (status = 409, description = "Group already exists"))
)]
pub async fn create(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    ApiJson(input): ApiJson<CreateGroupInput>,
) -> Result<Json<group::Model>, JsonApiError> {
    Ok(Json(group_service::create_group(&state.db, &actor, input).await?))
}

#[utoipa::path(
    put, path = "/admin/group", tag = "group",
    request_body = crate::openapi::EditGroupRequest,
    responses((status = 200, description = "Updated group"), (status = 404, description = "Group does not exist"))
)]
pub async fn edit(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<EditGroupInput>,
) -> Result<Json<group::Model>, JsonApiError> {
    Ok(Json(group_service::edit_group(&state.db, input).await?))
}

#[utoipa::path(
    get, path = "/admin/group", tag = "group",
    params(GroupListQuery),
    responses((status = 200, description = "One group, or a page of groups"), (status = 404, description = "Group does not exist"))
)]
pub async fn get(
    State(state): State<ServerState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(q): ApiQuery<GroupListQuery>,
) -> Result<Response, JsonApiError> {
    if let Some(id) = q.id {
        return Ok(Json(group_service::get_group(&state.db, &actor, id).await?).into_response());
    }
    let query = ListQuery { keyword: q.keyword, page: Pagination { limit: q.limit, offset: q.offset } };
    Ok(Json(group_service::list_groups(&state.db, &actor, query).await?).into_response())
}

#[utoipa::path(
    delete, path = "/admin/group", tag = "group",
    params(IdsQuery),
    responses((status = 200, description = "Deleted", body = Deleted), (status = 400, description = "Missing ids"))
)]
pub async fn delete(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<IdsQuery>,
) -> Result<Json<Deleted>, JsonApiError> {
    let deleted = group_service::delete_groups(&state.db, q.id.as_deref()).await?;
    Ok(Json(Deleted { deleted }))
}
