use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::group_service::{self, AddMembersInput, GroupMemberView, ListQuery, SetMemberTypeInput};
use service::pagination::{Page, Pagination};

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::routes::auth::ServerState;
use crate::routes::users::Deleted;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberListQuery {
    #[serde(alias = "id")]
    pub group_id: Option<Uuid>,
    pub keyword: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemoveMembersQuery {
    pub group_id: Option<Uuid>,
    /// Comma-separated user ids.
    pub user_ids: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Added {
    pub added: usize,
}

fn require_group(group_id: Option<Uuid>) -> Result<Uuid, JsonApiError> {
    group_id.ok_or_else(|| JsonApiError::validation("Invalid Parameter, group_id is required"))
}

#[utoipa::path(
    post, path = "/admin/group_user", tag = "group",
    request_body = crate::openapi::AddMembersRequest,
    responses((status = 200, description = "Added", body = Added), (status = 404, description = "Group or user does not exist"))
)]
pub async fn add(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<AddMembersInput>,
) -> Result<Json<Added>, JsonApiError> {
    let added = group_service::add_members(&state.db, input).await?;
    Ok(Json(Added { added }))
}

#[utoipa::path(
    put, path = "/admin/group_user", tag = "group",
    request_body = crate::openapi::SetMemberTypeRequest,
    responses((status = 204, description = "Updated"), (status = 404, description = "GroupUser does not exist"))
)]
pub async fn set_type(
    State(state): State<ServerState>,
    ApiJson(input): ApiJson<SetMemberTypeInput>,
) -> Result<StatusCode, JsonApiError> {
    group_service::set_member_type(&state.db, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/admin/group_user", tag = "group",
    params(MemberListQuery),
    responses((status = 200, description = "Page of members"))
)]
pub async fn list(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<MemberListQuery>,
) -> Result<Json<Page<GroupMemberView>>, JsonApiError> {
    let group_id = require_group(q.group_id)?;
    let query = ListQuery { keyword: q.keyword, page: Pagination { limit: q.limit, offset: q.offset } };
    Ok(Json(group_service::list_members(&state.db, group_id, query).await?))
}

#[utoipa::path(
    delete, path = "/admin/group_user", tag = "group",
    params(RemoveMembersQuery),
    responses((status = 200, description = "Removed", body = Deleted))
)]
pub async fn remove(
    State(state): State<ServerState>,
    ApiQuery(q): ApiQuery<RemoveMembersQuery>,
) -> Result<Json<Deleted>, JsonApiError> {
    let group_id = require_group(q.group_id)?;
    let deleted = group_service::remove_members(&state.db, group_id, q.user_ids.as_deref()).await?;
    Ok(Json(Deleted { deleted }))
}
