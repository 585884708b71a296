use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct GenerateUsersRequest {
    pub number_from: i64,
    pub number_to: i64,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// 1..=16, defaults to 8.
    pub password_length: Option<usize>,
}

/// Each row is `[username, password, email]`.
#[derive(ToSchema)]
pub struct ImportUsersRequest { pub users: Vec<Vec<String>> }

#[derive(ToSchema)]
pub struct EditUserRequest {
    pub id: Uuid,
    pub username: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    /// `Regular User`, `Admin` or `Super Admin`.
    pub admin_type: String,
    /// `None`, `Own` or `All`.
    pub problem_permission: String,
    pub is_disabled: bool,
    pub password: Option<String>,
    pub open_api: bool,
    pub two_factor_auth: bool,
}

#[derive(ToSchema)]
pub struct CreateGroupRequest { pub groupname: String, pub description: Option<String> }

#[derive(ToSchema)]
pub struct EditGroupRequest { pub id: Uuid, pub groupname: String, pub description: Option<String> }

#[derive(ToSchema)]
pub struct AddMembersRequest { pub group_id: Uuid, pub user_ids: Vec<Uuid> }

#[derive(ToSchema)]
pub struct SetMemberTypeRequest { pub group_id: Uuid, pub user_id: Uuid, pub user_type: bool }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::generate::generate,
        crate::routes::generate::download,
        crate::routes::users::import,
        crate::routes::users::edit,
        crate::routes::users::get,
        crate::routes::users::delete,
        crate::routes::groups::create,
        crate::routes::groups::edit,
        crate::routes::groups::get,
        crate::routes::groups::delete,
        crate::routes::group_users::add,
        crate::routes::group_users::set_type,
        crate::routes::group_users::list,
        crate::routes::group_users::remove,
    ),
    components(
        schemas(
            HealthResponse,
            GenerateUsersRequest,
            ImportUsersRequest,
            EditUserRequest,
            CreateGroupRequest,
            EditGroupRequest,
            AddMembersRequest,
            SetMemberTypeRequest,
            crate::routes::generate::GeneratedFile,
            crate::routes::users::Created,
            crate::routes::users::Deleted,
            crate::routes::group_users::Added,
        )
    ),
    tags(
        (name = "health"),
        (name = "generate"),
        (name = "user"),
        (name = "group")
    )
)]
pub struct ApiDoc;
