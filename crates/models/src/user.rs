use chrono::Utc;
use sea_orm::sea_query::StringLen;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;
use crate::user_profile;

/// Longest username the platform accepts.
pub const USERNAME_MAX_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub admin_type: AdminType,
    pub problem_permission: ProblemPermission,
    pub is_disabled: bool,
    pub open_api: bool,
    pub open_api_appkey: Option<String>,
    pub two_factor_auth: bool,
    pub tfa_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AdminType {
    #[sea_orm(string_value = "Regular User")]
    #[serde(rename = "Regular User")]
    RegularUser,
    #[sea_orm(string_value = "Admin")]
    #[serde(rename = "Admin")]
    Admin,
    #[sea_orm(string_value = "Super Admin")]
    #[serde(rename = "Super Admin")]
    SuperAdmin,
}

impl AdminType {
    pub fn is_admin_role(self) -> bool {
        matches!(self, AdminType::Admin | AdminType::SuperAdmin)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProblemPermission {
    #[sea_orm(string_value = "None")]
    #[serde(rename = "None")]
    NoAccess,
    #[sea_orm(string_value = "Own")]
    #[serde(rename = "Own")]
    Own,
    #[sea_orm(string_value = "All")]
    #[serde(rename = "All")]
    All,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Profile,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Profile => Entity::has_one(user_profile::Entity).into(),
        }
    }
}

impl Related<user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_username(username: &str) -> Result<(), errors::ModelError> {
    if username.trim().is_empty() {
        return Err(errors::ModelError::Validation("username required".into()));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(errors::ModelError::Validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    if !email.contains('@') {
        return Err(errors::ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

/// Active model for a freshly provisioned regular account.
pub fn new_account(id: Uuid, username: &str, password_hash: String, email: Option<String>) -> ActiveModel {
    let now = Utc::now().into();
    ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        admin_type: Set(AdminType::RegularUser),
        problem_permission: Set(ProblemPermission::NoAccess),
        is_disabled: Set(false),
        open_api: Set(false),
        open_api_appkey: Set(None),
        two_factor_auth: Set(false),
        tfa_token: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
