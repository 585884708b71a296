//! Account administration: lookup, keyword listing, field-by-field edit and bulk delete.

use chrono::{DateTime, FixedOffset, Utc};
use models::user::{self, AdminType, ProblemPermission};
use models::user_profile;
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::accounts::password::hash_passwords;
use crate::actor::Actor;
use crate::credentials::random_token;
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::params::parse_id_list;

const TOKEN_LEN: usize = 32;

#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub admin_type: AdminType,
    pub problem_permission: ProblemPermission,
    pub is_disabled: bool,
    pub open_api: bool,
    pub two_factor_auth: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl UserView {
    fn from_parts(u: user::Model, profile: Option<user_profile::Model>) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            real_name: profile.and_then(|p| p.real_name),
            admin_type: u.admin_type,
            problem_permission: u.problem_permission,
            is_disabled: u.is_disabled,
            open_api: u.open_api,
            two_factor_auth: u.two_factor_auth,
            created_at: u.created_at,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserQuery {
    pub keyword: Option<String>,
    pub page: Pagination,
}

/// Every field is applied explicitly; nothing else on the account changes.
#[derive(Clone, Deserialize)]
pub struct EditUserInput {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub admin_type: AdminType,
    pub problem_permission: ProblemPermission,
    pub is_disabled: bool,
    /// New raw password; empty or absent keeps the current one.
    #[serde(default)]
    pub password: Option<String>,
    pub open_api: bool,
    pub two_factor_auth: bool,
}

pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> Result<UserView, ServiceError> {
    let (u, profile) = user::Entity::find_by_id(id)
        .find_also_related(user_profile::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;
    Ok(UserView::from_parts(u, profile))
}

/// Newest first. The keyword matches username, email or real name, ignoring case.
pub async fn list_users(db: &DatabaseConnection, query: UserQuery) -> Result<Page<UserView>, ServiceError> {
    let mut select = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_asc(user::Column::Username);

    if let Some(keyword) = query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let pattern = format!("%{}%", keyword.to_lowercase());
        let real_name_hits = Query::select()
            .column(user_profile::Column::UserId)
            .from(user_profile::Entity)
            .and_where(
                Expr::expr(Func::lower(Expr::col((user_profile::Entity, user_profile::Column::RealName))))
                    .like(pattern.as_str()),
            )
            .to_owned();
        select = select.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Username)))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Email)))).like(pattern.as_str()))
                .add(user::Column::Id.in_subquery(real_name_hits)),
        );
    }

    let total = select.clone().count(db).await?;
    let (offset, limit) = query.page.normalize();
    let rows = select
        .find_also_related(user_profile::Entity)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;
    let results = rows.into_iter().map(|(u, p)| UserView::from_parts(u, p)).collect();
    Ok(Page { results, total })
}

#[instrument(skip(db, input), fields(user_id = %input.id))]
pub async fn edit_user(db: &DatabaseConnection, input: EditUserInput) -> Result<UserView, ServiceError> {
    let username = input.username.trim().to_lowercase();
    user::validate_username(&username)?;
    let email = input.email.as_deref().map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    if let Some(e) = &email {
        user::validate_email(e)?;
    }

    let current = user::Entity::find_by_id(input.id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;

    let others = user::Entity::find().filter(user::Column::Id.ne(current.id));
    if others.clone().filter(user::Column::Username.eq(username.as_str())).count(db).await? > 0 {
        return Err(ServiceError::Conflict("Username already exists".into()));
    }
    if let Some(e) = &email {
        if others.filter(user::Column::Email.eq(e.as_str())).count(db).await? > 0 {
            return Err(ServiceError::Conflict("Email already exists".into()));
        }
    }

    let new_hash = match input.password.filter(|p| !p.is_empty()) {
        Some(raw) => hash_passwords(vec![raw]).await?.pop(),
        None => None,
    };

    let problem_permission = match input.admin_type {
        AdminType::SuperAdmin => ProblemPermission::All,
        AdminType::Admin => input.problem_permission,
        AdminType::RegularUser => ProblemPermission::NoAccess,
    };
    let open_api_appkey = match (input.open_api, current.open_api) {
        (true, true) => current.open_api_appkey.clone(),
        (true, false) => Some(random_token(TOKEN_LEN)),
        (false, _) => None,
    };
    let tfa_token = match (input.two_factor_auth, current.two_factor_auth) {
        (true, true) => current.tfa_token.clone(),
        (true, false) => Some(random_token(TOKEN_LEN)),
        (false, _) => None,
    };

    let mut am = current.into_active_model();
    am.username = Set(username);
    am.email = Set(email);
    am.admin_type = Set(input.admin_type);
    am.problem_permission = Set(problem_permission);
    am.is_disabled = Set(input.is_disabled);
    am.open_api = Set(input.open_api);
    am.open_api_appkey = Set(open_api_appkey);
    am.two_factor_auth = Set(input.two_factor_auth);
    am.tfa_token = Set(tfa_token);
    if let Some(hash) = new_hash {
        am.password_hash = Set(hash);
    }
    am.updated_at = Set(Utc::now().into());

    let txn = db.begin().await?;
    let updated = am.update(&txn).await.map_err(username_conflict)?;
    user_profile::Entity::update_many()
        .col_expr(user_profile::Column::RealName, Expr::value(input.real_name.clone()))
        .filter(user_profile::Column::UserId.eq(updated.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(username = %updated.username, admin_type = ?updated.admin_type, "user_edited");
    get_user(db, updated.id).await
}

/// A rename racing another edit trips the unique index after the pre-check passed.
fn username_conflict(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict("Username already exists".into()),
        _ => err.into(),
    }
}

/// Delete the accounts named in a comma-separated id list. Profiles and memberships cascade.
#[instrument(skip(db, actor), fields(actor = %actor.username))]
pub async fn delete_users(db: &DatabaseConnection, actor: &Actor, raw_ids: Option<&str>) -> Result<u64, ServiceError> {
    let ids = parse_id_list(raw_ids, "id")?;
    if ids.contains(&actor.id) {
        return Err(ServiceError::validation("Current user can not be deleted"));
    }
    let res = user::Entity::delete_many().filter(user::Column::Id.is_in(ids)).exec(db).await?;
    info!(deleted = res.rows_affected, "users_deleted");
    Ok(res.rows_affected)
}
