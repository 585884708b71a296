//! Groups and their membership.
//!
//! Super admins see every group; admins only the groups they manage.

use std::collections::HashSet;

use models::{group, group_user, user};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::params::parse_id_list;

#[derive(Clone, Debug, Deserialize)]
pub struct CreateGroupInput {
    pub groupname: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EditGroupInput {
    pub id: Uuid,
    pub groupname: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub page: Pagination,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddMembersInput {
    pub group_id: Uuid,
    pub user_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SetMemberTypeInput {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub user_type: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct GroupMemberView {
    pub user_id: Uuid,
    pub username: String,
    /// `true` for managers.
    pub user_type: bool,
}

fn keyword(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

async fn ensure_groupname_free(
    db: &DatabaseConnection,
    groupname: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut q = group::Entity::find().filter(group::Column::Groupname.eq(groupname));
    if let Some(id) = except {
        q = q.filter(group::Column::Id.ne(id));
    }
    if q.count(db).await? > 0 {
        return Err(ServiceError::Conflict("Group already exists".into()));
    }
    Ok(())
}

/// Groups `viewer` may see.
fn visible_groups(viewer: &Actor) -> Select<group::Entity> {
    let select = group::Entity::find();
    if viewer.is_super_admin() {
        return select;
    }
    let managed = Query::select()
        .column(group_user::Column::GroupId)
        .from(group_user::Entity)
        .and_where(group_user::Column::UserId.eq(viewer.id))
        .and_where(group_user::Column::UserType.eq(true))
        .to_owned();
    select.filter(group::Column::Id.in_subquery(managed))
}

/// Create a group; the creator becomes its first manager.
#[instrument(skip(db, creator), fields(creator = %creator.username))]
pub async fn create_group(
    db: &DatabaseConnection,
    creator: &Actor,
    input: CreateGroupInput,
) -> Result<group::Model, ServiceError> {
    group::validate_groupname(&input.groupname)?;
    ensure_groupname_free(db, &input.groupname, None).await?;

    let txn = db.begin().await?;
    let created = group::new_group(&input.groupname, input.description).insert(&txn).await?;
    group_user::membership(created.id, creator.id, true).insert(&txn).await?;
    txn.commit().await?;

    info!(group_id = %created.id, "group_created");
    Ok(created)
}

pub async fn edit_group(db: &DatabaseConnection, input: EditGroupInput) -> Result<group::Model, ServiceError> {
    group::validate_groupname(&input.groupname)?;
    let current = group::Entity::find_by_id(input.id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Group"))?;
    ensure_groupname_free(db, &input.groupname, Some(current.id)).await?;

    let mut am = current.into_active_model();
    am.groupname = Set(input.groupname);
    am.description = Set(input.description);
    Ok(am.update(db).await?)
}

pub async fn get_group(db: &DatabaseConnection, viewer: &Actor, id: Uuid) -> Result<group::Model, ServiceError> {
    visible_groups(viewer)
        .filter(group::Column::Id.eq(id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Group"))
}

pub async fn list_groups(
    db: &DatabaseConnection,
    viewer: &Actor,
    query: ListQuery,
) -> Result<Page<group::Model>, ServiceError> {
    let mut select = visible_groups(viewer).order_by_desc(group::Column::CreatedAt).order_by_asc(group::Column::Groupname);
    if let Some(kw) = keyword(&query.keyword) {
        select = select.filter(group::Column::Groupname.contains(kw));
    }
    let total = select.clone().count(db).await?;
    let (offset, limit) = query.page.normalize();
    let results = select.offset(offset).limit(limit).all(db).await?;
    Ok(Page { results, total })
}

pub async fn delete_groups(db: &DatabaseConnection, raw_ids: Option<&str>) -> Result<u64, ServiceError> {
    let ids = parse_id_list(raw_ids, "id")?;
    let res = group::Entity::delete_many().filter(group::Column::Id.is_in(ids)).exec(db).await?;
    info!(deleted = res.rows_affected, "groups_deleted");
    Ok(res.rows_affected)
}

/// Add users as regular members. Users already in the group are left as they are.
#[instrument(skip(db, input), fields(group_id = %input.group_id, count = input.user_ids.len()))]
pub async fn add_members(db: &DatabaseConnection, input: AddMembersInput) -> Result<usize, ServiceError> {
    if group::Entity::find_by_id(input.group_id).one(db).await?.is_none() {
        return Err(ServiceError::not_found("Group"));
    }

    let mut wanted = Vec::with_capacity(input.user_ids.len());
    let mut seen = HashSet::new();
    for id in input.user_ids {
        if seen.insert(id) {
            wanted.push(id);
        }
    }
    if wanted.is_empty() {
        return Ok(0);
    }

    let known: HashSet<Uuid> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Id.is_in(wanted.iter().copied()))
        .into_tuple()
        .all(db)
        .await?
        .into_iter()
        .collect();
    if wanted.iter().any(|id| !known.contains(id)) {
        return Err(ServiceError::not_found("User"));
    }

    let existing: HashSet<Uuid> = group_user::Entity::find()
        .select_only()
        .column(group_user::Column::UserId)
        .filter(group_user::Column::GroupId.eq(input.group_id))
        .filter(group_user::Column::UserId.is_in(wanted.iter().copied()))
        .into_tuple()
        .all(db)
        .await?
        .into_iter()
        .collect();
    let rows: Vec<_> = wanted
        .into_iter()
        .filter(|id| !existing.contains(id))
        .map(|id| group_user::membership(input.group_id, id, false))
        .collect();
    let added = rows.len();
    if added > 0 {
        group_user::Entity::insert_many(rows).exec_without_returning(db).await?;
    }
    Ok(added)
}

pub async fn set_member_type(db: &DatabaseConnection, input: SetMemberTypeInput) -> Result<(), ServiceError> {
    let res = group_user::Entity::update_many()
        .col_expr(group_user::Column::UserType, Expr::value(input.user_type))
        .filter(group_user::Column::GroupId.eq(input.group_id))
        .filter(group_user::Column::UserId.eq(input.user_id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("GroupUser"));
    }
    Ok(())
}

/// Members of a group, optionally filtered by a case-insensitive username fragment.
pub async fn list_members(
    db: &DatabaseConnection,
    group_id: Uuid,
    query: ListQuery,
) -> Result<Page<GroupMemberView>, ServiceError> {
    let mut select = group_user::Entity::find()
        .select_only()
        .column(group_user::Column::UserId)
        .column(user::Column::Username)
        .column(group_user::Column::UserType)
        .inner_join(user::Entity)
        .filter(group_user::Column::GroupId.eq(group_id))
        .order_by_asc(user::Column::Username);
    if let Some(kw) = keyword(&query.keyword) {
        let pattern = format!("%{}%", kw.to_lowercase());
        select = select.filter(Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Username)))).like(pattern));
    }

    let total = select.clone().count(db).await?;
    let (offset, limit) = query.page.normalize();
    let results = select.offset(offset).limit(limit).into_model::<GroupMemberView>().all(db).await?;
    Ok(Page { results, total })
}

pub async fn remove_members(
    db: &DatabaseConnection,
    group_id: Uuid,
    raw_user_ids: Option<&str>,
) -> Result<u64, ServiceError> {
    let user_ids = parse_id_list(raw_user_ids, "user_ids")?;
    let res = group_user::Entity::delete_many()
        .filter(group_user::Column::GroupId.eq(group_id))
        .filter(group_user::Column::UserId.is_in(user_ids))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor_for, get_db, seed_account, unique_prefix};
    use models::user::AdminType;

    #[tokio::test]
    async fn creator_manages_new_group() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let admin = actor_for(&seed_account(&db, &format!("{p}adm"), AdminType::Admin).await?);
        let g = create_group(&db, &admin, CreateGroupInput { groupname: format!("{p}g"), description: None }).await?;

        let members = list_members(&db, g.id, ListQuery::default()).await?;
        assert_eq!(members.total, 1);
        assert_eq!(members.results[0], GroupMemberView { user_id: admin.id, username: admin.username.clone(), user_type: true });

        let err = create_group(&db, &admin, CreateGroupInput { groupname: format!("{p}g"), description: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn admins_only_see_managed_groups() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let root = actor_for(&seed_account(&db, &format!("{p}root"), AdminType::SuperAdmin).await?);
        let a1 = actor_for(&seed_account(&db, &format!("{p}a1"), AdminType::Admin).await?);
        let a2 = actor_for(&seed_account(&db, &format!("{p}a2"), AdminType::Admin).await?);
        let g1 = create_group(&db, &a1, CreateGroupInput { groupname: format!("{p}one"), description: None }).await?;
        let g2 = create_group(&db, &a2, CreateGroupInput { groupname: format!("{p}two"), description: None }).await?;

        let kw = ListQuery { keyword: Some(p.clone()), ..Default::default() };
        assert_eq!(list_groups(&db, &root, kw.clone()).await?.total, 2);
        let mine = list_groups(&db, &a1, kw.clone()).await?;
        assert_eq!(mine.results.iter().map(|g| g.id).collect::<Vec<_>>(), vec![g1.id]);

        assert!(get_group(&db, &a1, g1.id).await.is_ok());
        let err = get_group(&db, &a1, g2.id).await.unwrap_err();
        assert_eq!(err.public_message(), "Group does not exist");
        assert!(get_group(&db, &root, g2.id).await.is_ok());

        let named = ListQuery { keyword: Some(format!("{p}tw")), ..Default::default() };
        assert_eq!(list_groups(&db, &root, named).await?.results[0].id, g2.id);
        Ok(())
    }

    #[tokio::test]
    async fn edit_and_delete_groups() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let admin = actor_for(&seed_account(&db, &format!("{p}adm"), AdminType::Admin).await?);
        let g = create_group(&db, &admin, CreateGroupInput { groupname: format!("{p}old"), description: None }).await?;

        let edited = edit_group(
            &db,
            EditGroupInput { id: g.id, groupname: format!("{p}new"), description: Some("finals".into()) },
        )
        .await?;
        assert_eq!(edited.groupname, format!("{p}new"));
        assert_eq!(edited.description.as_deref(), Some("finals"));

        let err = edit_group(&db, EditGroupInput { id: Uuid::new_v4(), groupname: "x".into(), description: None })
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Group does not exist");

        assert_eq!(delete_groups(&db, Some(&g.id.to_string())).await?, 1);
        assert!(delete_groups(&db, Some("")).await.is_err());
        let left = group_user::Entity::find().filter(group_user::Column::GroupId.eq(g.id)).count(&db).await?;
        assert_eq!(left, 0);
        Ok(())
    }

    #[tokio::test]
    async fn membership_lifecycle() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let admin = actor_for(&seed_account(&db, &format!("{p}adm"), AdminType::Admin).await?);
        let s1 = seed_account(&db, &format!("{p}stu1"), AdminType::RegularUser).await?;
        let s2 = seed_account(&db, &format!("{p}stu2"), AdminType::RegularUser).await?;
        let g = create_group(&db, &admin, CreateGroupInput { groupname: format!("{p}cls"), description: None }).await?;

        let added = add_members(&db, AddMembersInput { group_id: g.id, user_ids: vec![s1.id, s2.id, s1.id] }).await?;
        assert_eq!(added, 2);
        // re-adding is a no-op
        assert_eq!(add_members(&db, AddMembersInput { group_id: g.id, user_ids: vec![s1.id] }).await?, 0);

        let err = add_members(&db, AddMembersInput { group_id: g.id, user_ids: vec![Uuid::new_v4()] }).await.unwrap_err();
        assert_eq!(err.public_message(), "User does not exist");
        let err = add_members(&db, AddMembersInput { group_id: Uuid::new_v4(), user_ids: vec![s1.id] }).await.unwrap_err();
        assert_eq!(err.public_message(), "Group does not exist");

        set_member_type(&db, SetMemberTypeInput { group_id: g.id, user_id: s2.id, user_type: true }).await?;
        let err = set_member_type(&db, SetMemberTypeInput { group_id: g.id, user_id: Uuid::new_v4(), user_type: true })
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "GroupUser does not exist");

        let stu = list_members(&db, g.id, ListQuery { keyword: Some("STU".into()), ..Default::default() }).await?;
        assert_eq!(stu.total, 2);
        assert_eq!(stu.results[0].username, s1.username);
        assert!(!stu.results[0].user_type);
        assert!(stu.results[1].user_type);

        assert_eq!(remove_members(&db, g.id, Some(&format!("{},{}", s1.id, s2.id))).await?, 2);
        assert_eq!(list_members(&db, g.id, ListQuery::default()).await?.total, 1);
        let err = remove_members(&db, g.id, None).await.unwrap_err();
        assert_eq!(err.public_message(), "Invalid Parameter, user_ids is required");
        Ok(())
    }
}
