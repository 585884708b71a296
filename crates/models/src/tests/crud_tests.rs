use crate::db::connect_for_tests;
use crate::{group, group_user, user, user_profile};
use anyhow::Result;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use uuid::Uuid;

fn unique_name(prefix: &str) -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &tag[..8])
}

/// Account with its profile companion
#[tokio::test]
async fn test_user_and_profile_crud() -> Result<()> {
    let db = connect_for_tests().await?;

    let username = unique_name("crud");
    let created = user::new_account(Uuid::new_v4(), &username, "hash".into(), Some("a@example.com".into()))
        .insert(&db)
        .await?;
    assert_eq!(created.admin_type, user::AdminType::RegularUser);
    assert_eq!(created.problem_permission, user::ProblemPermission::NoAccess);
    assert!(!created.is_disabled);

    let profile = user_profile::for_user(created.id).insert(&db).await?;
    assert_eq!(profile.user_id, created.id);
    assert!(profile.real_name.is_none());

    // Read back through the relation
    let (found, found_profile) = user::Entity::find_by_id(created.id)
        .find_also_related(user_profile::Entity)
        .one(&db)
        .await?
        .expect("user row");
    assert_eq!(found.username, username);
    assert_eq!(found_profile.map(|p| p.id), Some(profile.id));

    let by_name = user::find_by_username(&db, &username).await?;
    assert_eq!(by_name.map(|u| u.id), Some(created.id));

    // Update an enum column
    let mut am: user::ActiveModel = found.into();
    am.admin_type = Set(user::AdminType::SuperAdmin);
    let updated = am.update(&db).await?;
    assert_eq!(updated.admin_type, user::AdminType::SuperAdmin);

    // Deleting the account cascades to its profile
    updated.delete(&db).await?;
    let orphan = user_profile::Entity::find_by_id(profile.id).one(&db).await?;
    assert!(orphan.is_none());
    Ok(())
}

/// Duplicate usernames hit the unique index
#[tokio::test]
async fn test_username_is_unique() -> Result<()> {
    let db = connect_for_tests().await?;
    let username = unique_name("dup");
    user::new_account(Uuid::new_v4(), &username, "h1".into(), None).insert(&db).await?;

    let err = user::new_account(Uuid::new_v4(), &username, "h2".into(), None)
        .insert(&db)
        .await
        .expect_err("second insert must fail");
    assert!(matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))));
    Ok(())
}

/// Groups and memberships
#[tokio::test]
async fn test_group_membership_crud() -> Result<()> {
    let db = connect_for_tests().await?;

    let owner = user::new_account(Uuid::new_v4(), &unique_name("own"), "h".into(), None).insert(&db).await?;
    let member = user::new_account(Uuid::new_v4(), &unique_name("mem"), "h".into(), None).insert(&db).await?;
    let g = group::new_group(&unique_name("grp"), Some("spring contest".into())).insert(&db).await?;

    group_user::membership(g.id, owner.id, true).insert(&db).await?;
    group_user::membership(g.id, member.id, false).insert(&db).await?;

    let members = g.find_related(group_user::Entity).all(&db).await?;
    assert_eq!(members.len(), 2);
    let managers: Vec<_> = members.iter().filter(|m| m.user_type).collect();
    assert_eq!(managers.len(), 1);
    assert_eq!(managers[0].user_id, owner.id);

    // Same (group, user) pair twice is rejected
    let dup = group_user::membership(g.id, member.id, false).insert(&db).await;
    assert!(dup.is_err());

    // Removing the group drops its memberships
    group::Entity::delete_by_id(g.id).exec(&db).await?;
    let left = group_user::Entity::find()
        .filter(group_user::Column::GroupId.eq(g.id))
        .all(&db)
        .await?;
    assert!(left.is_empty());
    Ok(())
}

#[test]
fn test_username_validation() {
    assert!(user::validate_username("stu1").is_ok());
    assert!(user::validate_username("").is_err());
    assert!(user::validate_username(&"x".repeat(32)).is_ok());
    assert!(user::validate_username(&"x".repeat(33)).is_err());
}

#[test]
fn test_groupname_validation() {
    assert!(group::validate_groupname("class 1").is_ok());
    assert!(group::validate_groupname("   ").is_err());
    assert!(group::validate_groupname(&"g".repeat(65)).is_err());
}

#[test]
fn test_admin_type_serde_names() {
    let v = serde_json::to_value(user::AdminType::SuperAdmin).unwrap();
    assert_eq!(v, "Super Admin");
    let p: user::ProblemPermission = serde_json::from_value(serde_json::json!("None")).unwrap();
    assert_eq!(p, user::ProblemPermission::NoAccess);
    assert!(user::AdminType::Admin.is_admin_role());
    assert!(!user::AdminType::RegularUser.is_admin_role());
}
