#![cfg(test)]
use models::{user, user_profile};
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use uuid::Uuid;

use crate::accounts::password::hash_password;
use crate::actor::Actor;

pub const SEED_PASSWORD: &str = "password";

/// Fresh migrated database; `TEST_DATABASE_URL` selects a shared server instead of in-memory SQLite.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    models::db::connect_for_tests().await
}

/// Short lowercase prefix so tests sharing one database never collide.
pub fn unique_prefix() -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!("t{}", &tag[..8])
}

pub async fn seed_account(
    db: &DatabaseConnection,
    username: &str,
    admin_type: user::AdminType,
) -> Result<user::Model, anyhow::Error> {
    let hash = hash_password(SEED_PASSWORD)?;
    let mut am = user::new_account(Uuid::new_v4(), username, hash, None);
    am.admin_type = sea_orm::Set(admin_type);
    let created = am.insert(db).await?;
    user_profile::for_user(created.id).insert(db).await?;
    Ok(created)
}

pub fn actor_for(model: &user::Model) -> Actor {
    Actor { id: model.id, username: model.username.clone(), admin_type: model.admin_type }
}
