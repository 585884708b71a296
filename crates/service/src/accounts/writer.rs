//! Transactional bulk insert of accounts and their profiles.
//!
//! Either every account of a batch becomes visible or none does. A taken
//! username aborts the batch with `Key (username)=(<name>) already exists.`

use std::collections::HashSet;
use std::fmt;

use models::{user, user_profile};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QuerySelect, SqlErr,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::password::hash_passwords;
use crate::errors::ServiceError;

/// Rows per INSERT statement; keeps bind parameters well under backend limits.
const INSERT_CHUNK: usize = 500;
/// Values per `IN (...)` lookup.
const LOOKUP_CHUNK: usize = 500;

/// One account to create. `password` is the raw password.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl NewAccount {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), email: None }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

fn duplicate(username: &str) -> ServiceError {
    ServiceError::Conflict(format!("Key (username)=({username}) already exists."))
}

/// Insert `accounts` and one empty profile each, all in one transaction.
///
/// Returns the number of accounts created.
#[instrument(skip(db, accounts), fields(count = accounts.len()))]
pub async fn create_accounts(db: &DatabaseConnection, accounts: Vec<NewAccount>) -> Result<usize, ServiceError> {
    if accounts.is_empty() {
        return Ok(0);
    }

    let mut seen = HashSet::with_capacity(accounts.len());
    for account in &accounts {
        user::validate_username(&account.username)?;
        if !seen.insert(account.username.as_str()) {
            return Err(duplicate(&account.username));
        }
    }

    let usernames: Vec<String> = accounts.iter().map(|a| a.username.clone()).collect();
    let mut rows = Vec::with_capacity(accounts.len());
    let mut raw = Vec::with_capacity(accounts.len());
    for account in accounts {
        raw.push(account.password);
        rows.push((account.username, account.email));
    }
    let hashes = hash_passwords(raw).await?;

    let txn = db.begin().await?;
    if let Some(taken) = first_taken(&txn, &usernames).await? {
        txn.rollback().await?;
        return Err(duplicate(&taken));
    }

    let mut users = Vec::with_capacity(rows.len());
    let mut profiles = Vec::with_capacity(rows.len());
    for ((username, email), hash) in rows.into_iter().zip(hashes) {
        let id = Uuid::new_v4();
        users.push(user::new_account(id, &username, hash, email));
        profiles.push(user_profile::for_user(id));
    }
    let created = users.len();

    if let Err(e) = insert_all(&txn, users, profiles).await {
        txn.rollback().await?;
        return Err(map_insert_error(db, &usernames, e).await);
    }
    txn.commit().await?;

    info!(count = created, "accounts_created");
    Ok(created)
}

async fn insert_all(
    txn: &DatabaseTransaction,
    mut users: Vec<user::ActiveModel>,
    mut profiles: Vec<user_profile::ActiveModel>,
) -> Result<(), DbErr> {
    while !users.is_empty() {
        let rest = users.split_off(users.len().min(INSERT_CHUNK));
        user::Entity::insert_many(std::mem::replace(&mut users, rest)).exec_without_returning(txn).await?;
    }
    while !profiles.is_empty() {
        let rest = profiles.split_off(profiles.len().min(INSERT_CHUNK));
        user_profile::Entity::insert_many(std::mem::replace(&mut profiles, rest))
            .exec_without_returning(txn)
            .await?;
    }
    Ok(())
}

/// First name of `usernames`, in batch order, that already has an account.
async fn first_taken<C>(conn: &C, usernames: &[String]) -> Result<Option<String>, DbErr>
where
    C: sea_orm::ConnectionTrait,
{
    let mut taken = HashSet::new();
    for chunk in usernames.chunks(LOOKUP_CHUNK) {
        let found: Vec<String> = user::Entity::find()
            .select_only()
            .column(user::Column::Username)
            .filter(user::Column::Username.is_in(chunk.iter().cloned()))
            .into_tuple()
            .all(conn)
            .await?;
        taken.extend(found);
    }
    Ok(usernames.iter().find(|u| taken.contains(*u)).cloned())
}

/// A unique violation here means another writer won the race after our lookup.
async fn map_insert_error(db: &DatabaseConnection, usernames: &[String], err: DbErr) -> ServiceError {
    if !matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return err.into();
    }
    match first_taken(db, usernames).await {
        Ok(Some(name)) => duplicate(&name),
        Ok(None) => ServiceError::Conflict("Key (username) already exists.".into()),
        Err(lookup) => {
            warn!(error = %lookup, "could not name the conflicting username");
            ServiceError::Conflict("Key (username) already exists.".into())
        }
    }
}
