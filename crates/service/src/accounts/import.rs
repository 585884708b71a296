use models::user::USERNAME_MAX_LEN;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::instrument;

use super::writer::{create_accounts, NewAccount};
use crate::errors::ServiceError;

/// Rows of `[username, password, email]`, as read from an uploaded sheet.
#[derive(Clone, Deserialize)]
pub struct ImportUsersInput {
    pub users: Vec<Vec<String>>,
}

/// Turn raw rows into accounts, rejecting the first malformed row.
pub fn parse_rows(rows: Vec<Vec<String>>) -> Result<Vec<NewAccount>, ServiceError> {
    rows.into_iter()
        .map(|row| {
            let rejected = || ServiceError::validation(format!("Error occurred while processing data '{row:?}'"));
            let [username, password, email]: [String; 3] = match row.as_slice() {
                [u, p, e] if u.chars().count() <= USERNAME_MAX_LEN => [u.clone(), p.clone(), e.clone()],
                _ => return Err(rejected()),
            };
            let email = Some(email).filter(|e| !e.trim().is_empty());
            Ok(NewAccount::new(username, password).with_email(email))
        })
        .collect()
}

#[instrument(skip(db, input), fields(rows = input.users.len()))]
pub async fn import_users(db: &DatabaseConnection, input: ImportUsersInput) -> Result<usize, ServiceError> {
    let accounts = parse_rows(input.users)?;
    create_accounts(db, accounts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, unique_prefix};
    use models::user;

    fn row(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_need_exactly_three_fields() {
        let err = parse_rows(vec![row(&["alice", "pw"])]).unwrap_err();
        assert_eq!(err.public_message(), r#"Error occurred while processing data '["alice", "pw"]'"#);
        assert!(parse_rows(vec![row(&["a", "b", "c", "d"])]).is_err());
    }

    #[test]
    fn long_usernames_are_rejected() {
        let long = "u".repeat(33);
        assert!(parse_rows(vec![row(&[&long, "pw", ""])]).is_err());
        assert!(parse_rows(vec![row(&[&long[..32], "pw", ""])]).is_ok());
    }

    #[test]
    fn blank_email_becomes_none() {
        let parsed = parse_rows(vec![row(&["a", "pw", ""]), row(&["b", "pw", "b@x.io"])]).unwrap();
        assert_eq!(parsed[0].email, None);
        assert_eq!(parsed[1].email.as_deref(), Some("b@x.io"));
    }

    #[tokio::test]
    async fn import_creates_accounts() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let input = ImportUsersInput {
            users: vec![row(&[&format!("{p}1"), "pw1", ""]), row(&[&format!("{p}2"), "pw2", "two@example.com"])],
        };
        assert_eq!(import_users(&db, input).await?, 2);
        assert!(user::find_by_username(&db, &format!("{p}2")).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn bad_row_creates_nothing() -> anyhow::Result<()> {
        let db = get_db().await?;
        let p = unique_prefix();
        let input = ImportUsersInput { users: vec![row(&[&format!("{p}ok"), "pw", ""]), row(&["broken"])] };
        assert!(matches!(import_users(&db, input).await, Err(ServiceError::Validation(_))));
        assert!(user::find_by_username(&db, &format!("{p}ok")).await?.is_none());
        Ok(())
    }
}
