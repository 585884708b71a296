//! Bulk generation of numbered accounts and one-shot download of their credentials.
//!
//! `generate` validates, generates, persists and exports; the returned
//! [`FileId`] redeems the spreadsheet exactly once through `redeem`.
//! The sheet is staged in the store before the accounts commit, so a
//! store failure leaves no accounts behind; a failed commit discards the
//! staged sheet.

use std::sync::Arc;

use models::user::USERNAME_MAX_LEN;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::accounts::{create_accounts, NewAccount};
use crate::artifacts::{ArtifactStore, FileId};
use crate::credentials::{generate_credentials, username_len_bound};
use crate::errors::ServiceError;
use crate::export::{render_workbook, store_workbook, MAX_DATA_ROWS};

pub const DEFAULT_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 16;

#[derive(Clone, Debug, Deserialize)]
pub struct GenerateUsersInput {
    pub number_from: i64,
    pub number_to: i64,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default = "default_password_length")]
    pub password_length: usize,
}

fn default_password_length() -> usize {
    DEFAULT_PASSWORD_LENGTH
}

impl GenerateUsersInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if username_len_bound(self.number_from, self.number_to, &self.prefix, &self.suffix) > USERNAME_MAX_LEN {
            return Err(ServiceError::validation("Username should not more than 32 characters"));
        }
        if self.number_from > self.number_to {
            return Err(ServiceError::validation("Start number must be lower than end number"));
        }
        if self.count() > u128::from(MAX_DATA_ROWS) {
            return Err(ServiceError::validation(format!(
                "Can not generate more than {MAX_DATA_ROWS} users at once"
            )));
        }
        if !(1..=MAX_PASSWORD_LENGTH).contains(&self.password_length) {
            return Err(ServiceError::validation(format!(
                "Password length must be between 1 and {MAX_PASSWORD_LENGTH}"
            )));
        }
        Ok(())
    }

    /// Accounts the range asks for; zero when the range is reversed.
    pub fn count(&self) -> u128 {
        let span = i128::from(self.number_to) - i128::from(self.number_from) + 1;
        u128::try_from(span).unwrap_or(0)
    }
}

#[derive(Clone)]
pub struct ProvisioningService {
    db: DatabaseConnection,
    store: Arc<dyn ArtifactStore>,
}

impl ProvisioningService {
    pub fn new(db: DatabaseConnection, store: Arc<dyn ArtifactStore>) -> Self {
        Self { db, store }
    }

    #[instrument(skip(self), fields(from = input.number_from, to = input.number_to))]
    pub async fn generate(&self, input: GenerateUsersInput) -> Result<FileId, ServiceError> {
        input.validate()?;

        let credentials = generate_credentials(
            input.number_from,
            input.number_to,
            &input.prefix,
            &input.suffix,
            input.password_length,
        );
        let workbook = render_workbook(&credentials)?;
        let file_id = store_workbook(self.store.as_ref(), workbook).await?;

        let accounts = credentials
            .iter()
            .map(|c| NewAccount::new(c.username.clone(), c.password.clone()))
            .collect();
        let created = match create_accounts(&self.db, accounts).await {
            Ok(n) => n,
            Err(e) => {
                self.discard(&file_id).await;
                return Err(e);
            }
        };

        info!(count = created, file_id = %file_id, "users_generated");
        Ok(file_id)
    }

    async fn discard(&self, file_id: &FileId) {
        if let Err(e) = self.store.take_once(file_id).await {
            warn!(file_id = %file_id, error = %e, "failed to discard staged workbook");
        }
    }

    /// Return the spreadsheet behind `file_id` and destroy it.
    #[instrument(skip(self))]
    pub async fn redeem(&self, file_id: Option<&str>) -> Result<Vec<u8>, ServiceError> {
        let raw = file_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::validation("Invalid Parameter, file_id is required"))?;
        let id = FileId::parse(raw)?;
        let bytes = self.store.take_once(&id).await?;
        info!(file_id = %id, size = bytes.len(), "artifact_redeemed");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::password::verify_password;
    use crate::artifacts::{ArtifactError, DirArtifactStore, MemoryArtifactStore};
    use crate::export::tests::read_sheet;
    use crate::test_support::{get_db, seed_account, unique_prefix};
    use async_trait::async_trait;
    use models::user;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn input(from: i64, to: i64, prefix: &str, len: usize) -> GenerateUsersInput {
        GenerateUsersInput { number_from: from, number_to: to, prefix: prefix.into(), suffix: String::new(), password_length: len }
    }

    async fn count_prefixed(db: &DatabaseConnection, prefix: &str) -> u64 {
        user::Entity::find().filter(user::Column::Username.starts_with(prefix)).count(db).await.unwrap()
    }

    /// Store wrapper counting how often it is touched. Without `inner` every `put` fails.
    #[derive(Default)]
    struct CountingStore {
        inner: Option<MemoryArtifactStore>,
        calls: AtomicUsize,
        puts: AtomicUsize,
        takes: AtomicUsize,
    }

    impl CountingStore {
        fn backed() -> Self {
            Self { inner: Some(MemoryArtifactStore::new(Duration::from_secs(60), 8)), ..Default::default() }
        }
    }

    #[async_trait]
    impl ArtifactStore for CountingStore {
        async fn put(&self, bytes: Vec<u8>) -> Result<FileId, ArtifactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.puts.fetch_add(1, Ordering::SeqCst);
            match &self.inner {
                Some(s) => s.put(bytes).await,
                None => Err(ArtifactError::Full),
            }
        }

        async fn take_once(&self, id: &FileId) -> Result<Vec<u8>, ArtifactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.takes.fetch_add(1, Ordering::SeqCst);
            match &self.inner {
                Some(s) => s.take_once(id).await,
                None => Err(ArtifactError::NotFound),
            }
        }
    }

    #[tokio::test]
    async fn generates_accounts_and_sheet() -> anyhow::Result<()> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = Arc::new(DirArtifactStore::new(tmp.path(), Duration::from_secs(60)));
        let svc = ProvisioningService::new(db.clone(), store);
        let p = unique_prefix();

        let id = svc.generate(input(1, 3, &p, 6)).await?;
        assert_eq!(count_prefixed(&db, &p).await, 3);

        let rows = read_sheet(svc.redeem(Some(id.as_str())).await?);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Username", "Password"]);
        for (n, row) in (1..=3).zip(&rows[1..]) {
            assert_eq!(row[0], format!("{p}{n}"));
            assert_eq!(row[1].chars().count(), 6);
            let stored = user::find_by_username(&db, &row[0]).await?.unwrap();
            assert!(verify_password(&row[1], &stored.password_hash));
        }

        let again = svc.redeem(Some(id.as_str())).await.unwrap_err();
        assert_eq!(again.public_message(), "File does not exist");
        Ok(())
    }

    #[tokio::test]
    async fn suffix_and_single_number() -> anyhow::Result<()> {
        let db = get_db().await?;
        let svc = ProvisioningService::new(db.clone(), Arc::new(MemoryArtifactStore::new(Duration::from_secs(60), 8)));
        let p = unique_prefix();
        let req = GenerateUsersInput { suffix: "_t".into(), ..input(5, 5, &p, DEFAULT_PASSWORD_LENGTH) };
        let id = svc.generate(req).await?;
        let rows = read_sheet(svc.redeem(Some(id.as_str())).await?);
        assert_eq!(rows[1][0], format!("{p}5_t"));
        assert_eq!(rows[1][1].len(), DEFAULT_PASSWORD_LENGTH);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_requests_touch_nothing() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(CountingStore::default());
        let svc = ProvisioningService::new(db.clone(), store.clone());
        let p = unique_prefix();

        let err = svc.generate(input(3, 1, &p, 6)).await.unwrap_err();
        assert_eq!(err.public_message(), "Start number must be lower than end number");

        let long = format!("{p}{}", "x".repeat(32));
        let err = svc.generate(input(1, 3, &long, 6)).await.unwrap_err();
        assert_eq!(err.public_message(), "Username should not more than 32 characters");

        assert!(svc.generate(input(1, 3, &p, 0)).await.is_err());
        assert!(svc.generate(input(1, 3, &p, 17)).await.is_err());

        assert_eq!(count_prefixed(&db, &p).await, 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn length_check_comes_first() {
        let req = GenerateUsersInput { prefix: "p".repeat(40), ..input(9, 1, "", 6) };
        assert_eq!(req.validate().unwrap_err().public_message(), "Username should not more than 32 characters");
    }

    #[test]
    fn exactly_32_characters_is_allowed() {
        // 30 + two digits
        assert!(input(10, 99, &"p".repeat(30), 6).validate().is_ok());
        assert!(input(10, 100, &"p".repeat(30), 6).validate().is_err());
    }

    #[test]
    fn range_is_capped_at_one_worksheet() {
        let err = input(0, i64::MAX, "", 6).validate().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(err.public_message(), "Can not generate more than 1048575 users at once");

        let err = input(i64::MIN, i64::MAX, "", 6).validate().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // one past the sheet's capacity
        assert!(input(0, 1_048_575, "", 6).validate().is_err());
        assert!(input(0, 1_048_574, "", 6).validate().is_ok());
        assert_eq!(input(-2, 2, "", 6).count(), 5);
    }

    #[tokio::test]
    async fn oversized_range_touches_nothing() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(CountingStore::default());
        let svc = ProvisioningService::new(db.clone(), store.clone());
        let p = unique_prefix();

        let err = svc.generate(input(0, 2_000_000, &p, 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(count_prefixed(&db, &p).await, 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn existing_username_aborts_without_file() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(CountingStore::backed());
        let svc = ProvisioningService::new(db.clone(), store.clone());
        let p = unique_prefix();
        seed_account(&db, &format!("{p}1"), user::AdminType::RegularUser).await?;

        let err = svc.generate(input(1, 3, &p, 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(err.public_message().contains(&format!("{p}1")));
        assert_eq!(count_prefixed(&db, &p).await, 1);
        // the staged sheet was taken back out, nothing is left to download
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
        assert_eq!(store.takes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_creates_no_accounts() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(CountingStore::default());
        let svc = ProvisioningService::new(db.clone(), store.clone());
        let p = unique_prefix();

        let err = svc.generate(input(1, 3, &p, 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(count_prefixed(&db, &p).await, 0);
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn full_memory_store_creates_no_accounts() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(MemoryArtifactStore::new(Duration::from_secs(60), 1));
        let svc = ProvisioningService::new(db.clone(), store);
        let p = unique_prefix();

        let first = svc.generate(input(1, 2, &p, 6)).await?;
        let err = svc.generate(input(3, 4, &p, 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(count_prefixed(&db, &p).await, 2);

        // the waiting sheet is still intact
        let rows = read_sheet(svc.redeem(Some(first.as_str())).await?);
        assert_eq!(rows.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn redeem_guards_ids_before_store() -> anyhow::Result<()> {
        let db = get_db().await?;
        let store = Arc::new(CountingStore::default());
        let svc = ProvisioningService::new(db, store.clone());

        for missing in [None, Some("")] {
            let err = svc.redeem(missing).await.unwrap_err();
            assert_eq!(err.public_message(), "Invalid Parameter, file_id is required");
        }
        for bad in ["../../etc/passwd", "abc.xlsx", "a b", "x/../y"] {
            let err = svc.redeem(Some(bad)).await.unwrap_err();
            assert_eq!(err.public_message(), "Illegal file_id");
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        let err = svc.redeem(Some("unknown1")).await.unwrap_err();
        assert_eq!(err.public_message(), "File does not exist");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
