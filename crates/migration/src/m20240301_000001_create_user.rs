//! Create `user` table.
//!
//! Login identities; `username` is the unique key the bulk writers race on.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Username, 32).unique_key().not_null())
                    .col(string_len_null(User::Email, 128))
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::AdminType, 32).not_null())
                    .col(string_len(User::ProblemPermission, 32).not_null())
                    .col(boolean(User::IsDisabled).default(false))
                    .col(boolean(User::OpenApi).default(false))
                    .col(string_len_null(User::OpenApiAppkey, 64))
                    .col(boolean(User::TwoFactorAuth).default(false))
                    .col(string_len_null(User::TfaToken, 64))
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    AdminType,
    ProblemPermission,
    IsDisabled,
    OpenApi,
    OpenApiAppkey,
    TwoFactorAuth,
    TfaToken,
    CreatedAt,
    UpdatedAt,
}
