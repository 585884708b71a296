use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: newest-first listing
        manager
            .create_index(
                Index::create()
                    .name("idx_user_created_at")
                    .table(User::Table)
                    .col(User::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // GroupUser: one membership per (group, user)
        manager
            .create_index(
                Index::create()
                    .name("uniq_group_user_group_user")
                    .table(GroupUser::Table)
                    .col(GroupUser::GroupId)
                    .col(GroupUser::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_user_user")
                    .table(GroupUser::Table)
                    .col(GroupUser::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_group_user_user").table(GroupUser::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_group_user_group_user").table(GroupUser::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_created_at").table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, CreatedAt }

#[derive(DeriveIden)]
enum GroupUser { Table, GroupId, UserId }
