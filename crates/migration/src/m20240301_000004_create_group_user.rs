//! Create `group_user` membership table.
//!
//! `user_type = true` marks a group manager.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupUser::Table)
                    .if_not_exists()
                    .col(uuid(GroupUser::Id).primary_key())
                    .col(uuid(GroupUser::GroupId).not_null())
                    .col(uuid(GroupUser::UserId).not_null())
                    .col(boolean(GroupUser::UserType).default(false))
                    .col(timestamp_with_time_zone(GroupUser::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_user_group")
                            .from(GroupUser::Table, GroupUser::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_user_user")
                            .from(GroupUser::Table, GroupUser::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupUser::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GroupUser { Table, Id, GroupId, UserId, UserType, CreatedAt }

#[derive(DeriveIden)]
enum Group { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
