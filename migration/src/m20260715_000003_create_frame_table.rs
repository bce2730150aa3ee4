use sea_orm_migration::prelude::*;

/// Creates the `frame` table for per-user eyewear catalogs.
///
/// Measurement columns are nullable doubles in millimeters; empty or invalid
/// input is normalized to NULL before it reaches the database.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Frame {
    Table,
    Id,
    UserId,
    Name,
    Style,
    Description,
    Price,
    ImageUrl,
    PurchaseLink,
    IsActive,
    WidthMm,
    HeightMm,
    BridgeMm,
    TempleMm,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Frame::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Frame::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Frame::UserId).uuid().not_null())
                    .col(ColumnDef::new(Frame::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Frame::Style).string_len(50).not_null())
                    .col(ColumnDef::new(Frame::Description).string_len(1000).null())
                    .col(ColumnDef::new(Frame::Price).string_len(50).null())
                    .col(ColumnDef::new(Frame::ImageUrl).string_len(500).null())
                    .col(ColumnDef::new(Frame::PurchaseLink).string_len(500).null())
                    .col(
                        ColumnDef::new(Frame::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Frame::WidthMm).double().null())
                    .col(ColumnDef::new(Frame::HeightMm).double().null())
                    .col(ColumnDef::new(Frame::BridgeMm).double().null())
                    .col(ColumnDef::new(Frame::TempleMm).double().null())
                    .col(
                        ColumnDef::new(Frame::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Frame::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_frame_user_id")
                            .from(Frame::Table, Frame::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_frame_user_id")
                    .table(Frame::Table)
                    .col(Frame::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Frame::Table).to_owned())
            .await
    }
}
