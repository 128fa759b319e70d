//! Initial schema.
//!
//! - `layout_configs`: one dashboard layout per user
//! - `users`: marketplace accounts with their credits balance (cents)
//! - `pack_listings`: published packs and their pricing
//! - `credits_transactions`: signed ledger of balance changes
//! - `author_storefronts`: author shops
//! - `storefront_support_requests`: support applications and their review state
//! - `settings`: admin key/value settings

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum LayoutConfigs {
    Table,
    Id,
    UserId,
    IsLocked,
    LayoutData,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    DisplayName,
    Email,
    CreditsBalance,
    CreatedAt,
}

#[derive(Iden)]
enum PackListings {
    Table,
    Id,
    AuthorId,
    Name,
    PricingMode,
    CreditsPrice,
    Status,
    PayloadRef,
    PayloadBytes,
    DownloadCount,
    CreatedAt,
}

#[derive(Iden)]
enum CreditsTransactions {
    Table,
    Id,
    UserId,
    ListingId,
    TransactionType,
    Amount,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum AuthorStorefronts {
    Table,
    Id,
    UserId,
    StoreSlug,
    StoreName,
    CreatedAt,
}

#[derive(Iden)]
enum StorefrontSupportRequests {
    Table,
    Id,
    StorefrontId,
    UserId,
    SoftwareName,
    StoreName,
    WelcomeMessage,
    Status,
    DisableReason,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Settings {
    Table,
    Key,
    Value,
}

fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LayoutConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LayoutConfigs::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LayoutConfigs::UserId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(LayoutConfigs::IsLocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(LayoutConfigs::LayoutData).text().not_null())
                    .col(
                        ColumnDef::new(LayoutConfigs::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LayoutConfigs::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-layout_configs-user_id")
                    .table(LayoutConfigs::Table)
                    .col(LayoutConfigs::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_column(Users::Id))
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(
                        ColumnDef::new(Users::CreditsBalance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Users::CreditsBalance).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PackListings::Table)
                    .if_not_exists()
                    .col(id_column(PackListings::Id))
                    .col(ColumnDef::new(PackListings::AuthorId).integer().not_null())
                    .col(ColumnDef::new(PackListings::Name).string().not_null())
                    .col(ColumnDef::new(PackListings::PricingMode).string().not_null())
                    .col(
                        ColumnDef::new(PackListings::CreditsPrice)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PackListings::Status)
                            .string()
                            .not_null()
                            .default("published"),
                    )
                    .col(ColumnDef::new(PackListings::PayloadRef).string())
                    .col(
                        ColumnDef::new(PackListings::PayloadBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PackListings::DownloadCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PackListings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pack_listings-author_id")
                            .from(PackListings::Table, PackListings::AuthorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditsTransactions::Table)
                    .if_not_exists()
                    .col(id_column(CreditsTransactions::Id))
                    .col(
                        ColumnDef::new(CreditsTransactions::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditsTransactions::ListingId).integer())
                    .col(
                        ColumnDef::new(CreditsTransactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditsTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditsTransactions::Description).string())
                    .col(
                        ColumnDef::new(CreditsTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-credits_transactions-user_id")
                            .from(CreditsTransactions::Table, CreditsTransactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-credits_transactions-listing_id")
                            .from(CreditsTransactions::Table, CreditsTransactions::ListingId)
                            .to(PackListings::Table, PackListings::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-credits_transactions-user_id")
                    .table(CreditsTransactions::Table)
                    .col(CreditsTransactions::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthorStorefronts::Table)
                    .if_not_exists()
                    .col(id_column(AuthorStorefronts::Id))
                    .col(
                        ColumnDef::new(AuthorStorefronts::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorStorefronts::StoreSlug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AuthorStorefronts::StoreName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthorStorefronts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-author_storefronts-user_id")
                            .from(AuthorStorefronts::Table, AuthorStorefronts::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StorefrontSupportRequests::Table)
                    .if_not_exists()
                    .col(id_column(StorefrontSupportRequests::Id))
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::StorefrontId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::SoftwareName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::StoreName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::WelcomeMessage)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(StorefrontSupportRequests::DisableReason).string())
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::ReviewedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StorefrontSupportRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-support_requests-storefront_id")
                            .from(
                                StorefrontSupportRequests::Table,
                                StorefrontSupportRequests::StorefrontId,
                            )
                            .to(AuthorStorefronts::Table, AuthorStorefronts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-support_requests-user_id")
                            .from(
                                StorefrontSupportRequests::Table,
                                StorefrontSupportRequests::UserId,
                            )
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-support_requests-status-created_at")
                    .table(StorefrontSupportRequests::Table)
                    .col(StorefrontSupportRequests::Status)
                    .col(StorefrontSupportRequests::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(StorefrontSupportRequests::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AuthorStorefronts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(CreditsTransactions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(PackListings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LayoutConfigs::Table).if_exists().to_owned())
            .await
    }
}
