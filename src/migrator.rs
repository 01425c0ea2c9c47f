use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_products_table::Migration),
            Box::new(m20250101_000002_create_inventory_table::Migration),
            Box::new(m20250101_000003_create_orders_table::Migration),
            Box::new(m20250101_000004_create_order_items_table::Migration),
            Box::new(m20250101_000005_create_pre_releases_table::Migration),
            Box::new(m20250101_000006_create_pre_release_items_table::Migration),
            Box::new(m20250101_000007_create_customers_table::Migration),
            Box::new(m20250101_000008_create_users_table::Migration),
            Box::new(m20250101_000009_create_refresh_tokens_table::Migration),
        ]
    }
}

mod m20250101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::UnitType).string_len(32).null())
                        .col(
                            ColumnDef::new(Products::ProductCode)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(Products::Status)
                                .string_len(16)
                                .not_null()
                                .default("ACTIVE"),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_tenant_id")
                        .table(Products::Table)
                        .col(Products::TenantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        TenantId,
        Name,
        Description,
        Price,
        UnitType,
        ProductCode,
        ImageUrl,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_inventory_table {
    use super::m20250101_000001_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_inventory_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // The CHECK is a backstop only; the ledger validates before writing.
            manager
                .create_table(
                    Table::create()
                        .table(Inventory::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Inventory::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Inventory::ProductId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Inventory::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(Inventory::Quantity)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Inventory::Quantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Inventory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Inventory::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_product")
                                .from(Inventory::Table, Inventory::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_tenant_id")
                        .table(Inventory::Table)
                        .col(Inventory::TenantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Inventory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Inventory {
        Table,
        Id,
        ProductId,
        TenantId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Orders::Discount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_tenant_created_at")
                        .table(Orders::Table)
                        .col(Orders::TenantId)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        TenantId,
        UserId,
        Subtotal,
        Discount,
        Total,
        PaymentMethod,
        Status,
        CreatedAt,
    }
}

mod m20250101_000004_create_order_items_table {
    use super::m20250101_000001_create_products_table::Products;
    use super::m20250101_000003_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_line")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .col(OrderItems::LineNo)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        LineNo,
        ProductId,
        Quantity,
        UnitPrice,
        CreatedAt,
    }
}

mod m20250101_000005_create_pre_releases_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_pre_releases_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PreReleases::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PreReleases::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PreReleases::TenantId).uuid().not_null())
                        .col(ColumnDef::new(PreReleases::UserId).uuid().not_null())
                        .col(ColumnDef::new(PreReleases::StoreId).uuid().not_null())
                        .col(ColumnDef::new(PreReleases::Remarks).text().null())
                        .col(ColumnDef::new(PreReleases::PhotoUrl).string().null())
                        .col(ColumnDef::new(PreReleases::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(PreReleases::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pre_releases_user_id")
                        .table(PreReleases::Table)
                        .col(PreReleases::TenantId)
                        .col(PreReleases::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PreReleases::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PreReleases {
        Table,
        Id,
        TenantId,
        UserId,
        StoreId,
        Remarks,
        PhotoUrl,
        Status,
        CreatedAt,
    }
}

mod m20250101_000006_create_pre_release_items_table {
    use super::m20250101_000001_create_products_table::Products;
    use super::m20250101_000005_create_pre_releases_table::PreReleases;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_pre_release_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PreReleaseItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PreReleaseItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PreReleaseItems::PreReleaseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PreReleaseItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(PreReleaseItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(PreReleaseItems::Quantity).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pre_release_items_pre_release")
                                .from(PreReleaseItems::Table, PreReleaseItems::PreReleaseId)
                                .to(PreReleases::Table, PreReleases::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pre_release_items_product")
                                .from(PreReleaseItems::Table, PreReleaseItems::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pre_release_items_pre_release_line")
                        .table(PreReleaseItems::Table)
                        .col(PreReleaseItems::PreReleaseId)
                        .col(PreReleaseItems::LineNo)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PreReleaseItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PreReleaseItems {
        Table,
        Id,
        PreReleaseId,
        LineNo,
        ProductId,
        Quantity,
    }
}

mod m20250101_000007_create_customers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Customers::SystemType).string_len(64).not_null())
                        .col(ColumnDef::new(Customers::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Customers::Theme).string_len(32).not_null())
                        .col(ColumnDef::new(Customers::LogoUrl).string().null())
                        .col(ColumnDef::new(Customers::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Name,
        SystemType,
        Status,
        Theme,
        LogoUrl,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000008_create_users_table {
    use super::m20250101_000007_create_customers_table::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000008_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::CustomerId).uuid().null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                        .col(ColumnDef::new(Users::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Users::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_customer")
                                .from(Users::Table, Users::CustomerId)
                                .to(Customers::Table, Customers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_customer_id")
                        .table(Users::Table)
                        .col(Users::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        CustomerId,
        Username,
        Email,
        PasswordHash,
        Role,
        Status,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000009_create_refresh_tokens_table {
    use super::m20250101_000008_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000009_create_refresh_tokens_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RefreshTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RefreshTokens::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RefreshTokens::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(RefreshTokens::TokenId)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(RefreshTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RefreshTokens::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RefreshTokens::Revoked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_refresh_tokens_user")
                                .from(RefreshTokens::Table, RefreshTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_refresh_tokens_user_id")
                        .table(RefreshTokens::Table)
                        .col(RefreshTokens::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RefreshTokens::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum RefreshTokens {
        Table,
        Id,
        UserId,
        TokenId,
        CreatedAt,
        ExpiresAt,
        Revoked,
    }
}
