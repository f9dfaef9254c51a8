use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_users_table::Migration),
            Box::new(m20240501_000002_create_catalog_tables::Migration),
            Box::new(m20240501_000003_create_variant_tables::Migration),
            Box::new(m20240501_000004_create_engagement_tables::Migration),
            Box::new(m20240501_000005_create_order_tables::Migration),
            Box::new(m20240501_000006_create_promo_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240501_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000001_create_users_table"
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
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Username).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string().null())
                        .col(ColumnDef::new(Users::LastName).string().null())
                        .col(ColumnDef::new(Users::Address).string().null())
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::IsStaff)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsSuperuser)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::DateJoined)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::LastLogin)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_username")
                        .table(Users::Table)
                        .col(Users::Username)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
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
        Username,
        Email,
        PasswordHash,
        FirstName,
        LastName,
        Address,
        Phone,
        IsActive,
        IsStaff,
        IsSuperuser,
        DateJoined,
        LastLogin,
    }
}

mod m20240501_000002_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TechTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TechTypes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(TechTypes::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tech_types_name")
                        .table(TechTypes::Table)
                        .col(TechTypes::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::ParentId).big_integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_categories_parent_id")
                                .from(Categories::Table, Categories::ParentId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Brand).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::TechTypeId).big_integer().not_null())
                        .col(ColumnDef::new(Products::InstructionManual).string().null())
                        .col(ColumnDef::new(Products::ManufacturerUrl).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_tech_type_id")
                                .from(Products::Table, Products::TechTypeId)
                                .to(TechTypes::Table, TechTypes::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_tech_type_id")
                        .table(Products::Table)
                        .col(Products::TechTypeId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_is_active")
                        .table(Products::Table)
                        .col(Products::IsActive)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_created_at")
                        .table(Products::Table)
                        .col(Products::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductCategories::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductCategories::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductCategories::CategoryId)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_categories_product_id")
                                .from(ProductCategories::Table, ProductCategories::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_categories_category_id")
                                .from(ProductCategories::Table, ProductCategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_categories_pair")
                        .table(ProductCategories::Table)
                        .col(ProductCategories::ProductId)
                        .col(ProductCategories::CategoryId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSpecifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductSpecifications::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductSpecifications::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductSpecifications::Name)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductSpecifications::Value)
                                .string()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_specifications_product_id")
                                .from(
                                    ProductSpecifications::Table,
                                    ProductSpecifications::ProductId,
                                )
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_specifications_pair")
                        .table(ProductSpecifications::Table)
                        .col(ProductSpecifications::ProductId)
                        .col(ProductSpecifications::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductSpecifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TechTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TechTypes {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        Name,
        Description,
        ParentId,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Description,
        Brand,
        IsActive,
        CreatedAt,
        TechTypeId,
        InstructionManual,
        ManufacturerUrl,
    }

    #[derive(DeriveIden)]
    enum ProductCategories {
        Table,
        Id,
        ProductId,
        CategoryId,
    }

    #[derive(DeriveIden)]
    enum ProductSpecifications {
        Table,
        Id,
        ProductId,
        Name,
        Value,
    }
}

mod m20240501_000003_create_variant_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240501_000002_create_catalog_tables::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000003_create_variant_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Colors::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Colors::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Colors::Name).string().not_null())
                        .col(
                            ColumnDef::new(Colors::HexCode)
                                .string_len(7)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_colors_name")
                        .table(Colors::Table)
                        .col(Colors::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_colors_hex_code")
                        .table(Colors::Table)
                        .col(Colors::HexCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sizes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sizes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Sizes::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sizes_name")
                        .table(Sizes::Table)
                        .col(Sizes::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ColorId).big_integer().null())
                        .col(ColumnDef::new(ProductVariants::SizeId).big_integer().null())
                        .col(
                            ColumnDef::new(ProductVariants::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::Price)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::Sku).string().not_null())
                        .col(ColumnDef::new(ProductVariants::Image).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_product_id")
                                .from(ProductVariants::Table, ProductVariants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_color_id")
                                .from(ProductVariants::Table, ProductVariants::ColorId)
                                .to(Colors::Table, Colors::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_size_id")
                                .from(ProductVariants::Table, ProductVariants::SizeId)
                                .to(Sizes::Table, Sizes::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_sku")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_triple")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .col(ProductVariants::ColorId)
                        .col(ProductVariants::SizeId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sizes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Colors::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Colors {
        Table,
        Id,
        Name,
        HexCode,
    }

    #[derive(DeriveIden)]
    enum Sizes {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductVariants {
        Table,
        Id,
        ProductId,
        ColorId,
        SizeId,
        StockQuantity,
        Price,
        Sku,
        Image,
    }
}

mod m20240501_000004_create_engagement_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240501_000001_create_users_table::Users;
    use super::m20240501_000002_create_catalog_tables::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000004_create_engagement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reviews::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Reviews::UserId).big_integer().not_null())
                        .col(ColumnDef::new(Reviews::ProductId).big_integer().not_null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text().not_null())
                        .col(
                            ColumnDef::new(Reviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reviews::IsModerated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_user_id")
                                .from(Reviews::Table, Reviews::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reviews_product_id")
                                .from(Reviews::Table, Reviews::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_pair")
                        .table(Reviews::Table)
                        .col(Reviews::UserId)
                        .col(Reviews::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_product_id")
                        .table(Reviews::Table)
                        .col(Reviews::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Favorites::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Favorites::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Favorites::UserId).big_integer().not_null())
                        .col(ColumnDef::new(Favorites::ProductId).big_integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_favorites_user_id")
                                .from(Favorites::Table, Favorites::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_favorites_product_id")
                                .from(Favorites::Table, Favorites::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_favorites_pair")
                        .table(Favorites::Table)
                        .col(Favorites::UserId)
                        .col(Favorites::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Favorites::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        Id,
        UserId,
        ProductId,
        Rating,
        Comment,
        CreatedAt,
        IsModerated,
    }

    #[derive(DeriveIden)]
    enum Favorites {
        Table,
        Id,
        UserId,
        ProductId,
    }
}

mod m20240501_000005_create_order_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240501_000001_create_users_table::Users;
    use super::m20240501_000003_create_variant_tables::ProductVariants;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000005_create_order_tables"
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
                        .col(
                            ColumnDef::new(Orders::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).big_integer().null())
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::ShippingAddress).text().not_null())
                        .col(
                            ColumnDef::new(Orders::PaymentMethod)
                                .string_len(50)
                                .not_null()
                                .default("card_online"),
                        )
                        .col(ColumnDef::new(Orders::TrackingNumber).string().null())
                        .col(ColumnDef::new(Orders::GuestEmail).string().null())
                        .col(ColumnDef::new(Orders::GuestPhone).string().null())
                        .col(ColumnDef::new(Orders::GuestName).string().null())
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user_id")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_date")
                        .table(Orders::Table)
                        .col(Orders::OrderDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::VariantId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(OrderItems::PriceAtTime)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_variant_id")
                                .from(OrderItems::Table, OrderItems::VariantId)
                                .to(ProductVariants::Table, ProductVariants::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_variant_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::VariantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        OrderDate,
        Status,
        TotalPrice,
        ShippingAddress,
        PaymentMethod,
        TrackingNumber,
        GuestEmail,
        GuestPhone,
        GuestName,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        VariantId,
        Quantity,
        PriceAtTime,
    }
}

mod m20240501_000006_create_promo_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240501_000002_create_catalog_tables::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000006_create_promo_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Promos::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Promos::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Promos::Title).string().not_null())
                        .col(ColumnDef::new(Promos::Description).text().null())
                        .col(
                            ColumnDef::new(Promos::DiscountPercent)
                                .decimal_len(5, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Promos::StartDate).date().not_null())
                        .col(ColumnDef::new(Promos::EndDate).date().not_null())
                        .col(
                            ColumnDef::new(Promos::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_promos_start_date")
                        .table(Promos::Table)
                        .col(Promos::StartDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PromoProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PromoProducts::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PromoProducts::PromoId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromoProducts::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promo_products_promo_id")
                                .from(PromoProducts::Table, PromoProducts::PromoId)
                                .to(Promos::Table, Promos::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promo_products_product_id")
                                .from(PromoProducts::Table, PromoProducts::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_promo_products_pair")
                        .table(PromoProducts::Table)
                        .col(PromoProducts::PromoId)
                        .col(PromoProducts::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PromoProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Promos::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Promos {
        Table,
        Id,
        Title,
        Description,
        DiscountPercent,
        StartDate,
        EndDate,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum PromoProducts {
        Table,
        Id,
        PromoId,
        ProductId,
    }
}
