use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241201_000001_create_reference_tables::Migration),
            Box::new(m20241201_000002_create_packaging_tables::Migration),
            Box::new(m20241201_000003_create_inventory_tables::Migration),
            Box::new(m20241201_000004_create_shipment_tables::Migration),
            Box::new(m20241201_000005_create_trace_and_idempotency_tables::Migration),
        ]
    }
}

mod m20241201_000001_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241201_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Definitions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Definitions::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Definitions::DefType).string().not_null())
                        .col(ColumnDef::new(Definitions::DefValue).string().not_null())
                        .col(ColumnDef::new(Definitions::Description).string().null())
                        .col(
                            ColumnDef::new(Definitions::CreatedAt)
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
                        .name("uq_definitions_type_value")
                        .table(Definitions::Table)
                        .col(Definitions::DefType)
                        .col(Definitions::DefValue)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Locations::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::LocationType).string().not_null())
                        .col(ColumnDef::new(Locations::Category).string().null())
                        .col(ColumnDef::new(Locations::ParentId).uuid().null())
                        .col(ColumnDef::new(Locations::AddressLine1).string().null())
                        .col(ColumnDef::new(Locations::City).string().null())
                        .col(ColumnDef::new(Locations::State).string().null())
                        .col(ColumnDef::new(Locations::Country).string().null())
                        .col(ColumnDef::new(Locations::Latitude).double().null())
                        .col(ColumnDef::new(Locations::Longitude).double().null())
                        .col(ColumnDef::new(Locations::CapacityVolume).double().null())
                        .col(ColumnDef::new(Locations::CapacityWeight).double().null())
                        .col(ColumnDef::new(Locations::Gln).string().null())
                        .col(ColumnDef::new(Locations::RfidReaderId).string().null())
                        .col(
                            ColumnDef::new(Locations::IsQuarantine)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Locations::Status).string().not_null())
                        .col(
                            ColumnDef::new(Locations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Locations::UpdatedAt)
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
                        .name("idx_locations_parent_id")
                        .table(Locations::Table)
                        .col(Locations::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Materials::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Materials::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::Description).text().null())
                        .col(ColumnDef::new(Materials::MaterialType).string().null())
                        .col(ColumnDef::new(Materials::Category).string().null())
                        .col(ColumnDef::new(Materials::BaseUom).string().not_null())
                        .col(
                            ColumnDef::new(Materials::IsBatchManaged)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Materials::IsSerialManaged)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Materials::ShelfLifeDays).integer().null())
                        .col(ColumnDef::new(Materials::MinStock).double().null())
                        .col(ColumnDef::new(Materials::MaxStock).double().null())
                        .col(ColumnDef::new(Materials::GrossWeight).double().null())
                        .col(ColumnDef::new(Materials::NetWeight).double().null())
                        .col(ColumnDef::new(Materials::WeightUom).string().null())
                        .col(ColumnDef::new(Materials::Length).double().null())
                        .col(ColumnDef::new(Materials::Width).double().null())
                        .col(ColumnDef::new(Materials::Height).double().null())
                        .col(ColumnDef::new(Materials::DimensionUom).string().null())
                        .col(
                            ColumnDef::new(Materials::IsHazmat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Materials::HazmatClass).string().null())
                        .col(ColumnDef::new(Materials::UnNumber).string().null())
                        .col(ColumnDef::new(Materials::Status).string().not_null())
                        .col(
                            ColumnDef::new(Materials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Definitions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Definitions {
        Table,
        Id,
        DefType,
        DefValue,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        Code,
        Name,
        LocationType,
        Category,
        ParentId,
        AddressLine1,
        City,
        State,
        Country,
        Latitude,
        Longitude,
        CapacityVolume,
        CapacityWeight,
        Gln,
        RfidReaderId,
        IsQuarantine,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Materials {
        Table,
        Id,
        Code,
        Name,
        Description,
        MaterialType,
        Category,
        BaseUom,
        IsBatchManaged,
        IsSerialManaged,
        ShelfLifeDays,
        MinStock,
        MaxStock,
        GrossWeight,
        NetWeight,
        WeightUom,
        Length,
        Width,
        Height,
        DimensionUom,
        IsHazmat,
        HazmatClass,
        UnNumber,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20241201_000002_create_packaging_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241201_000002_create_packaging_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LabelTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LabelTemplates::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(LabelTemplates::Name).string().not_null())
                        .col(ColumnDef::new(LabelTemplates::LevelName).string().null())
                        .col(ColumnDef::new(LabelTemplates::WidthMm).double().not_null())
                        .col(ColumnDef::new(LabelTemplates::HeightMm).double().not_null())
                        .col(ColumnDef::new(LabelTemplates::Status).string().not_null())
                        .col(ColumnDef::new(LabelTemplates::CanvasDesign).json().not_null())
                        .col(
                            ColumnDef::new(LabelTemplates::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LabelTemplates::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PackagingHierarchies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PackagingHierarchies::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PackagingHierarchies::Name)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PackagingHierarchies::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PackagingLevels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PackagingLevels::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PackagingLevels::HierarchyId).uuid().not_null())
                        .col(ColumnDef::new(PackagingLevels::LevelName).string().not_null())
                        .col(
                            ColumnDef::new(PackagingLevels::LevelOrder)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PackagingLevels::Capacity).integer().null())
                        .col(ColumnDef::new(PackagingLevels::LabelTemplateId).uuid().null())
                        .col(
                            ColumnDef::new(PackagingLevels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PackagingLevels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_packaging_levels_hierarchy")
                                .from(PackagingLevels::Table, PackagingLevels::HierarchyId)
                                .to(PackagingHierarchies::Table, PackagingHierarchies::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_packaging_levels_template")
                                .from(PackagingLevels::Table, PackagingLevels::LabelTemplateId)
                                .to(LabelTemplates::Table, LabelTemplates::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_packaging_levels_hierarchy_order")
                        .table(PackagingLevels::Table)
                        .col(PackagingLevels::HierarchyId)
                        .col(PackagingLevels::LevelOrder)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PackagingLevels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PackagingHierarchies::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LabelTemplates::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LabelTemplates {
        Table,
        Id,
        Name,
        LevelName,
        WidthMm,
        HeightMm,
        Status,
        CanvasDesign,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PackagingHierarchies {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PackagingLevels {
        Table,
        Id,
        HierarchyId,
        LevelName,
        LevelOrder,
        Capacity,
        LabelTemplateId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20241201_000003_create_inventory_tables {

    use super::m20241201_000001_create_reference_tables::{Locations, Materials};
    use super::m20241201_000002_create_packaging_tables::PackagingLevels;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241201_000003_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::MaterialId).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::SerialNumber)
                                .string()
                                .null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::BatchNumber).string().null())
                        .col(ColumnDef::new(InventoryItems::Status).string().not_null())
                        .col(ColumnDef::new(InventoryItems::LocationId).uuid().null())
                        .col(
                            ColumnDef::new(InventoryItems::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_items_material")
                                .from(InventoryItems::Table, InventoryItems::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_items_location")
                                .from(InventoryItems::Table, InventoryItems::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_batch")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::BatchNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Containers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Containers::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Containers::SerialNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Containers::ContainerType).string().not_null())
                        .col(ColumnDef::new(Containers::Capacity).integer().null())
                        .col(
                            ColumnDef::new(Containers::CurrentCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Containers::Status).string().not_null())
                        .col(ColumnDef::new(Containers::PackagingLevelId).uuid().null())
                        .col(ColumnDef::new(Containers::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Containers::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Containers::SealedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Containers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Containers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Containers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_containers_packaging_level")
                                .from(Containers::Table, Containers::PackagingLevelId)
                                .to(PackagingLevels::Table, PackagingLevels::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_containers_location")
                                .from(Containers::Table, Containers::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Aggregations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Aggregations::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Aggregations::ContainerId).uuid().not_null())
                        .col(ColumnDef::new(Aggregations::ChildType).string().not_null())
                        .col(ColumnDef::new(Aggregations::ChildId).uuid().not_null())
                        .col(ColumnDef::new(Aggregations::AggregatedBy).string().null())
                        .col(
                            ColumnDef::new(Aggregations::AggregatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_aggregations_container")
                                .from(Aggregations::Table, Aggregations::ContainerId)
                                .to(Containers::Table, Containers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One parent per child: the authoritative duplicate-pack guard.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_aggregations_child")
                        .table(Aggregations::Table)
                        .col(Aggregations::ChildType)
                        .col(Aggregations::ChildId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_aggregations_container_id")
                        .table(Aggregations::Table)
                        .col(Aggregations::ContainerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Aggregations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Containers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        MaterialId,
        SerialNumber,
        BatchNumber,
        Status,
        LocationId,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Containers {
        Table,
        Id,
        SerialNumber,
        ContainerType,
        Capacity,
        CurrentCount,
        Status,
        PackagingLevelId,
        LocationId,
        CreatedBy,
        SealedAt,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Aggregations {
        Table,
        Id,
        ContainerId,
        ChildType,
        ChildId,
        AggregatedBy,
        AggregatedAt,
    }
}

mod m20241201_000004_create_shipment_tables {

    use sea_orm_migration::prelude::*;

    use super::m20241201_000001_create_reference_tables::Locations;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241201_000004_create_shipment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Shipments::ShipmentNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Shipments::OriginLocationId).uuid().not_null())
                        .col(
                            ColumnDef::new(Shipments::DestinationLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::Carrier).string().null())
                        .col(ColumnDef::new(Shipments::ExpectedDeliveryDate).date().null())
                        .col(ColumnDef::new(Shipments::Notes).text().null())
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(ColumnDef::new(Shipments::VehicleNumber).string().null())
                        .col(ColumnDef::new(Shipments::DriverName).string().null())
                        .col(ColumnDef::new(Shipments::DriverContact).string().null())
                        .col(
                            ColumnDef::new(Shipments::DispatchedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::ReceivedBy).string().null())
                        .col(ColumnDef::new(Shipments::CreatedBy).string().null())
                        .col(
                            ColumnDef::new(Shipments::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_origin_location")
                                .from(Shipments::Table, Shipments::OriginLocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipments_destination_location")
                                .from(Shipments::Table, Shipments::DestinationLocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_status")
                        .table(Shipments::Table)
                        .col(Shipments::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ShipmentItems::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(ShipmentItems::ItemType).string().not_null())
                        .col(
                            ColumnDef::new(ShipmentItems::ItemId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ShipmentItems::Status).string().not_null())
                        .col(
                            ColumnDef::new(ShipmentItems::AddedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipment_items_shipment")
                                .from(ShipmentItems::Table, ShipmentItems::ShipmentId)
                                .to(Shipments::Table, Shipments::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        ShipmentNumber,
        OriginLocationId,
        DestinationLocationId,
        Carrier,
        ExpectedDeliveryDate,
        Notes,
        Status,
        VehicleNumber,
        DriverName,
        DriverContact,
        DispatchedAt,
        DeliveredAt,
        ReceivedBy,
        CreatedBy,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ShipmentItems {
        Table,
        Id,
        ShipmentId,
        ItemType,
        ItemId,
        Status,
        AddedAt,
    }
}

mod m20241201_000005_create_trace_and_idempotency_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241201_000005_create_trace_and_idempotency_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TraceEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TraceEvents::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(TraceEvents::SubjectType).string().not_null())
                        .col(ColumnDef::new(TraceEvents::SubjectId).uuid().not_null())
                        .col(ColumnDef::new(TraceEvents::SubjectSerial).string().null())
                        .col(ColumnDef::new(TraceEvents::EventType).string().not_null())
                        .col(
                            ColumnDef::new(TraceEvents::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TraceEvents::Location).string().null())
                        .col(ColumnDef::new(TraceEvents::Actor).string().null())
                        .col(ColumnDef::new(TraceEvents::Notes).text().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_trace_events_subject")
                        .table(TraceEvents::Table)
                        .col(TraceEvents::SubjectId)
                        .col(TraceEvents::Timestamp)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(IdempotencyKeys::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(IdempotencyKeys::Key)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::RequestFingerprint)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::StatusCode)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(IdempotencyKeys::ResponseBody).text().not_null())
                        .col(ColumnDef::new(IdempotencyKeys::ContentType).string().null())
                        .col(
                            ColumnDef::new(IdempotencyKeys::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(IdempotencyKeys::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TraceEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TraceEvents {
        Table,
        Id,
        SubjectType,
        SubjectId,
        SubjectSerial,
        EventType,
        Timestamp,
        Location,
        Actor,
        Notes,
    }

    #[derive(DeriveIden)]
    enum IdempotencyKeys {
        Table,
        Key,
        RequestFingerprint,
        StatusCode,
        ResponseBody,
        ContentType,
        Completed,
        CreatedAt,
    }
}
