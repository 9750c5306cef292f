use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PgtMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PgtMappings::PgtIou)
                            .string_len(256)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PgtMappings::Pgt).string_len(256).not_null())
                    .col(
                        ColumnDef::new(PgtMappings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cas_pgt_mappings_created_at")
                    .table(PgtMappings::Table)
                    .col(PgtMappings::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PgtMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PgtMappings {
    #[sea_orm(iden = "cas_pgt_mappings")]
    Table,
    PgtIou,
    Pgt,
    CreatedAt,
}
