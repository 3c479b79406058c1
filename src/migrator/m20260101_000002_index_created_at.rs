use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_outfit_analysis::OutfitAnalysis;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEX_NAME: &str = "idx-outfit_analysis-created_at";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Listings are always newest-first
        manager
            .create_index(
                Index::create()
                    .name(INDEX_NAME)
                    .table(OutfitAnalysis::Table)
                    .col(OutfitAnalysis::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(INDEX_NAME)
                    .table(OutfitAnalysis::Table)
                    .to_owned(),
            )
            .await
    }
}
