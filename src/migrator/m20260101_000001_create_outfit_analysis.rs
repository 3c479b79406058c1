use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OutfitAnalysis::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OutfitAnalysis::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OutfitAnalysis::Image).string().not_null())
                    .col(ColumnDef::new(OutfitAnalysis::Occasion).string_len(20).not_null())
                    .col(ColumnDef::new(OutfitAnalysis::Gender).string_len(10).not_null())
                    .col(ColumnDef::new(OutfitAnalysis::Age).integer().not_null())
                    // Outputs stay NULL while the analysis is pending
                    .col(ColumnDef::new(OutfitAnalysis::Rating).double())
                    .col(ColumnDef::new(OutfitAnalysis::Suggestions).text())
                    .col(ColumnDef::new(OutfitAnalysis::AnalysisDetails).json())
                    .col(
                        ColumnDef::new(OutfitAnalysis::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(OutfitAnalysis::ProcessingTime).double())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OutfitAnalysis::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum OutfitAnalysis {
    Table,
    Id,
    Image,
    Occasion,
    Gender,
    Age,
    Rating,
    Suggestions,
    AnalysisDetails,
    CreatedAt,
    ProcessingTime,
}
