//! Read-only queries over stored analyses.

use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{outfit_analysis, Gender, Occasion, OutfitAnalysis};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<Option<outfit_analysis::Model>, DbErr> {
    OutfitAnalysis::find_by_id(id).one(db).await
}

/// Filters for the admin listing. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    pub occasion: Option<Occasion>,
    pub gender: Option<Gender>,
    pub created_after: Option<DateTime<FixedOffset>>,
    pub created_before: Option<DateTime<FixedOffset>>,
    /// Case-insensitive substring match on the suggestions text.
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl ListQuery {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(occasion) = self.occasion {
            cond = cond.add(outfit_analysis::Column::Occasion.eq(occasion.as_str()));
        }
        if let Some(gender) = self.gender {
            cond = cond.add(outfit_analysis::Column::Gender.eq(gender.as_str()));
        }
        if let Some(after) = self.created_after {
            cond = cond.add(outfit_analysis::Column::CreatedAt.gte(after));
        }
        if let Some(before) = self.created_before {
            cond = cond.add(outfit_analysis::Column::CreatedAt.lte(before));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col(outfit_analysis::Column::Suggestions)))
                    .like(LikeExpr::new(like_pattern(search)).escape('\\')),
            );
        }
        cond
    }
}

/// `%needle%` for a lowercased LIKE, with the user's own wildcards escaped.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Newest first. A page past the end returns the last page.
pub async fn list(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> Result<Page<outfit_analysis::Model>, DbErr> {
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

    let paginator = OutfitAnalysis::find()
        .filter(query.condition())
        .order_by_desc(outfit_analysis::Column::CreatedAt)
        .order_by_desc(outfit_analysis::Column::Id)
        .paginate(db, per_page);

    let counts = paginator.num_items_and_pages().await?;
    let page = query.page.clamp(1, counts.number_of_pages.max(1));
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        total: counts.number_of_items,
        page,
        per_page,
        total_pages: counts.number_of_pages,
    })
}
