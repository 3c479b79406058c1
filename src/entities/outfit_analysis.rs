use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One outfit submission and, once analysed, its critique.
///
/// `rating`, `suggestions`, `analysis_details` and `processing_time` are either
/// all `None` (pending) or all `Some` (completed).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "outfit_analysis")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip_deserializing)]
    pub id: Uuid,
    pub image: String,
    pub occasion: String,
    pub gender: String,
    pub age: i32,
    #[sea_orm(column_type = "Double", nullable)]
    pub rating: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub suggestions: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub analysis_details: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Double", nullable)]
    pub processing_time: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_completed(&self) -> bool {
        self.rating.is_some()
    }

    /// e.g. `office - female - 2026-01-30 14:05`
    pub fn label(&self) -> String {
        format!(
            "{} - {} - {}",
            self.occasion,
            self.gender,
            self.created_at.format("%Y-%m-%d %H:%M")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not one of the available choices")]
pub struct InvalidChoice {
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Office,
    Date,
    College,
    Casual,
    Formal,
    Party,
}

impl Occasion {
    pub const ALL: [Occasion; 6] = [
        Occasion::Office,
        Occasion::Date,
        Occasion::College,
        Occasion::Casual,
        Occasion::Formal,
        Occasion::Party,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Occasion::Office => "office",
            Occasion::Date => "date",
            Occasion::College => "college",
            Occasion::Casual => "casual",
            Occasion::Formal => "formal",
            Occasion::Party => "party",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Occasion::Office => "Office",
            Occasion::Date => "Date",
            Occasion::College => "College",
            Occasion::Casual => "Casual",
            Occasion::Formal => "Formal Event",
            Occasion::Party => "Party",
        }
    }
}

impl FromStr for Occasion {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Occasion::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| InvalidChoice {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Occasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| InvalidChoice {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
