pub mod outfit_analysis;

pub use outfit_analysis::Entity as OutfitAnalysis;
pub use outfit_analysis::{Gender, Occasion};
