// Lookup column suggestion
//
// Proposes which master column a free-text name refers to. The result is
// advisory; callers always pass the lookup column explicitly downstream.

pub mod core;
pub mod models;

// Re-export commonly used types
pub use core::{
    DEFAULT_THRESHOLD, filter_columns, permitted_columns, suggest_column,
    suggest_column_with_threshold,
};
pub use models::{ColumnSuggestion, SuggestionKind};
