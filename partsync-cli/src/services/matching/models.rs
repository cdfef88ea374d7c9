use serde::Serialize;

/// How a column suggestion was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Blank,    // Empty input, first permitted column offered
    Segment,  // Prefix/suffix candidate above threshold
    Fallback, // Best similarity over all columns
    NoMatch,  // Nothing scored above zero, input echoed back
}

impl SuggestionKind {
    /// Get display label for suggestion kind
    pub fn label(&self) -> &'static str {
        match self {
            SuggestionKind::Blank => "[Default]",
            SuggestionKind::Segment => "[Segment]",
            SuggestionKind::Fallback => "[Similarity]",
            SuggestionKind::NoMatch => "[No Match]",
        }
    }
}

/// A proposed lookup column; always overridable by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSuggestion {
    pub column: String,
    pub confidence: f64,
    pub kind: SuggestionKind,
}

impl ColumnSuggestion {
    pub fn new(column: impl Into<String>, confidence: f64, kind: SuggestionKind) -> Self {
        Self {
            column: column.into(),
            confidence,
            kind,
        }
    }

    /// (column, confidence)
    pub fn into_pair(self) -> (String, f64) {
        (self.column, self.confidence)
    }
}
