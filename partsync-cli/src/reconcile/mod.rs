//! Reconciliation engine: normalization, classification and master updates

pub mod classify;
pub mod normalize;
pub mod pipeline;
pub mod update;

pub use classify::{
    ActivationStatus, ClassificationStats, LookupMap, STATUS_MISSING_KEY, STATUS_NOT_FOUND,
    STATUS_ZERO, classify,
};
pub use normalize::{
    GenericCleaningStats, GenericOptions, MasterCleaningStats, MasterInsights, clean_text,
    flag_retired_parts, normalize_column_name, normalize_generic, normalize_key, normalize_master,
    reposition_key,
};
pub use pipeline::{ReconcileSession, ReconciliationReport};
pub use update::{DuplicateEntry, MutationAction, RecordDiff, UpdatePolicy, UpdateStats, apply_updates};
