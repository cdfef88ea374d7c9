//! Part-master reconciliation
//!
//! Normalizes a master parts table and an incoming target table, suggests the
//! lookup column, classifies every target row by activation status and
//! applies the resulting inserts, updates and duplicate flags to a copy of
//! the master.

pub mod config;
pub mod error;
pub mod io;
pub mod reconcile;
pub mod services;
pub mod table;

pub use config::ReconcileConfig;
pub use error::{DataQualityWarning, ReconcileError};
pub use reconcile::{ReconcileSession, ReconciliationReport};
pub use table::{Record, Table, Value};
