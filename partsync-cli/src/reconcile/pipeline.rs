//! One reconciliation session: load, clean, suggest, classify, update
//!
//! Stages must run in order; each stage reads the tables produced by the
//! earlier ones and fails with [`ReconcileError::EmptyInput`] otherwise.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::classify::{ClassificationStats, classify};
use super::normalize::{
    GenericCleaningStats, GenericOptions, MasterCleaningStats, MasterInsights, flag_retired_parts,
    normalize_generic, normalize_master, reposition_key,
};
use super::update::{UpdatePolicy, UpdateStats, apply_updates};
use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::services::matching::{ColumnSuggestion, permitted_columns, suggest_column_with_threshold};
use crate::table::Table;

/// Everything a session produced, ready for JSON or workbook export
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub key_column: String,
    pub lookup_column: Option<String>,
    pub master_cleaning: Option<MasterCleaningStats>,
    pub target_cleaning: Option<GenericCleaningStats>,
    pub insights: Option<MasterInsights>,
    pub suggestion: Option<ColumnSuggestion>,
    pub classification: Option<ClassificationStats>,
    pub update: Option<UpdateStats>,
}

/// Owns the tables of a single reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileSession {
    config: ReconcileConfig,
    run_id: Uuid,
    master: Option<Table>,
    target: Option<Table>,
    classified: Option<Table>,
    updated: Option<Table>,
    lookup_column: Option<String>,
    master_cleaning: Option<MasterCleaningStats>,
    target_cleaning: Option<GenericCleaningStats>,
    insights: Option<MasterInsights>,
    suggestion: Option<ColumnSuggestion>,
    classification: Option<ClassificationStats>,
    update: Option<UpdateStats>,
}

impl ReconcileSession {
    pub fn new(config: ReconcileConfig) -> Self {
        let run_id = Uuid::new_v4();
        log::debug!("Starting reconciliation session {}", run_id);
        Self {
            config,
            run_id,
            master: None,
            target: None,
            classified: None,
            updated: None,
            lookup_column: None,
            master_cleaning: None,
            target_cleaning: None,
            insights: None,
            suggestion: None,
            classification: None,
            update: None,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    fn key_column(&self) -> &str {
        &self.config.keys.key_column
    }

    fn require<'a>(table: &'a Option<Table>, name: &str) -> Result<&'a Table, ReconcileError> {
        table.as_ref().ok_or_else(|| ReconcileError::EmptyInput {
            table: name.to_string(),
        })
    }

    /// Drop everything derived from the previous master or target
    fn reset_classification(&mut self) {
        self.classified = None;
        self.updated = None;
        self.lookup_column = None;
        self.classification = None;
        self.update = None;
    }

    /// Normalize and store the master; clears later stages
    pub fn load_master(&mut self, raw: &Table) -> Result<&MasterCleaningStats, ReconcileError> {
        let (master, stats) = normalize_master(raw, &self.config.keys.key_column, &self.config.keys.aliases)?;
        self.master = Some(master);
        self.insights = None;
        self.suggestion = None;
        self.reset_classification();
        Ok(self.master_cleaning.insert(stats))
    }

    /// Normalize the target and move its key column to the front
    pub fn load_target(&mut self, raw: &Table) -> Result<&GenericCleaningStats, ReconcileError> {
        let options = GenericOptions {
            swap_leading_columns: self.config.normalize.swap_leading_columns,
        };
        let (cleaned, stats) = normalize_generic(raw, options);
        let target = reposition_key(&cleaned, self.key_column());
        target.require_column("target", self.key_column())?;
        self.target = Some(target);
        self.reset_classification();
        Ok(self.target_cleaning.insert(stats))
    }

    pub fn master(&self) -> Option<&Table> {
        self.master.as_ref()
    }

    pub fn target(&self) -> Option<&Table> {
        self.target.as_ref()
    }

    pub fn classified(&self) -> Option<&Table> {
        self.classified.as_ref()
    }

    pub fn updated(&self) -> Option<&Table> {
        self.updated.as_ref()
    }

    /// Lookup column candidates from the master
    pub fn permitted_columns(&self) -> Result<Vec<String>, ReconcileError> {
        let master = Self::require(&self.master, "master")?;
        Ok(permitted_columns(
            master,
            self.config.matching.window_start,
            self.config.matching.window_end,
        ))
    }

    /// Suggest a lookup column for free text and remember the suggestion
    pub fn suggest(&mut self, input: &str) -> Result<&ColumnSuggestion, ReconcileError> {
        let permitted = self.permitted_columns()?;
        let suggestion = suggest_column_with_threshold(input, &permitted, self.config.matching.threshold);
        log::info!(
            "Suggested '{}' for '{}' ({:.2})",
            suggestion.column,
            input,
            suggestion.confidence
        );
        Ok(self.suggestion.insert(suggestion))
    }

    /// Re-mark master rows absent from the target in `lookup_column`
    ///
    /// The master changes, so any earlier classification is discarded.
    pub fn flag_retired(&mut self, lookup_column: &str) -> Result<&MasterInsights, ReconcileError> {
        let master = Self::require(&self.master, "master")?;
        let target = Self::require(&self.target, "target")?;
        let (flagged, insights) = flag_retired_parts(
            master,
            target,
            self.key_column(),
            lookup_column,
            &self.config.markers.excluded,
            &self.config.markers.intermediate,
        )?;
        self.master = Some(flagged);
        self.reset_classification();
        Ok(self.insights.insert(insights))
    }

    pub fn classify(&mut self, lookup_column: &str) -> Result<&ClassificationStats, ReconcileError> {
        let master = Self::require(&self.master, "master")?;
        let target = Self::require(&self.target, "target")?;
        let (classified, stats) = classify(
            master,
            target,
            self.key_column(),
            lookup_column,
            &self.config.keys.status_column,
        )?;
        self.classified = Some(classified);
        self.updated = None;
        self.lookup_column = Some(lookup_column.to_string());
        Ok(self.classification.insert(stats))
    }

    /// Use an already classified target instead of running [`Self::classify`]
    pub fn load_classified(&mut self, classified: Table, lookup_column: &str) -> Result<(), ReconcileError> {
        classified.require_column("target", &self.config.keys.status_column)?;
        classified.require_column("target", self.key_column())?;
        self.classified = Some(classified);
        self.updated = None;
        self.lookup_column = Some(lookup_column.to_string());
        Ok(())
    }

    /// Apply the classified target to the master using the configured markers
    pub fn apply(&mut self) -> Result<&UpdateStats, ReconcileError> {
        let master = Self::require(&self.master, "master")?;
        let classified = Self::require(&self.classified, "classified")?;
        let lookup_column = self.lookup_column.as_deref().ok_or_else(|| ReconcileError::EmptyInput {
            table: "classified".to_string(),
        })?;
        let policy = UpdatePolicy::from(&self.config.markers);
        let (updated, stats) = apply_updates(
            master,
            classified,
            lookup_column,
            self.key_column(),
            &self.config.keys.status_column,
            &policy,
        )?;
        self.updated = Some(updated);
        Ok(self.update.insert(stats))
    }

    pub fn report(&self) -> ReconciliationReport {
        ReconciliationReport {
            run_id: self.run_id,
            generated_at: Utc::now(),
            key_column: self.key_column().to_string(),
            lookup_column: self.lookup_column.clone(),
            master_cleaning: self.master_cleaning.clone(),
            target_cleaning: self.target_cleaning.clone(),
            insights: self.insights.clone(),
            suggestion: self.suggestion.clone(),
            classification: self.classification.clone(),
            update: self.update.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use serde_json::json;

    fn config() -> ReconcileConfig {
        ReconcileConfig::builder()
            .key_column("YAZAKI PN")
            .key_aliases(vec!["YAZAKI_PN".to_string()])
            .build()
    }

    fn raw_master() -> Table {
        Table::from_json_records(
            &["yazaki pn", "J74_V710_B2_PP_YOTK", "DESC"],
            &json!([
                {"yazaki pn": "ab-12", "J74_V710_B2_PP_YOTK": "D", "DESC": "a"},
                {"yazaki pn": "CD34", "J74_V710_B2_PP_YOTK": null, "DESC": "b"},
                {"yazaki pn": null, "J74_V710_B2_PP_YOTK": "X", "DESC": "c"}
            ]),
        )
    }

    fn raw_target() -> Table {
        // Key arrives in the second column and is swapped to the front
        Table::from_json_records(
            &["Desc", "Yazaki PN"],
            &json!([
                {"Desc": "a", "Yazaki PN": "AB12"},
                {"Desc": "b", "Yazaki PN": "CD34"},
                {"Desc": "new", "Yazaki PN": "EF 56"}
            ]),
        )
    }

    #[test]
    fn test_stage_order_enforced() {
        let mut session = ReconcileSession::new(config());
        let err = session.classify("COL").unwrap_err();
        assert_eq!(
            err,
            ReconcileError::EmptyInput {
                table: "master".to_string()
            }
        );
        assert!(session.apply().is_err());
    }

    #[test]
    fn test_full_session() {
        let mut session = ReconcileSession::new(config());

        let cleaning = session.load_master(&raw_master()).unwrap();
        assert_eq!(cleaning.rows_dropped, 1);

        let target_stats = session.load_target(&raw_target()).unwrap();
        assert!(target_stats.columns_swapped);
        assert_eq!(session.target().unwrap().columns[0], "YAZAKI PN");

        let suggestion = session.suggest("j74_v710_b2_pp_yotk").unwrap().clone();
        assert_eq!(suggestion.column, "J74_V710_B2_PP_YOTK");
        assert_eq!(suggestion.confidence, 1.0);

        let stats = session.classify(&suggestion.column).unwrap();
        assert_eq!(stats.count("D"), 1);
        assert_eq!(stats.count("0"), 1);
        assert_eq!(stats.count("NOT_FOUND"), 1);

        let update = session.apply().unwrap();
        assert_eq!(update.updated_count, 1);
        assert_eq!(update.duplicates_count, 1);
        assert_eq!(update.inserted_count, 1);

        let updated = session.updated().unwrap();
        assert_eq!(updated.len(), 3);
        assert_eq!(updated.get(0, "J74_V710_B2_PP_YOTK"), &Value::from("X"));
        assert_eq!(updated.get(2, "YAZAKI PN"), &Value::from("EF56"));

        let report = session.report();
        assert_eq!(report.lookup_column.as_deref(), Some("J74_V710_B2_PP_YOTK"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["update"]["inserted_count"], 1);
    }

    #[test]
    fn test_load_classified_requires_status() {
        let mut session = ReconcileSession::new(config());
        session.load_master(&raw_master()).unwrap();

        let plain = Table::from_json_records(&["YAZAKI PN"], &json!([{"YAZAKI PN": "AB12"}]));
        assert!(session.load_classified(plain, "J74_V710_B2_PP_YOTK").is_err());

        let classified = Table::from_json_records(
            &["YAZAKI PN", "ACTIVATION_STATUS"],
            &json!([{"YAZAKI PN": "CD34", "ACTIVATION_STATUS": "NOT_FOUND"}]),
        );
        session.load_classified(classified, "J74_V710_B2_PP_YOTK").unwrap();
        let stats = session.apply().unwrap();
        assert_eq!(stats.inserted_count, 1);
    }

    #[test]
    fn test_flag_retired_updates_master() {
        let mut session = ReconcileSession::new(config());
        session
            .load_master(&Table::from_json_records(
                &["YAZAKI PN", "COL"],
                &json!([{"YAZAKI PN": "AB12", "COL": "X"}, {"YAZAKI PN": "ZZ00", "COL": "X"}]),
            ))
            .unwrap();
        session
            .load_target(&Table::from_json_records(
                &["DESC", "YAZAKI PN"],
                &json!([{"DESC": "a", "YAZAKI PN": "AB12"}]),
            ))
            .unwrap();

        let insights = session.flag_retired("COL").unwrap();
        assert_eq!(insights.remarked, 1);
        assert_eq!(session.master().unwrap().get(1, "COL"), &Value::from("D"));
    }

    #[test]
    fn test_flag_retired_discards_earlier_classification() {
        let mut session = ReconcileSession::new(config());
        session.load_master(&raw_master()).unwrap();
        session.load_target(&raw_target()).unwrap();
        session.classify("J74_V710_B2_PP_YOTK").unwrap();
        assert!(session.classified().is_some());

        session.flag_retired("J74_V710_B2_PP_YOTK").unwrap();

        assert!(session.classified().is_none());
        assert!(session.report().classification.is_none());
        assert_eq!(
            session.apply().unwrap_err(),
            ReconcileError::EmptyInput {
                table: "classified".to_string()
            }
        );

        // Re-classifying against the flagged master works again
        session.classify("J74_V710_B2_PP_YOTK").unwrap();
        let stats = session.apply().unwrap();
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_reloading_master_clears_previous_run() {
        let mut session = ReconcileSession::new(config());
        session.load_master(&raw_master()).unwrap();
        session.load_target(&raw_target()).unwrap();
        session.suggest("J74_V710_B2_PP_YOTK").unwrap();
        session.classify("J74_V710_B2_PP_YOTK").unwrap();
        session.apply().unwrap();

        session.load_master(&raw_master()).unwrap();

        let report = session.report();
        assert!(report.lookup_column.is_none());
        assert!(report.suggestion.is_none());
        assert!(report.classification.is_none());
        assert!(report.update.is_none());
        assert!(report.master_cleaning.is_some());
        assert!(report.target_cleaning.is_some());
        assert!(session.updated().is_none());
    }
}
