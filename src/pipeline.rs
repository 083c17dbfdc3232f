use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::features::{read_feature_collection, write_feature_collection};
use crate::owners::{export_grouped, group_owners_from_path, read_grouped, separator_byte};
use crate::prompt::Confirm;
use crate::reconcile::{export_inconsistencies, reconcile, InconsistencyReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Ask before replacing an existing output file.
    #[default]
    Ask,
    /// The caller already has the operator's consent.
    AssumeYes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub csv_rows: usize,
    pub parcels: usize,
    pub features: usize,
    /// Features that received owner data.
    pub processed: usize,
    /// Raw references left out under the skip-and-report policy.
    pub skipped: Vec<String>,
    pub report: InconsistencyReport,
    pub grouped_csv: PathBuf,
    pub output_geojson: PathBuf,
    pub inconsistency_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// The operator refused to overwrite the output; nothing was written to it.
    Cancelled,
}

/// Groups the owners export, merges it into the parcel geometries and
/// writes every output file.
///
/// The grouped owners file is written before the geometries are read, so it
/// stays behind when a later step fails.
pub fn run(
    settings: &Settings,
    overwrite: OverwritePolicy,
    confirm: &mut dyn Confirm,
) -> Result<RunOutcome> {
    let paths = &settings.paths;
    let options = &settings.options;
    let separator = separator_byte(&options.csv_separator)?;

    info!("Selected ID column in .csv: {}", options.id_csv_column);
    let grouping = group_owners_from_path(
        &paths.input_csv,
        separator,
        &options.id_csv_column,
        settings.malformed_policy(),
    )?;
    if grouping.owners.is_empty() {
        warn!("No owner rows found in {}", paths.input_csv.display());
    }
    if !grouping.skipped.is_empty() {
        warn!(
            "{} rows skipped because of malformed parcel ids",
            grouping.skipped.len()
        );
    }

    export_grouped(&grouping.owners, &paths.grouped_csv, separator)?;
    let owners = read_grouped(&paths.grouped_csv, separator)?;

    let start = Instant::now();
    let mut fc = read_feature_collection(&paths.input_geojson)?;
    let reconciliation = reconcile(&mut fc, &owners, &settings.merge_options());
    info!(
        "GeoJSON processed in {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    let report = reconciliation.report;
    let mut inconsistency_files = Vec::new();
    if !report.missing_owners.is_empty() {
        export_inconsistencies(&report.missing_owners, &paths.inconsistencies_geojson)?;
        inconsistency_files.push(paths.inconsistencies_geojson.clone());
    }
    if !report.missing_geometry.is_empty() {
        export_inconsistencies(&report.missing_geometry, &paths.inconsistencies_csv)?;
        inconsistency_files.push(paths.inconsistencies_csv.clone());
    }

    if overwrite == OverwritePolicy::Ask && paths.output_geojson.exists() {
        let accepted = confirm
            .confirm_overwrite(&paths.output_geojson)
            .map_err(Error::Prompt)?;
        if !accepted {
            info!("Operation cancelled by the user.");
            return Ok(RunOutcome::Cancelled);
        }
    }
    write_feature_collection(&fc, &paths.output_geojson)?;
    info!("GeoJSON file has been successfully updated and written to the output path.");

    Ok(RunOutcome::Completed(RunSummary {
        csv_rows: grouping.rows,
        parcels: owners.len(),
        features: fc.features.len(),
        processed: reconciliation.processed,
        skipped: grouping.skipped,
        report,
        grouped_csv: paths.grouped_csv.clone(),
        output_geojson: paths.output_geojson.clone(),
        inconsistency_files,
    }))
}
