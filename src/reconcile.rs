//! Merges owner lists into parcel features and reports the parcels that
//! exist on only one side.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use geojson::FeatureCollection;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::features::feature_parcel_id;
use crate::owners::{OwnersByParcel, OWNER_DELIMITER};
use crate::parcel_id::is_canonical;

/// Reason written next to every unmatched parcel id.
pub const NO_MATCH_REASON: &str = "No matching owner data";
/// Inconsistency files are comma separated whatever the input separator is.
pub const INCONSISTENCY_SEPARATOR: u8 = b',';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Property receiving all owners joined with `", "`.
    pub owners_property: String,
    /// Base name of the per-owner properties (`"<base> 1"`, `"<base> 2"`, ...).
    pub individual_property: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InconsistencyReport {
    /// Parcels with a geometry but no owner data, in feature order.
    pub missing_owners: Vec<String>,
    /// Parcels with owner data but no geometry, in owner file order.
    pub missing_geometry: Vec<String>,
}

impl InconsistencyReport {
    pub fn is_empty(&self) -> bool {
        self.missing_owners.is_empty() && self.missing_geometry.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Features that received owner data.
    pub processed: usize,
    /// Features whose `id` is present but not in canonical form.
    pub non_canonical: usize,
    pub report: InconsistencyReport,
}

/// Writes owner data into every matching feature and collects the ids
/// found on one side only.
///
/// Per-owner properties left by an earlier run under the same base name are
/// removed first, so a parcel that lost an owner does not keep a stale field.
pub fn reconcile(
    fc: &mut FeatureCollection,
    owners: &OwnersByParcel,
    options: &MergeOptions,
) -> Reconciliation {
    info!("Processing GeoJSON with prop_name: {}", options.owners_property);
    if let Some(base) = &options.individual_property {
        info!("Processing GeoJSON with individual_prop_name: {}", base);
    }

    let mut result = Reconciliation::default();
    let mut geometry_ids = HashSet::with_capacity(fc.features.len());
    let mut reported = HashSet::new();

    for feature in fc.features.iter_mut() {
        let parcel_id = feature_parcel_id(feature);
        if let Some(id) = parcel_id.as_deref().filter(|id| !is_canonical(id)) {
            debug!("feature id '{}' is not a canonical parcel id", id);
            result.non_canonical += 1;
        }
        let matched = parcel_id.as_deref().and_then(|id| owners.get(id));

        let Some(names) = matched else {
            let id = parcel_id.unwrap_or_default();
            if reported.insert(id.clone()) {
                result.report.missing_owners.push(id.clone());
            }
            geometry_ids.insert(id);
            continue;
        };

        let properties = feature.properties.get_or_insert_with(Default::default);
        properties.insert(
            options.owners_property.clone(),
            Value::String(names.join(OWNER_DELIMITER)),
        );
        if let Some(base) = &options.individual_property {
            let prefix = format!("{base} ");
            properties.retain(|key, _| !is_numbered_key(key, &prefix));
            for (i, name) in names.iter().enumerate() {
                properties.insert(format!("{prefix}{}", i + 1), Value::String(name.clone()));
            }
        }

        result.processed += 1;
        geometry_ids.extend(parcel_id);
    }

    result.report.missing_geometry = owners
        .parcel_ids()
        .filter(|id| !geometry_ids.contains(*id))
        .map(str::to_string)
        .collect();

    info!("Total of {} parcels processed", result.processed);
    if result.non_canonical > 0 {
        warn!(
            "{} features have an id that is not a canonical parcel id",
            result.non_canonical
        );
    }
    if !result.report.missing_owners.is_empty() {
        warn!(
            "{} parcels found in JSON but not in CSV",
            result.report.missing_owners.len()
        );
    }
    if !result.report.missing_geometry.is_empty() {
        warn!(
            "{} parcels found in CSV but not in JSON",
            result.report.missing_geometry.len()
        );
    }
    result
}

fn is_numbered_key(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Writes unmatched parcel ids as `Parcel ID`/`Reason` rows.
pub fn export_inconsistencies(parcel_ids: &[String], path: &Path) -> Result<()> {
    crate::ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| Error::writing(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(INCONSISTENCY_SEPARATOR)
        .from_writer(file);

    writer.write_record(["Parcel ID", "Reason"])?;
    for parcel_id in parcel_ids {
        writer.write_record([parcel_id.as_str(), NO_MATCH_REASON])?;
    }
    writer.flush().map_err(|e| Error::writing(path, e))?;

    info!("Inconsistencies exported to {}", path.display());
    Ok(())
}
