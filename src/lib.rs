use std::fs::create_dir_all;
use std::path::Path;

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod owners;
pub mod parcel_id;
pub mod pipeline;
pub mod prompt;
pub mod reconcile;

pub use config::{ConfigKey, ConfigStore, Settings};
pub use error::{Error, Result};
pub use owners::{MalformedPolicy, OwnersByParcel};
pub use pipeline::{run, OverwritePolicy, RunOutcome, RunSummary};
pub use reconcile::{reconcile, InconsistencyReport, MergeOptions, Reconciliation};

/// Creates the directory an output file will be written into.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            create_dir_all(dir).map_err(|e| Error::writing(dir, e))
        }
        _ => Ok(()),
    }
}
