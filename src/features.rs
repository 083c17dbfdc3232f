use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson};
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Property holding the canonical parcel id of a feature.
pub const ID_PROPERTY: &str = "id";

// Function to load the parcel features from a GeoJSON file
pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    info!("Reading JSON from: {}", path.display());
    let file = File::open(path).map_err(|e| Error::reading(path, e))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).map_err(|e| {
        error!("Error reading the GeoJSON file: {}", e);
        e
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => {
            info!("Found {} features in file", fc.features.len());
            Ok(fc)
        }
        _ => Err(Error::NotAFeatureCollection {
            path: path.to_path_buf(),
        }),
    }
}

/// Writes the collection pretty-printed with a four-space indent.
/// Non-ASCII text is written as-is.
///
/// The document is serialized in full and written to a temporary file next
/// to `path`, which then replaces `path`. A failed write leaves any previous
/// output untouched.
pub fn write_feature_collection(fc: &FeatureCollection, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    fc.serialize(&mut serializer)?;

    crate::ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| Error::writing(path, e))?;
    staged.write_all(&buffer).map_err(|e| Error::writing(path, e))?;
    staged.flush().map_err(|e| Error::writing(path, e))?;
    staged
        .persist(path)
        .map_err(|e| Error::writing(path, e.error))?;

    info!("GeoJSON file successfully written: {}", path.display());
    Ok(())
}

/// The feature's `properties.id` as a string. Numeric ids are stringified.
pub fn feature_parcel_id(feature: &Feature) -> Option<String> {
    match feature.property(ID_PROPERTY)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
