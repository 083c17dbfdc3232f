//! Owners export handling: grouping owners by parcel, the grouped CSV
//! intermediate file and the header separator check.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::parcel_id;

/// Column holding the owner names in the cadastral export.
pub const OWNER_COLUMN: &str = "Nom complet du proprietaire [BG]";
/// Co-owners share a cell, separated by this delimiter.
pub const OWNER_DELIMITER: &str = ", ";

const GROUPED_HEADER: [&str; 2] = ["Parcel ID", "Owners"];

/// Owner names per canonical parcel id.
///
/// Parcels keep the order in which they were first seen and owners keep
/// the order in which they were read. Nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnersByParcel {
    inner: IndexMap<String, Vec<String>>,
}

impl OwnersByParcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends owners to the list of `parcel_id`.
    pub fn extend_parcel<I, S>(&mut self, parcel_id: impl Into<String>, owners: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .entry(parcel_id.into())
            .or_default()
            .extend(owners.into_iter().map(Into::into));
    }

    pub fn get(&self, parcel_id: &str) -> Option<&[String]> {
        self.inner.get(parcel_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn parcel_ids(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(id, owners)| (id.as_str(), owners.as_slice()))
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for OwnersByParcel {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        let mut owners = OwnersByParcel::new();
        for (id, names) in iter {
            owners.extend_parcel(id, names);
        }
        owners
    }
}

/// What to do with a row whose parcel reference cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Stop at the first malformed reference.
    #[default]
    Abort,
    /// Leave the row out and list its raw reference in [`Grouping::skipped`].
    SkipAndReport,
}

#[derive(Debug, Default)]
pub struct Grouping {
    pub owners: OwnersByParcel,
    /// Raw references of rows dropped under [`MalformedPolicy::SkipAndReport`].
    pub skipped: Vec<String>,
    pub rows: usize,
}

/// Converts a configured separator into the single byte the CSV reader expects.
pub fn separator_byte(separator: &str) -> Result<u8> {
    match separator.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(Error::InvalidSeparator(separator.to_string())),
    }
}

/// Returns true if the first line of the file contains `separator`.
pub fn separator_matches(path: &Path, separator: &str) -> Result<bool> {
    let file = File::open(path).map_err(|e| Error::reading(path, e))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(|e| Error::reading(path, e))?;
    Ok(!separator.is_empty() && first_line.contains(separator))
}

/// Groups the owners of every row by normalized parcel id.
///
/// `source` names the input in error messages. Rows may be shorter or longer
/// than the header, as spreadsheet exports with trailing separators are;
/// a missing cell reads as empty.
pub fn group_owners<R: Read>(
    reader: R,
    source: &str,
    separator: u8,
    id_column: &str,
    policy: MalformedPolicy,
) -> Result<Grouping> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            error!("column '{}' missing from {}", name, source);
            Error::MissingColumn {
                column: name.to_string(),
                path: source.to_string(),
            }
        })
    };
    let id_idx = column(id_column)?;
    let owner_idx = column(OWNER_COLUMN)?;

    let mut grouping = Grouping::default();
    for record in reader.records() {
        let record = record?;
        grouping.rows += 1;

        let raw_id = record.get(id_idx).unwrap_or("");
        let parcel_id = match parcel_id::normalize(raw_id) {
            Ok(id) => id,
            Err(err) => match policy {
                MalformedPolicy::Abort => {
                    error!(
                        "Invalid ID format found in {}. Check the file or choose another id column",
                        source
                    );
                    return Err(err);
                }
                MalformedPolicy::SkipAndReport => {
                    warn!("skipping row {} with malformed parcel id '{}'", grouping.rows, raw_id);
                    grouping.skipped.push(raw_id.to_string());
                    continue;
                }
            },
        };

        let owners = record.get(owner_idx).unwrap_or("");
        grouping
            .owners
            .extend_parcel(parcel_id, owners.split(OWNER_DELIMITER));
    }

    info!(
        "Grouped {} rows into {} parcels from {}",
        grouping.rows,
        grouping.owners.len(),
        source
    );
    Ok(grouping)
}

pub fn group_owners_from_path(
    path: &Path,
    separator: u8,
    id_column: &str,
    policy: MalformedPolicy,
) -> Result<Grouping> {
    info!("Reading CSV from: {}", path.display());
    let file = File::open(path).map_err(|e| Error::reading(path, e))?;
    group_owners(file, &path.display().to_string(), separator, id_column, policy)
}

/// Writes the grouped owners as `Parcel ID`/`Owners` rows.
pub fn export_grouped(owners: &OwnersByParcel, path: &Path, separator: u8) -> Result<()> {
    crate::ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| Error::writing(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(separator)
        .from_writer(file);

    writer.write_record(GROUPED_HEADER)?;
    for (parcel_id, names) in owners.iter() {
        writer.write_record([parcel_id, names.join(OWNER_DELIMITER).as_str()])?;
    }
    writer.flush().map_err(|e| Error::writing(path, e))?;

    info!("Data successfully exported to {}", path.display());
    Ok(())
}

/// Reads back a file written by [`export_grouped`].
pub fn read_grouped(path: &Path, separator: u8) -> Result<OwnersByParcel> {
    let file = File::open(path).map_err(|e| Error::reading(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut owners = OwnersByParcel::new();
    for record in reader.records() {
        let record = record?;
        let parcel_id = record.get(0).unwrap_or("");
        let names = record.get(1).unwrap_or("");
        owners.extend_parcel(parcel_id, names.split(OWNER_DELIMITER));
    }
    Ok(owners)
}
