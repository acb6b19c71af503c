//! JSON files the engine runs against: the relationship type catalog and
//! the store snapshot.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use bulkedit_core::{StaticCatalog, StoreSnapshot};

use crate::error::{IngestError, Result};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> IngestError + '_ {
    move |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> IngestError + '_ {
    move |source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(io_error(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(json_error(path))
}

/// Writes pretty JSON through a sibling temporary file, so a failed write
/// never truncates an existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut staging_name = path.as_os_str().to_owned();
    staging_name.push(".tmp");
    let staging = Path::new(&staging_name);
    {
        let file = File::create(staging).map_err(io_error(staging))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(json_error(path))?;
        writer.write_all(b"\n").map_err(io_error(staging))?;
        writer.flush().map_err(io_error(staging))?;
    }
    fs::rename(staging, path).map_err(io_error(path))?;
    debug!(path = %path.display(), "json written");
    Ok(())
}

pub fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    let catalog: StaticCatalog = read_json(path)?;
    info!(path = %path.display(), types = catalog.len(), "relationship types loaded");
    Ok(catalog)
}

pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let snapshot: StoreSnapshot = read_json(path)?;
    info!(
        path = %path.display(),
        records = snapshot.records.len(),
        containers = snapshot.containers.len(),
        relationships = snapshot.relationships.len(),
        "store snapshot loaded"
    );
    Ok(snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    write_json(path, snapshot)?;
    info!(path = %path.display(), records = snapshot.records.len(), "store snapshot saved");
    Ok(())
}
