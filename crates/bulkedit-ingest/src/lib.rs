//! Input side of the batch import engine: row loaders and the JSON files
//! describing the store and the relationship type catalog.

pub mod csv_rows;
pub mod error;
pub mod json_rows;
pub mod loader;
pub mod registry;
pub mod snapshot;

pub use csv_rows::{CSV_CONTENT_TYPE, CsvRowLoader};
pub use error::{IngestError, Result};
pub use json_rows::{JSON_CONTENT_TYPE, JsonRowLoader};
pub use loader::{NEW_RECORD_MARKER, RowLoader};
pub use registry::LoaderRegistry;
pub use snapshot::{load_catalog, load_snapshot, read_json, save_snapshot, write_json};
