use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use bulkedit_model::{ImportOptions, Row};

use crate::csv_rows::{CSV_CONTENT_TYPE, CsvRowLoader};
use crate::error::{IngestError, Result};
use crate::json_rows::{JSON_CONTENT_TYPE, JsonRowLoader};
use crate::loader::RowLoader;

/// Row loaders keyed by content type.
pub struct LoaderRegistry {
    loaders: BTreeMap<&'static str, Box<dyn RowLoader>>,
}

impl LoaderRegistry {
    pub fn empty() -> Self {
        Self {
            loaders: BTreeMap::new(),
        }
    }

    /// CSV and JSON loaders.
    pub fn standard() -> Self {
        Self::empty()
            .with_loader(Box::new(CsvRowLoader))
            .with_loader(Box::new(JsonRowLoader))
    }

    pub fn with_loader(mut self, loader: Box<dyn RowLoader>) -> Self {
        self.register(loader);
        self
    }

    /// Registers `loader`, replacing any loader for the same content type.
    pub fn register(&mut self, loader: Box<dyn RowLoader>) {
        self.loaders.insert(loader.content_type(), loader);
    }

    pub fn get(&self, content_type: &str) -> Result<&dyn RowLoader> {
        self.loaders
            .get(content_type)
            .map(Box::as_ref)
            .ok_or_else(|| IngestError::UnsupportedContentType {
                content_type: content_type.to_string(),
            })
    }

    pub fn content_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.loaders.keys().copied()
    }

    /// Content type implied by the file extension.
    pub fn content_type_for(path: &Path) -> Result<&'static str> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(CSV_CONTENT_TYPE),
            Some("json") => Ok(JSON_CONTENT_TYPE),
            _ => Err(IngestError::UnknownExtension {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Loads `path` with the loader for `content_type`, or the one its
    /// extension implies.
    pub fn load(
        &self,
        path: &Path,
        content_type: Option<&str>,
        options: &ImportOptions,
    ) -> Result<Vec<Row>> {
        let content_type = match content_type {
            Some(content_type) => content_type,
            None => Self::content_type_for(path)?,
        };
        let rows = self.get(content_type)?.load(path, options)?;
        info!(path = %path.display(), content_type, rows = rows.len(), "rows loaded");
        Ok(rows)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_content_type() {
        assert_eq!(
            LoaderRegistry::content_type_for(Path::new("batch.CSV")).expect("csv"),
            CSV_CONTENT_TYPE
        );
        assert!(LoaderRegistry::content_type_for(Path::new("batch.xlsx")).is_err());
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let registry = LoaderRegistry::standard();
        assert!(matches!(
            registry.get("text/tab-separated-values"),
            Err(IngestError::UnsupportedContentType { .. })
        ));
        assert_eq!(
            registry.content_types().collect::<Vec<_>>(),
            vec![JSON_CONTENT_TYPE, CSV_CONTENT_TYPE]
        );
    }
}
