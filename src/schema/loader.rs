//! Schema loader for reading schema definition files from disk
//!
//! - A schema path is either a single `.json` file or a directory of them
//! - A file holds one schema document or a JSON array of schema documents
//! - Files are processed in sorted path order so loading is deterministic
//! - All files of one `load` call are parsed as a single batch, so references
//!   may cross file boundaries

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::parser::SchemaParser;
use super::types::SchemaType;
use crate::observability::{log_event_with_fields, Event};

/// Schema loader that reads schema files and keeps the parsed roots.
pub struct SchemaLoader {
    parser: SchemaParser,
    /// Root schemas in load order
    roots: Vec<SchemaType>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self {
            parser: SchemaParser::new(),
            roots: Vec::new(),
        }
    }

    /// Loads a schema file or every `*.json` file of a directory.
    ///
    /// Returns the number of root schemas added.
    pub fn load(&mut self, path: &Path) -> SchemaResult<usize> {
        let files = if path.is_dir() {
            Self::schema_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut documents = Vec::new();
        for file in &files {
            let content = fs::read_to_string(file)
                .map_err(|e| SchemaError::io_error(file.display().to_string(), e))?;
            let json: Value = serde_json::from_str(&content).map_err(|e| {
                SchemaError::malformed(file.display().to_string(), format!("invalid JSON: {}", e))
            })?;
            match json {
                Value::Array(items) => documents.extend(items),
                single => documents.push(single),
            }
        }

        let added = self.register_documents(&documents)?;
        log_event_with_fields(
            Event::SchemaLoaded,
            &[
                ("path", &path.display().to_string()),
                ("files", &files.len().to_string()),
                ("schemas", &added.to_string()),
            ],
        );
        Ok(added)
    }

    /// Lists `*.json` files in a directory, sorted by path
    fn schema_files(dir: &Path) -> SchemaResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| SchemaError::io_error(dir.display().to_string(), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::io_error(dir.display().to_string(), e))?;
            let path = entry.path();

            // Skip non-JSON files
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    /// Registers schemas from JSON text (one document or an array of documents)
    pub fn register_str(&mut self, text: &str) -> SchemaResult<usize> {
        let json: Value = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed("<in-memory>", format!("invalid JSON: {}", e)))?;
        let documents = match json {
            Value::Array(items) => items,
            single => vec![single],
        };
        self.register_documents(&documents)
    }

    /// Registers an already-built schema as a root
    pub fn register(&mut self, schema: SchemaType) {
        self.roots.push(schema);
    }

    fn register_documents(&mut self, documents: &[Value]) -> SchemaResult<usize> {
        let parsed = self.parser.parse_documents(documents)?;
        let added = parsed.len();
        self.roots.extend(parsed);
        Ok(added)
    }

    /// Returns a named type (record, enum or fixed) by full name
    pub fn get(&self, full_name: &str) -> Option<&SchemaType> {
        self.parser.named_type(full_name)
    }

    /// Returns all root schemas in load order
    pub fn roots(&self) -> &[SchemaType] {
        &self.roots
    }

    /// Returns the number of root schemas
    pub fn schema_count(&self) -> usize {
        self.roots.len()
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}
