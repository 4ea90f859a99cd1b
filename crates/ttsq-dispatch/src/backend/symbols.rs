//! Symbol-table text normalizer.
//!
//! Maps each character of a sentence to a model input id through a lookup
//! table exported alongside the acoustic model. Characters missing from the
//! table are dropped.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::backend::TextNormalizer;
use crate::error::{ConfigError, SynthesisError};

/// On-disk layout of a symbol table (`{"symbol_to_id": {...}, "eos_id": 1}`).
#[derive(Debug, Deserialize)]
struct SymbolTableFile {
    symbol_to_id: HashMap<String, i32>,
    #[serde(default)]
    eos_id: Option<i32>,
}

/// Character-level [`TextNormalizer`] backed by a symbol table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTableNormalizer {
    table: HashMap<char, i32>,
    eos_id: Option<i32>,
}

impl SymbolTableNormalizer {
    /// Build a normalizer from `(symbol, id)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (char, i32)>) -> Self {
        Self {
            table: entries.into_iter().collect(),
            eos_id: None,
        }
    }

    /// Append `eos_id` to every normalized sentence.
    #[must_use]
    pub fn with_eos(mut self, eos_id: i32) -> Self {
        self.eos_id = Some(eos_id);
        self
    }

    /// Parse a symbol table from its JSON representation.
    ///
    /// Only single-character symbols are kept; multi-character entries
    /// (e.g. `"@sil"`) are ignored.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let file: SymbolTableFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    /// Load a symbol table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SymbolTableFile =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let normalizer = Self::from_file(file);
        tracing::info!(
            path = %path.display(),
            symbols = normalizer.len(),
            "Loaded symbol table"
        );
        Ok(normalizer)
    }

    fn from_file(file: SymbolTableFile) -> Self {
        let mut table = HashMap::with_capacity(file.symbol_to_id.len());
        for (symbol, id) in file.symbol_to_id {
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    table.insert(c, id);
                }
                _ => tracing::debug!(symbol = %symbol, "Ignoring multi-character symbol"),
            }
        }
        Self {
            table,
            eos_id: file.eos_id,
        }
    }

    /// Number of known symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl TextNormalizer for SymbolTableNormalizer {
    fn normalize(&self, sentence: &str) -> Result<Vec<i32>, SynthesisError> {
        let mut ids = Vec::with_capacity(sentence.chars().count() + 1);
        let mut unknown = 0usize;

        for c in sentence.chars() {
            match self.table.get(&c) {
                Some(&id) => ids.push(id),
                None => unknown += 1,
            }
        }

        if unknown > 0 {
            tracing::debug!(unknown, sentence, "Dropped characters missing from symbol table");
        }

        if let Some(eos) = self.eos_id {
            if !ids.is_empty() {
                ids.push(eos);
            }
        }

        Ok(ids)
    }
}
