//! `ttsq normalize`: map each sentence unit to symbol ids.

use std::path::Path;

use anyhow::{Context, Result};
use ttsq_dispatch::{SymbolTableNormalizer, TextNormalizer, text_utils};

/// Normalize every unit of `text`, one JSON line per unit.
pub fn render(normalizer: &dyn TextNormalizer, text: &str) -> Result<Vec<String>> {
    text_utils::sentences(text)
        .map(|unit| {
            let ids = normalizer
                .normalize(&unit.text)
                .with_context(|| format!("failed to normalize unit {}", unit.ordinal))?;
            let line = serde_json::json!({
                "ordinal": unit.ordinal,
                "text": unit.text,
                "ids": ids,
            });
            Ok(line.to_string())
        })
        .collect()
}

/// Execute the normalize command.
pub fn execute(symbols: &Path, text: &str) -> Result<()> {
    let normalizer = SymbolTableNormalizer::from_json_file(symbols)?;
    for line in render(&normalizer, text)? {
        println!("{line}");
    }
    Ok(())
}
