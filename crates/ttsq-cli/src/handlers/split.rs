//! `ttsq split`: show how text is cut into sentence units.

use ttsq_dispatch::text_utils;

/// Render the units of `text` as `ordinal<TAB>text` lines.
pub fn render(text: &str) -> String {
    text_utils::sentences(text)
        .map(|unit| format!("{}\t{}\n", unit.ordinal, unit.text))
        .collect()
}

/// Execute the split command.
pub fn execute(text: &str) {
    print!("{}", render(text));
}
