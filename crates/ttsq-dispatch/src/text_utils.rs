//! Sentence splitting for synthesis.
//!
//! A request's text is cut into sentence units at a fixed set of
//! sentence- and clause-terminating characters, covering both ASCII and
//! full-width CJK punctuation. Each unit is synthesized and played on its
//! own, so the first audio starts as soon as the first clause is ready.
//!
//! Units carry no delimiter and are not trimmed. Empty units (two
//! delimiters in a row, or a delimiter at either end) are skipped, and
//! ordinals count only the units that are emitted.

use serde::{Deserialize, Serialize};

/// Characters that end a sentence unit.
pub const SENTENCE_DELIMITERS: [char; 10] = ['\n', '，', '。', '？', '?', '！', '!', ',', ';', '；'];

/// One delimiter-bounded piece of a request's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceUnit {
    /// Position of this unit among the emitted units, starting at 0.
    pub ordinal: usize,

    /// Unit text, exactly as it appeared between delimiters.
    pub text: String,
}

/// Whether `c` terminates a sentence unit.
#[must_use]
pub fn is_delimiter(c: char) -> bool {
    SENTENCE_DELIMITERS.contains(&c)
}

/// Lazily split `text` into sentence units.
#[must_use]
pub const fn sentences(text: &str) -> Sentences<'_> {
    Sentences {
        rest: Some(text),
        next_ordinal: 0,
    }
}

/// Split `text` into sentence units, collected eagerly.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<SentenceUnit> {
    sentences(text).collect()
}

/// Iterator returned by [`sentences`].
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    rest: Option<&'a str>,
    next_ordinal: usize,
}

impl Iterator for Sentences<'_> {
    type Item = SentenceUnit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.rest?;
            let piece = match rest.char_indices().find(|&(_, c)| is_delimiter(c)) {
                Some((idx, delim)) => {
                    self.rest = Some(&rest[idx + delim.len_utf8()..]);
                    &rest[..idx]
                }
                None => {
                    self.rest = None;
                    rest
                }
            };

            if piece.is_empty() {
                continue;
            }

            let unit = SentenceUnit {
                ordinal: self.next_ordinal,
                text: piece.to_string(),
            };
            self.next_ordinal += 1;
            return Some(unit);
        }
    }
}

impl std::iter::FusedIterator for Sentences<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        split_sentences(input).into_iter().map(|u| u.text).collect()
    }

    #[test]
    fn test_split_chinese_comma() {
        assert_eq!(texts("你好，世界"), vec!["你好", "世界"]);
    }

    #[test]
    fn test_split_all_delimiters() {
        let input = "a\nb，c。d？e?f！g!h,i;j；k";
        assert_eq!(
            texts(input),
            vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]
        );
    }

    #[test]
    fn test_empty_units_skipped() {
        assert_eq!(texts("，，hello。。world！"), vec!["hello", "world"]);
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("。，!?").is_empty());
    }

    #[test]
    fn test_no_trimming() {
        assert_eq!(texts(" one , two "), vec![" one ", " two "]);
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let units = split_sentences("a,,b,c");
        let ordinals: Vec<usize> = units.iter().map(|u| u.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_resplit_is_identity() {
        for unit in split_sentences("君不见,黄河之水天上来,奔流到海不复回") {
            let again = split_sentences(&unit.text);
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].text, unit.text);
        }
    }

    #[test]
    fn test_order_matches_delimiter_positions() {
        let input = "first. second? third! fourth";
        let units = split_sentences(input);
        let mut cursor = 0;
        for unit in &units {
            let pos = input[cursor..].find(&unit.text).unwrap() + cursor;
            assert!(pos >= cursor);
            cursor = pos + unit.text.len();
        }
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "first. second");
    }

    #[test]
    fn test_iterator_is_lazy_and_fused() {
        let mut iter = sentences("x,y");
        assert_eq!(iter.next().map(|u| u.text), Some("x".to_string()));
        assert_eq!(iter.next().map(|u| u.text), Some("y".to_string()));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }
}
