//! Tolerant decoding of generator output into suggestions.
//!
//! Generator text is untrusted. Decoding walks a fallback ladder and stops
//! at the first rung that yields a JSON array:
//!
//! 1. strict parse of the whole text
//! 2. contents of a fenced code block
//! 3. first balanced `[...]` span
//! 4. repair: keep everything from the first `[` up to the last complete
//!    top-level object and close the array
//!
//! Array elements that do not describe a usable suggestion are skipped
//! individually rather than failing the batch.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::suggestion::OpportunitySuggestion;
use crate::domain::foundation::{OpportunityId, Percentage};

const MAX_INPUT_LEN: usize = 512 * 1024;
const DEFAULT_CONFIDENCE: u8 = 50;

/// Generator output could not be coerced into a suggestion array.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("generator response was empty")]
    Empty,

    #[error("generator response too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("no JSON array found in generator response")]
    NoArray,

    #[error("generator response could not be repaired: {0}")]
    Unrepairable(String),
}

/// Which rung of the ladder produced the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Strict,
    CodeFence,
    BracketScan,
    Repaired,
}

/// Result of decoding one generator response.
#[derive(Debug, Clone)]
pub struct DecodedBatch {
    pub suggestions: Vec<RawSuggestion>,
    pub strategy: DecodeStrategy,
    /// Array elements that were not usable suggestion objects.
    pub skipped: usize,
}

/// A suggestion exactly as the generator described it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSuggestion {
    pub destination: Option<String>,
    pub category: Option<String>,
    pub niche: Option<String>,
    #[serde(alias = "primaryKeyword", alias = "primary_keyword")]
    pub keyword: Option<String>,
    #[serde(alias = "cluster_keywords", alias = "relatedKeywords", alias = "keywords")]
    pub cluster_keywords: Vec<String>,
    #[serde(alias = "reasoning")]
    pub rationale: Option<String>,
    #[serde(alias = "suggested_domain", alias = "domain")]
    pub suggested_domain: Option<String>,
    #[serde(alias = "alternative_domains")]
    pub alternative_domains: Vec<String>,
    #[serde(alias = "confidence", alias = "confidence_score")]
    pub confidence_score: Option<f64>,
}

impl RawSuggestion {
    /// Builds a suggestion when keyword and destination are present.
    ///
    /// Category falls back to the niche and vice versa. Missing confidence
    /// defaults to the midpoint.
    pub fn into_suggestion(self, iteration: u32) -> Option<OpportunitySuggestion> {
        let keyword = non_blank(self.keyword)?;
        let destination = non_blank(self.destination)?;
        let category = non_blank(self.category);
        let niche = non_blank(self.niche);
        let (category, niche) = match (category, niche) {
            (Some(c), Some(n)) => (c, n),
            (Some(c), None) => (c.clone(), c),
            (None, Some(n)) => (n.clone(), n),
            (None, None) => ("experiences".to_string(), keyword.clone()),
        };

        Some(OpportunitySuggestion {
            id: OpportunityId::new(),
            destination,
            category,
            niche,
            keyword,
            cluster_keywords: self
                .cluster_keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            rationale: self.rationale.unwrap_or_default(),
            suggested_domain: non_blank(self.suggested_domain),
            alternative_domains: self
                .alternative_domains
                .into_iter()
                .filter(|d| !d.trim().is_empty())
                .collect(),
            confidence_score: self
                .confidence_score
                .map(Percentage::from_f64_rounded)
                .unwrap_or_else(|| Percentage::new(DEFAULT_CONFIDENCE)),
            iteration_source: iteration,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decodes generator text into raw suggestions.
#[derive(Debug, Clone)]
pub struct SuggestionDecoder {
    max_len: usize,
}

impl Default for SuggestionDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionDecoder {
    pub fn new() -> Self {
        Self {
            max_len: MAX_INPUT_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn decode(&self, response: &str) -> Result<DecodedBatch, DecodeError> {
        let text = response.trim();
        if text.is_empty() {
            return Err(DecodeError::Empty);
        }
        if text.len() > self.max_len {
            return Err(DecodeError::TooLong {
                len: text.len(),
                max: self.max_len,
            });
        }

        let (items, strategy) = self.locate_array(text)?;
        let mut suggestions = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for item in items {
            match serde_json::from_value::<RawSuggestion>(item) {
                Ok(raw) => suggestions.push(raw),
                Err(_) => skipped += 1,
            }
        }

        Ok(DecodedBatch {
            suggestions,
            strategy,
            skipped,
        })
    }

    fn locate_array(&self, text: &str) -> Result<(Vec<Value>, DecodeStrategy), DecodeError> {
        if let Some(items) = parse_array(text) {
            return Ok((items, DecodeStrategy::Strict));
        }

        if let Some(items) = extract_from_code_block(text).and_then(|block| parse_array(&block)) {
            return Ok((items, DecodeStrategy::CodeFence));
        }

        let Some(start) = text.find('[') else {
            return Err(DecodeError::NoArray);
        };

        if let Some(items) = extract_balanced(text, start).and_then(parse_array) {
            return Ok((items, DecodeStrategy::BracketScan));
        }

        match repair_truncated(text, start) {
            Some(repaired) => parse_array(&repaired)
                .map(|items| (items, DecodeStrategy::Repaired))
                .ok_or_else(|| DecodeError::Unrepairable("repaired text is not a JSON array".into())),
            None => Err(DecodeError::Unrepairable(
                "no complete object after opening bracket".into(),
            )),
        }
    }
}

/// Parses `text` as an array, or as an object wrapping one array field.
fn parse_array(text: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(text.trim()).ok()? {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.into_iter().find_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn extract_from_code_block(text: &str) -> Option<String> {
    let fence = "```";
    let open = text.find(fence)?;
    let after_open = &text[open + fence.len()..];
    // Skip an optional language tag on the fence line.
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find(fence)?;
    Some(body[..close].trim().to_string())
}

/// Returns the balanced span starting at the bracket at `start`.
fn extract_balanced(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut scanner = JsonScanner::default();

    for (offset, c) in text[start..].char_indices() {
        match scanner.structural(c) {
            Some('[' | '{') => depth += 1,
            Some(']' | '}') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Truncates after the last object that closed at array depth and closes
/// the array.
fn repair_truncated(text: &str, start: usize) -> Option<String> {
    let mut depth = 0usize;
    let mut scanner = JsonScanner::default();
    let mut last_complete = None;

    for (offset, c) in text[start..].char_indices() {
        match scanner.structural(c) {
            Some('[' | '{') => depth += 1,
            Some(close @ (']' | '}')) => {
                depth = depth.saturating_sub(1);
                if close == '}' && depth == 1 {
                    last_complete = Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    last_complete.map(|end| format!("{}]", &text[start..end]))
}

/// Tracks string and escape state so brackets inside strings are ignored.
#[derive(Default)]
struct JsonScanner {
    in_string: bool,
    escape_next: bool,
}

impl JsonScanner {
    /// Returns `c` when it is a structural character outside a string.
    fn structural(&mut self, c: char) -> Option<char> {
        if self.escape_next {
            self.escape_next = false;
            return None;
        }
        match c {
            '\\' if self.in_string => {
                self.escape_next = true;
                None
            }
            '"' => {
                self.in_string = !self.in_string;
                None
            }
            _ if self.in_string => None,
            '[' | ']' | '{' | '}' => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ONE: &str = r#"[{"destination":"London","category":"food tours","keyword":"london food tours","clusterKeywords":["borough market tour"],"confidenceScore":80}]"#;

    #[test]
    fn parses_clean_array_strictly() {
        let batch = SuggestionDecoder::new().decode(ONE).unwrap();
        assert_eq!(batch.strategy, DecodeStrategy::Strict);
        assert_eq!(batch.suggestions.len(), 1);
        assert_eq!(batch.suggestions[0].cluster_keywords, vec!["borough market tour"]);
    }

    #[test]
    fn accepts_object_wrapping_an_array() {
        let text = format!(r#"{{"opportunities": {ONE}}}"#);
        let batch = SuggestionDecoder::new().decode(&text).unwrap();
        assert_eq!(batch.strategy, DecodeStrategy::Strict);
        assert_eq!(batch.suggestions.len(), 1);
    }

    #[test]
    fn strips_code_fences() {
        let text = format!("Here you go:\n```json\n{ONE}\n```\nEnjoy.");
        let batch = SuggestionDecoder::new().decode(&text).unwrap();
        assert_eq!(batch.strategy, DecodeStrategy::CodeFence);
    }

    #[test]
    fn finds_array_in_prose() {
        let text = format!("Sure! {ONE} Let me know if you need more.");
        let batch = SuggestionDecoder::new().decode(&text).unwrap();
        assert_eq!(batch.strategy, DecodeStrategy::BracketScan);
    }

    #[test]
    fn ignores_brackets_inside_strings() {
        let text = r#"Result: [{"destination":"Paris","keyword":"paris [night] tours ]"}] done"#;
        let batch = SuggestionDecoder::new().decode(text).unwrap();
        assert_eq!(
            batch.suggestions[0].keyword.as_deref(),
            Some("paris [night] tours ]")
        );
    }

    #[test]
    fn repairs_truncated_array() {
        let text = r#"[{"destination":"Rome","keyword":"rome pasta class"},{"destination":"Rome","keyword":"rome vespa tou"#;
        let batch = SuggestionDecoder::new().decode(text).unwrap();
        assert_eq!(batch.strategy, DecodeStrategy::Repaired);
        assert_eq!(batch.suggestions.len(), 1);
        assert_eq!(batch.suggestions[0].keyword.as_deref(), Some("rome pasta class"));
    }

    #[test]
    fn repair_keeps_nested_objects_intact() {
        let text = r#"[{"destination":"Rome","keyword":"a","extra":{"x":1}},{"destination":"Rome","keyword":"b","extra":{"x":"#;
        let batch = SuggestionDecoder::new().decode(text).unwrap();
        assert_eq!(batch.suggestions.len(), 1);
    }

    #[test]
    fn fails_without_any_array() {
        assert_eq!(
            SuggestionDecoder::new().decode("I cannot help with that.").unwrap_err(),
            DecodeError::NoArray
        );
    }

    #[test]
    fn fails_when_nothing_complete_to_keep() {
        let err = SuggestionDecoder::new().decode(r#"[{"destination":"Ro"#).unwrap_err();
        assert!(matches!(err, DecodeError::Unrepairable(_)));
    }

    #[test]
    fn rejects_empty_and_oversized_input() {
        assert_eq!(SuggestionDecoder::new().decode("  ").unwrap_err(), DecodeError::Empty);
        let err = SuggestionDecoder::new().with_max_len(4).decode("[1,2,3]").unwrap_err();
        assert!(matches!(err, DecodeError::TooLong { .. }));
    }

    #[test]
    fn skips_non_object_elements() {
        let batch = SuggestionDecoder::new()
            .decode(r#"[1, "x", {"destination":"Oslo","keyword":"oslo fjord cruise"}]"#)
            .unwrap();
        assert_eq!(batch.suggestions.len(), 1);
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn accepts_snake_case_and_aliases() {
        let batch = SuggestionDecoder::new()
            .decode(r#"[{"destination":"Oslo","primary_keyword":"oslo kayak","relatedKeywords":["fjord kayak"],"reasoning":"r","confidence":72.6}]"#)
            .unwrap();
        let s = batch.suggestions[0].clone().into_suggestion(2).unwrap();
        assert_eq!(s.keyword, "oslo kayak");
        assert_eq!(s.cluster_keywords, vec!["fjord kayak"]);
        assert_eq!(s.confidence_score.value(), 73);
        assert_eq!(s.iteration_source, 2);
    }

    #[test]
    fn into_suggestion_requires_keyword_and_destination() {
        let raw = RawSuggestion {
            keyword: Some("  ".into()),
            destination: Some("Oslo".into()),
            ..Default::default()
        };
        assert!(raw.into_suggestion(1).is_none());
    }

    #[test]
    fn category_and_niche_fill_each_other() {
        let raw = RawSuggestion {
            keyword: Some("k".into()),
            destination: Some("d".into()),
            niche: Some("wine tasting".into()),
            ..Default::default()
        };
        let s = raw.into_suggestion(1).unwrap();
        assert_eq!(s.category, "wine tasting");
        assert_eq!(s.confidence_score.value(), 50);
    }

    proptest! {
        #[test]
        fn decode_never_panics(text in ".{0,400}") {
            let _ = SuggestionDecoder::new().decode(&text);
        }

        #[test]
        fn truncating_a_valid_array_never_panics(cut in 0usize..200) {
            let text: String = ONE.chars().take(cut).collect();
            let _ = SuggestionDecoder::new().decode(&text);
        }
    }
}
