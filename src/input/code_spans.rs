use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A fenced or inline code fragment found in user input.
///
/// `start_pos..end_pos` are byte offsets into the text the span was
/// extracted from, and `raw` is exactly that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSpan {
    pub id: String,
    pub language: String,
    pub code: String,
    pub raw: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl CodeSpan {
    pub fn is_inline(&self) -> bool {
        self.language == "inline"
    }
}

/// A fenced markdown block: optional language tag, then the body.
pub const FENCED_CODE_PATTERN: &str = r"(?s)```(\w+)?\n?(.*?)\n?```";

#[derive(Debug, Clone)]
pub struct CodeSpanExtractor {
    fenced: Regex,
    inline: Regex,
}

impl CodeSpanExtractor {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            fenced: Regex::new(FENCED_CODE_PATTERN).map_err(ApiError::internal)?,
            inline: Regex::new(r"`([^`]+)`").map_err(ApiError::internal)?,
        })
    }

    /// Fenced blocks first, then inline spans outside of any fenced block.
    pub fn extract(&self, text: &str) -> Vec<CodeSpan> {
        let mut spans = Vec::new();

        for (i, caps) in self.fenced.captures_iter(text).enumerate() {
            let Some(whole) = caps.get(0) else { continue };
            spans.push(CodeSpan {
                id: i.to_string(),
                language: caps
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                code: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                raw: whole.as_str().to_string(),
                start_pos: whole.start(),
                end_pos: whole.end(),
            });
        }

        // blank out fenced blocks so their backticks cannot pair with inline ones
        let mut masked = text.to_string();
        for span in &spans {
            let width = span.end_pos - span.start_pos;
            masked.replace_range(span.start_pos..span.end_pos, &" ".repeat(width));
        }

        let inline_spans: Vec<CodeSpan> = self
            .inline
            .captures_iter(&masked)
            .enumerate()
            .filter_map(|(i, caps)| {
                let whole = caps.get(0)?;
                Some(CodeSpan {
                    id: format!("inline_{}", i),
                    language: "inline".to_string(),
                    code: caps.get(1)?.as_str().to_string(),
                    raw: text[whole.start()..whole.end()].to_string(),
                    start_pos: whole.start(),
                    end_pos: whole.end(),
                })
            })
            .collect();
        spans.extend(inline_spans);

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Why does `sorted(xs)` differ from this?\n```python\nxs.sort()\nprint(xs)\n```\nand this:\n```\nlet v = vec![3, 1];\n```\nAlso `len`.";

    #[test]
    fn extracts_fenced_then_inline_spans() {
        let spans = CodeSpanExtractor::new().unwrap().extract(SAMPLE);

        let ids: Vec<&str> = spans.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "inline_0", "inline_1"]);

        assert_eq!(spans[0].language, "python");
        assert_eq!(spans[0].code, "xs.sort()\nprint(xs)");
        assert_eq!(spans[1].language, "unknown");
        assert_eq!(spans[1].code, "let v = vec![3, 1];");
        assert_eq!(spans[2].code, "sorted(xs)");
        assert_eq!(spans[3].code, "len");
        assert!(spans[3].is_inline());
    }

    #[test]
    fn offsets_reconstruct_the_matched_text() {
        let spans = CodeSpanExtractor::new().unwrap().extract(SAMPLE);
        assert!(!spans.is_empty());

        for span in &spans {
            assert_eq!(&SAMPLE[span.start_pos..span.end_pos], span.raw);
            assert!(span.raw.contains(&span.code));
        }

        // splice every span back at its offsets: the text is unchanged
        let mut ordered = spans.clone();
        ordered.sort_by_key(|s| s.start_pos);
        let mut rebuilt = String::new();
        let mut cursor = 0;
        for span in &ordered {
            rebuilt.push_str(&SAMPLE[cursor..span.start_pos]);
            rebuilt.push_str(&span.raw);
            cursor = span.end_pos;
        }
        rebuilt.push_str(&SAMPLE[cursor..]);
        assert_eq!(rebuilt, SAMPLE);
    }

    #[test]
    fn plain_text_has_no_spans() {
        let spans = CodeSpanExtractor::new()
            .unwrap()
            .extract("Explain binary search");
        assert!(spans.is_empty());
    }
}
