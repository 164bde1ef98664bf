// ============================================================
// Layer 4 — JSON Lines Example Loader
// ============================================================
// Streams raw examples from a .jsonl file, one record per line:
//
//   {"text": "First document ...", "url": "...", "meta": {...}}
//   {"text": "Second document ...", "timestamp": 1699999999}
//
// Only the designated text field is kept — every other column
// is dropped at parse time, so nothing downstream ever sees it.
//
// The file is read lazily with a BufReader, so corpora far
// larger than RAM stream through in constant memory.
//
// Bad lines vs bad files:
//   - A line that is not UTF-8, not JSON, or lacks the text
//     field is skipped with a warning (web-scale corpora are noisy)
//   - An I/O error while reading is returned to the caller
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling), §13 (Iterators)

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::example::Example;
use crate::domain::traits::ExampleSource;
use crate::error::PipelineError;

/// Loads examples from a JSON-lines file.
/// Implements the ExampleSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    /// Path to the .jsonl file
    path: PathBuf,
    /// Name of the column holding the text to tokenise
    text_field: String,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>, text_field: impl Into<String>) -> Self {
        Self {
            path:       path.into(),
            text_field: text_field.into(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl ExampleSource for JsonlSource {
    type Iter = JsonlExamples<BufReader<File>>;

    fn examples(&self) -> Result<Self::Iter, PipelineError> {
        let file = File::open(&self.path)?;
        tracing::info!(
            "Streaming examples from '{}' (text field: '{}')",
            self.path.display(),
            self.text_field
        );
        Ok(JsonlExamples::new(BufReader::new(file), self.text_field.clone()))
    }
}

/// Lazy iterator over the examples of one pass through a reader.
pub struct JsonlExamples<R> {
    reader:     R,
    /// Raw bytes of the current line, reused between pulls
    line:       Vec<u8>,
    text_field: String,
    line_no:    usize,
    skipped:    usize,
}

impl<R: BufRead> JsonlExamples<R> {
    pub fn new(reader: R, text_field: impl Into<String>) -> Self {
        Self {
            reader,
            line:       Vec::new(),
            text_field: text_field.into(),
            line_no:    0,
            skipped:    0,
        }
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for JsonlExamples<R> {
    type Item = Result<Example, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0)  => return None,
                Ok(_)  => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            // JSON is UTF-8; a line that is not counts as a bad record
            let Ok(line) = std::str::from_utf8(&self.line) else {
                self.skipped += 1;
                tracing::warn!("Skipping line {}: not valid UTF-8", self.line_no);
                continue;
            };

            // Blank lines are common at the end of files — not worth a warning
            if line.trim().is_empty() {
                continue;
            }

            match parse_record(line, &self.text_field) {
                Some(example) => return Some(Ok(example)),
                None => {
                    self.skipped += 1;
                    tracing::warn!(
                        "Skipping line {}: not a JSON object with a string '{}' field",
                        self.line_no,
                        self.text_field
                    );
                }
            }
        }
    }
}

/// Parse one JSON record and keep only its text column.
/// Returns None when the line is not JSON or the field is missing
/// or not a string.
pub fn parse_record(line: &str, text_field: &str) -> Option<Example> {
    let record: serde_json::Value = serde_json::from_str(line).ok()?;
    let text = record.get(text_field)?.as_str()?;
    Some(Example::new(text))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_extra_columns_are_dropped() {
        let ex = parse_record(r#"{"text": "hello", "url": "http://x", "id": 3}"#, "text");
        assert_eq!(ex, Some(Example::new("hello")));
    }

    #[test]
    fn test_custom_text_field() {
        let ex = parse_record(r#"{"content": "abc", "text": 5}"#, "content");
        assert_eq!(ex, Some(Example::new("abc")));
    }

    #[test]
    fn test_missing_or_non_string_field() {
        assert!(parse_record(r#"{"body": "abc"}"#, "text").is_none());
        assert!(parse_record(r#"{"text": 12}"#, "text").is_none());
        assert!(parse_record("not json", "text").is_none());
    }

    #[test]
    fn test_iterator_skips_bad_lines() {
        let data = "{\"text\": \"a\"}\n\ngarbage\n{\"text\": \"b\", \"x\": 1}\n";
        let mut examples = JsonlExamples::new(Cursor::new(data), "text");

        let texts: Vec<String> = examples
            .by_ref()
            .map(|r| r.unwrap().text)
            .collect();

        assert_eq!(texts, vec!["a", "b"]);
        // Only the garbage line counts — the blank line is ignored silently
        assert_eq!(examples.skipped(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut data = b"{\"text\": \"a\"}\n".to_vec();
        data.extend_from_slice(b"{\"text\": \"\xff\xfe\"}\n");
        data.extend_from_slice(b"{\"text\": \"b\"}\n");
        let mut examples = JsonlExamples::new(Cursor::new(data), "text");

        let texts: Vec<String> = examples
            .by_ref()
            .map(|r| r.unwrap().text)
            .collect();

        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(examples.skipped(), 1);
    }

    #[test]
    fn test_last_line_without_newline() {
        let examples = JsonlExamples::new(Cursor::new("{\"text\": \"a\"}\n{\"text\": \"z\"}"), "text");
        let texts: Vec<String> = examples.map(|r| r.unwrap().text).collect();
        assert_eq!(texts, vec!["a", "z"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = JsonlSource::new("/definitely/not/here.jsonl", "text");
        assert!(matches!(source.examples(), Err(PipelineError::Io(_))));
    }
}
