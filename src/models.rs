//! Core data models used throughout Repo Pilot.
//!
//! These types represent the files, context documents, conversation turns and
//! answer segments that flow from ingestion to rendering.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// One qualifying source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the repository root, always `/`-separated.
    pub relative_path: String,
    pub content: String,
}

impl FileRecord {
    /// Serialize this record as one context block.
    pub fn to_block(&self) -> String {
        format!(
            "\n--- FILE: {} ---\n{}\n",
            self.relative_path, self.content
        )
    }
}

/// The serialized repository, used verbatim as the prompt prefix.
///
/// Built once per ingestion and never mutated afterwards; re-ingestion
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeContext {
    text: String,
    file_count: usize,
}

impl CodeContext {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let text: String = records.iter().map(FileRecord::to_block).collect();
        Self {
            text,
            file_count: records.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Hex SHA-256 of the context text. Equal fingerprints mean a
    /// byte-identical prefix.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in the session history.
///
/// Assistant turns hold the raw, unsplit answer text.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// A piece of an answer, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSegment {
    Prose(String),
    Diagram(String),
}

impl AnswerSegment {
    pub fn text(&self) -> &str {
        match self {
            Self::Prose(t) | Self::Diagram(t) => t,
        }
    }

    pub fn is_diagram(&self) -> bool {
        matches!(self, Self::Diagram(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, content: &str) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_block_format() {
        assert_eq!(
            record("src/a.py", "print(1)").to_block(),
            "\n--- FILE: src/a.py ---\nprint(1)\n"
        );
    }

    #[test]
    fn test_context_concatenates_in_order() {
        let ctx = CodeContext::from_records(&[record("a.rs", "A"), record("b.rs", "B")]);
        assert_eq!(
            ctx.as_str(),
            "\n--- FILE: a.rs ---\nA\n\n--- FILE: b.rs ---\nB\n"
        );
        assert_eq!(ctx.file_count(), 2);
    }

    #[test]
    fn test_empty_context() {
        let ctx = CodeContext::from_records(&[]);
        assert!(ctx.is_empty());
        assert_eq!(ctx.file_count(), 0);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = CodeContext::from_records(&[record("a.rs", "A")]);
        let b = CodeContext::from_records(&[record("a.rs", "A")]);
        let c = CodeContext::from_records(&[record("a.rs", "C")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
