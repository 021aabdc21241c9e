//! Terminal presentation of answers.
//!
//! Prose is printed as-is. Diagrams are printed inside a ```` ```mermaid ````
//! fence so they stay copy-pasteable into any Mermaid renderer, and can also
//! be exported as standalone `.mmd` files.
//! The chat history is listed one line per turn.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::diagram::DIAGRAM_LANGUAGE;
use crate::models::{AnswerSegment, Turn};

pub fn render_segments(out: &mut impl Write, segments: &[AnswerSegment]) -> std::io::Result<()> {
    for segment in segments {
        match segment {
            AnswerSegment::Prose(text) => {
                if !text.trim().is_empty() {
                    writeln!(out, "{}", text.trim_end())?;
                }
            }
            AnswerSegment::Diagram(text) => {
                writeln!(out, "```{}", DIAGRAM_LANGUAGE)?;
                writeln!(out, "{}", text)?;
                writeln!(out, "```")?;
            }
        }
    }
    Ok(())
}

/// One line per turn: time, role, and the first line of the content.
pub fn render_history(out: &mut impl Write, turns: &[Turn]) -> std::io::Result<()> {
    for turn in turns {
        let first_line = turn.content.lines().next().unwrap_or("");
        writeln!(
            out,
            "[{}] {:<9} {}",
            turn.at.format("%H:%M:%S"),
            turn.role.as_str(),
            first_line
        )?;
    }
    Ok(())
}

/// Write each diagram to `dir/turn-<turn>-<k>.mmd`, returning the paths.
pub fn export_diagrams(
    dir: &Path,
    turn: usize,
    segments: &[AnswerSegment],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create diagram directory: {}", dir.display()))?;

    let mut written = Vec::new();
    for (k, text) in crate::diagram::diagrams(segments).enumerate() {
        let path = dir.join(format!("turn-{}-{}.mmd", turn, k + 1));
        std::fs::write(&path, format!("{}\n", text))
            .with_context(|| format!("Failed to write diagram: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::split_segments;

    #[test]
    fn test_render_mixed() {
        let segments = split_segments("Intro\n```mermaid\nA-->B\n```\nOutro");
        let mut out = Vec::new();
        render_segments(&mut out, &segments).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Intro\n```mermaid\nA-->B\n```\n\nOutro\n"
        );
    }

    #[test]
    fn test_empty_prose_not_printed() {
        let segments = split_segments("```mermaid\nA\n```");
        let mut out = Vec::new();
        render_segments(&mut out, &segments).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "```mermaid\nA\n```\n");
    }

    #[test]
    fn test_render_history() {
        use crate::models::Role;
        use chrono::{TimeZone, Utc};

        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let turns = vec![
            Turn {
                role: Role::User,
                content: "What?".into(),
                at,
            },
            Turn {
                role: Role::Assistant,
                content: "Line one\nLine two".into(),
                at,
            },
        ];
        let mut out = Vec::new();
        render_history(&mut out, &turns).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[03:04:05] user      What?\n[03:04:05] assistant Line one\n"
        );
    }

    #[test]
    fn test_export_diagrams() {
        let tmp = tempfile::TempDir::new().unwrap();
        let segments = split_segments("```mermaid\nA\n```\ntext\n```mermaid\nB\n```");
        let paths = export_diagrams(tmp.path(), 3, &segments).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("turn-3-1.mmd"));
        assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "B\n");
    }
}
