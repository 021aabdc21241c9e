//! Splitting model answers into prose and diagram segments.
//!
//! Answers are free-form Markdown. Diagrams arrive as fenced blocks tagged
//! with [`DIAGRAM_LANGUAGE`]:
//!
//! ````text
//! Some prose.
//! ```mermaid
//! graph TD; A-->B
//! ```
//! More prose.
//! ````
//!
//! [`split_segments`] is a small state machine over fence lines. A fence is
//! a line that starts with at most three spaces of indent followed by a run of
//! three or more backticks; backticks in the middle of a line are ordinary
//! text. A block is closed by a bare fence at least as long as its opener.
//! Fences tagged with any other language are foreign code blocks and stay
//! inside the surrounding prose. The result always alternates
//! `Prose, Diagram, Prose, ...` and ends with prose, so `n` complete diagrams
//! give `2n + 1` segments. An unterminated fence never produces a diagram:
//! it and everything after it are kept as prose, verbatim.

use crate::models::AnswerSegment;

/// Info-string keyword that marks a fenced block as a diagram.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

const MIN_FENCE: usize = 3;
const MAX_INDENT: usize = 3;

#[derive(Debug, Clone, Copy)]
enum State {
    Prose,
    /// Inside a fenced block tagged with some other language.
    ForeignCode { ticks: usize },
    /// Inside a diagram whose body starts at `body_start`; the opening fence
    /// line started at `fence_start`.
    Diagram {
        fence_start: usize,
        body_start: usize,
        ticks: usize,
    },
}

/// A fence line.
struct Fence<'a> {
    ticks: usize,
    /// Byte offset just past the backtick run.
    end: usize,
    info: &'a str,
}

impl Fence<'_> {
    fn can_open(&self) -> bool {
        !self.info.contains('`')
    }

    fn closes(&self, open_ticks: usize) -> bool {
        self.ticks >= open_ticks && self.info.is_empty()
    }

    fn language(&self) -> &str {
        self.info.split_whitespace().next().unwrap_or("")
    }
}

/// Split `text` into ordered prose and diagram segments.
pub fn split_segments(text: &str) -> Vec<AnswerSegment> {
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut line_start = 0;
    let mut state = State::Prose;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();

        if let Some(fence) = parse_fence(line, line_start) {
            state = match state {
                State::Prose if !fence.can_open() => State::Prose,
                State::Prose => {
                    if fence.language().eq_ignore_ascii_case(DIAGRAM_LANGUAGE) {
                        State::Diagram {
                            fence_start: line_start,
                            body_start: line_end,
                            ticks: fence.ticks,
                        }
                    } else {
                        State::ForeignCode { ticks: fence.ticks }
                    }
                }
                State::ForeignCode { ticks } if fence.closes(ticks) => State::Prose,
                State::Diagram {
                    fence_start,
                    body_start,
                    ticks,
                } if fence.closes(ticks) => {
                    segments.push(AnswerSegment::Prose(
                        text[prose_start..fence_start].to_string(),
                    ));
                    segments.push(AnswerSegment::Diagram(
                        text[body_start..line_start].trim().to_string(),
                    ));
                    prose_start = fence.end;
                    State::Prose
                }
                open => open,
            };
        }

        line_start = line_end;
    }

    // Whatever is left, including an unterminated fence, is prose.
    segments.push(AnswerSegment::Prose(text[prose_start..].to_string()));
    segments
}

/// Diagram bodies only, in order.
pub fn diagrams(segments: &[AnswerSegment]) -> impl Iterator<Item = &str> {
    segments
        .iter()
        .filter(|s| s.is_diagram())
        .map(AnswerSegment::text)
}

/// Recognize `line` (starting at byte `offset` of the answer) as a fence.
fn parse_fence(line: &str, offset: usize) -> Option<Fence<'_>> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > MAX_INDENT {
        return None;
    }
    let rest = &line[indent..];
    let ticks = rest.len() - rest.trim_start_matches('`').len();
    if ticks < MIN_FENCE {
        return None;
    }
    Some(Fence {
        ticks,
        end: offset + indent + ticks,
        info: rest[ticks..].trim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnswerSegment::{Diagram, Prose};

    #[test]
    fn test_no_fence_single_prose() {
        let segments = split_segments("Just an explanation.");
        assert_eq!(segments, vec![Prose("Just an explanation.".into())]);
    }

    #[test]
    fn test_empty_answer() {
        assert_eq!(split_segments(""), vec![Prose(String::new())]);
    }

    #[test]
    fn test_one_diagram_three_segments() {
        let text = "Flow:\n```mermaid\ngraph TD\n  A-->B\n```\nDone.";
        let segments = split_segments(text);
        assert_eq!(
            segments,
            vec![
                Prose("Flow:\n".into()),
                Diagram("graph TD\n  A-->B".into()),
                Prose("\nDone.".into()),
            ]
        );
    }

    #[test]
    fn test_trailing_prose_may_be_empty() {
        let segments = split_segments("```mermaid\ngraph LR; X-->Y\n```");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Prose(String::new()));
        assert_eq!(segments[1], Diagram("graph LR; X-->Y".into()));
        assert_eq!(segments[2], Prose(String::new()));
    }

    #[test]
    fn test_multiple_diagrams() {
        let text = "a\n```mermaid\nA\n```\nb\n```mermaid\nB\n```\nc";
        let segments = split_segments(text);
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[1], Diagram("A".into()));
        assert_eq!(segments[2], Prose("\nb\n".into()));
        assert_eq!(segments[3], Diagram("B".into()));
        assert_eq!(segments[4], Prose("\nc".into()));
    }

    #[test]
    fn test_foreign_code_stays_in_prose() {
        let text = "Use:\n```rust\nfn main() {}\n```\nthen\n```mermaid\nA-->B\n```\n";
        let segments = split_segments(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(
            segments[0],
            Prose("Use:\n```rust\nfn main() {}\n```\nthen\n".into())
        );
        assert_eq!(segments[1], Diagram("A-->B".into()));
    }

    #[test]
    fn test_unterminated_diagram_is_prose() {
        let text = "Intro\n```mermaid\ngraph TD\nA-->B";
        let segments = split_segments(text);
        assert_eq!(segments, vec![Prose(text.into())]);
    }

    #[test]
    fn test_odd_fences_after_complete_diagram() {
        let text = "x\n```mermaid\nA\n```\ny\n```mermaid\nB";
        let segments = split_segments(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Diagram("A".into()));
        assert_eq!(segments[2], Prose("\ny\n```mermaid\nB".into()));
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let segments = split_segments("see\n```Mermaid\ngraph TD; A-->B\n```\nok");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Diagram("graph TD; A-->B".into()));
        assert_eq!(segments[2], Prose("\nok".into()));
    }

    #[test]
    fn test_mid_line_backticks_are_prose() {
        let text = "Wrap code in ``` fences.\n```mermaid\ngraph TD\nA-->B\n```\nDone.";
        let segments = split_segments(text);
        assert_eq!(
            segments,
            vec![
                Prose("Wrap code in ``` fences.\n".into()),
                Diagram("graph TD\nA-->B".into()),
                Prose("\nDone.".into()),
            ]
        );
    }

    #[test]
    fn test_inline_fence_is_not_a_diagram() {
        let text = "see ```mermaid graph TD; A-->B ``` ok";
        assert_eq!(split_segments(text), vec![Prose(text.into())]);
    }

    #[test]
    fn test_four_backtick_fence() {
        let segments = split_segments("x\n````mermaid\nA-->B\n````\ny");
        assert_eq!(
            segments,
            vec![
                Prose("x\n".into()),
                Diagram("A-->B".into()),
                Prose("\ny".into()),
            ]
        );
    }

    #[test]
    fn test_shorter_fence_does_not_close() {
        let segments = split_segments("````mermaid\nA\n```\nB\n````\nend");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Diagram("A\n```\nB".into()));
    }

    #[test]
    fn test_indented_fences() {
        let segments = split_segments("a\n   ```mermaid\nA\n  ```\nb");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Prose("a\n".into()));
        assert_eq!(segments[1], Diagram("A".into()));
        assert_eq!(segments[2], Prose("\nb".into()));

        // Four spaces is an indented code line, not a fence.
        let text = "    ```mermaid\nA\n    ```";
        assert_eq!(split_segments(text), vec![Prose(text.into())]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let segments = split_segments("x\r\n```mermaid\r\nA-->B\r\n```\r\ny");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1], Diagram("A-->B".into()));
        assert_eq!(segments[2], Prose("\r\ny".into()));
    }

    #[test]
    fn test_foreign_fence_with_info_is_not_a_closer() {
        // A tagged fence inside a code block is content, not a closer.
        let text = "```text\n```mermaid\nA\n```\nafter";
        assert_eq!(split_segments(text), vec![Prose(text.into())]);
    }

    #[test]
    fn test_prefix_of_keyword_is_not_diagram() {
        let segments = split_segments("```mermaidjs\nA\n```");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_diagrams_iterator() {
        let segments = split_segments("```mermaid\nA\n```\n```mermaid\nB\n```");
        let found: Vec<&str> = diagrams(&segments).collect();
        assert_eq!(found, vec!["A", "B"]);
    }
}
