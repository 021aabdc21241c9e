//! Conversation sessions over a fixed repository context.
//!
//! A [`Session`] starts empty, receives a [`CodeContext`] through
//! [`Session::set_context`], and then answers any number of questions with
//! [`Session::ask`]. The context is sent verbatim as the leading part of
//! every request and is never modified between turns, so the serving side
//! sees a byte-identical prefix and can reuse cached work for it.
//!
//! ```text
//!  Empty ──set_context──▶ Ready ──ask──▶ Ready
//!                           ▲              │
//!                           └──────────────┘
//! ```
//!
//! History stores raw answers. Splitting into prose and diagrams happens at
//! presentation time via [`Turn::segments`].

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::diagram::split_segments;
use crate::error::SessionError;
use crate::models::{AnswerSegment, CodeContext, Role, Turn};
use crate::oracle::{Oracle, OracleRequest};

/// Role and response rules sent with every question.
pub const SYSTEM_INSTRUCTION: &str = "You are a Senior Software Architect. You have the entire codebase in your context.\n\n\
FEATURE: IMPACT ANALYSIS\n\
When a user proposes a change (e.g., 'I want to change the response format'), you must:\n\
1. List all files that import or depend on the modified function.\n\
2. Rank the risk of the change (Low/Medium/High).\n\
3. Provide a 'Step-by-Step Implementation Plan' with specific file paths.\n\n\
FEATURE: ARCHITECTURE DIAGRAMS\n\
Always include a ```mermaid graph if a visual helps explain the data flow.";

/// Placed between the context prefix and the user's query.
pub const QUESTION_SEPARATOR: &str = "\n\nUser Question: ";

/// Canned questions offered alongside free-form chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Onboarding,
    RiskAreas,
}

impl QuickAction {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Onboarding => "Give me a high-level technical onboarding guide for a new developer. What are the 3 most important files to understand?",
            Self::RiskAreas => "Which parts of this codebase are the most complex or 'brittle' (highest technical debt)?",
        }
    }
}

impl Turn {
    /// Prose and diagram segments of this turn's content.
    pub fn segments(&self) -> Vec<AnswerSegment> {
        split_segments(&self.content)
    }
}

/// One conversation about one repository.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    context: Option<CodeContext>,
    turns: Vec<Turn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            context: None,
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> Option<&CodeContext> {
        self.context.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.context.is_some()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Install `context` as the fixed prefix, replacing any previous one.
    pub fn set_context(&mut self, context: CodeContext) {
        info!(
            session = %self.id,
            files = context.file_count(),
            fingerprint = %context.fingerprint(),
            "context set"
        );
        self.context = Some(context);
    }

    /// The request that `ask(query)` would send.
    pub fn request_for(&self, query: &str) -> Result<OracleRequest, SessionError> {
        let context = self.context.as_ref().ok_or(SessionError::NoContext)?;
        Ok(OracleRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            prefix: context.as_str().to_string(),
            question: format!("{}{}", QUESTION_SEPARATOR, query),
        })
    }

    /// Ask one question against the current context.
    ///
    /// Fails with [`SessionError::NoContext`] before contacting the oracle if
    /// no context is set. On oracle failure the history is left unchanged.
    pub async fn ask(
        &mut self,
        oracle: &dyn Oracle,
        query: &str,
    ) -> Result<Vec<AnswerSegment>, SessionError> {
        let request = self.request_for(query)?;

        info!(
            session = %self.id,
            turn = self.turns.len() / 2,
            model = oracle.model_name(),
            "asking"
        );

        let answer = match oracle.answer(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(session = %self.id, error = %e, "oracle call failed");
                return Err(e.into());
            }
        };

        let segments = split_segments(&answer);
        let now = Utc::now();
        self.turns.push(Turn {
            role: Role::User,
            content: query.to_string(),
            at: now,
        });
        self.turns.push(Turn {
            role: Role::Assistant,
            content: answer,
            at: now,
        });

        Ok(segments)
    }

    pub async fn ask_action(
        &mut self,
        oracle: &dyn Oracle,
        action: QuickAction,
    ) -> Result<Vec<AnswerSegment>, SessionError> {
        self.ask(oracle, action.prompt()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRecord;

    fn context() -> CodeContext {
        CodeContext::from_records(&[FileRecord {
            relative_path: "main.go".into(),
            content: "package main".into(),
        }])
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(!session.is_ready());
        assert!(session.turns().is_empty());
        assert!(matches!(
            session.request_for("hi"),
            Err(SessionError::NoContext)
        ));
    }

    #[test]
    fn test_request_layout() {
        let mut session = Session::new();
        session.set_context(context());
        let request = session.request_for("How does it start?").unwrap();
        assert_eq!(request.prefix, "\n--- FILE: main.go ---\npackage main\n");
        assert_eq!(request.question, "\n\nUser Question: How does it start?");
        assert!(request.system_instruction.contains("Low/Medium/High"));
        assert!(request.system_instruction.contains("```mermaid"));
    }

    #[test]
    fn test_set_context_replaces() {
        let mut session = Session::new();
        session.set_context(context());
        let replacement = CodeContext::from_records(&[]);
        session.set_context(replacement.clone());
        assert_eq!(session.context(), Some(&replacement));
    }

    #[test]
    fn test_quick_action_prompts() {
        assert!(QuickAction::Onboarding.prompt().contains("onboarding guide"));
        assert!(QuickAction::RiskAreas.prompt().contains("technical debt"));
    }

    #[test]
    fn test_turn_segments() {
        let turn = Turn {
            role: Role::Assistant,
            content: "x\n```mermaid\nA-->B\n```\n".into(),
            at: Utc::now(),
        };
        assert_eq!(turn.segments().len(), 3);
    }
}
