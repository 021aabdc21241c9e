//! # Repo Pilot
//!
//! Point at a source repository and converse with an LLM that holds the
//! whole repository as context, with architecture diagrams pulled out of the
//! answers for separate rendering.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Materializer │──▶│Context Builder│──▶│   Session    │──▶│ Segments │
//! │  git clone   │   │ filter+concat │   │prefix + query│   │prose/mmd │
//! └──────────────┘   └───────────────┘   └──────┬───────┘   └──────────┘
//!                                               ▼
//!                                          ┌──────────┐
//!                                          │  Oracle  │
//!                                          │ (Gemini) │
//!                                          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pilot ingest https://github.com/pallets/flask     # fetch + summarize
//! pilot ask https://github.com/pallets/flask "How are requests routed?"
//! pilot chat ./data/flask --local                   # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`materialize`] | Fresh local copies of repositories |
//! | [`context`] | Repository-to-context serialization |
//! | [`session`] | Fixed-prefix conversation protocol |
//! | [`diagram`] | Prose/diagram answer splitting |
//! | [`oracle`] | Answering backend abstraction |
//! | [`tokens`] | Token estimation |
//! | [`ingest`] | Pipeline orchestration |
//! | [`render`] | Terminal output and diagram export |

pub mod config;
pub mod context;
pub mod diagram;
pub mod error;
pub mod ingest;
pub mod materialize;
pub mod models;
pub mod oracle;
pub mod render;
pub mod session;
pub mod tokens;
