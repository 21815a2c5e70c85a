//! Question answering runtime.
//!
//! A single tool, `CompanyFAQ`, answers every utterance by retrieving a page
//! of results from the knowledge index, annotating them with their source,
//! composing a guarded prompt and asking the hosted model for an answer.
//!
//! # Flow
//!
//! 1. **Retrieval** (`search`) - query the index, keep at most one page
//! 2. **Composition** - annotate results and build the prompt (`askdesk-core`)
//! 3. **Generation** (`llm`) - invoke the model, take the first text block
//! 4. **Recovery** (`recovery`) - turn recoverable failures into a fallback answer
//!
//! `SingleToolAgent` (see `runtime`) is the only place failures are absorbed.
//! Nothing is remembered between questions.

pub mod llm;
pub mod recovery;
pub mod runtime;
pub mod search;
pub mod tools;

pub use llm::{extract_answer, GenerationClient, InvokeModelClient};
pub use recovery::{RecoveryDecision, RecoveryPolicy};
pub use runtime::{RunContext, RunOutcome, SingleToolAgent};
pub use search::{IndexSearchClient, SearchClient};
pub use tools::{CompanyFaqTool, Tool, COMPANY_FAQ_DESCRIPTION, COMPANY_FAQ_TOOL};
