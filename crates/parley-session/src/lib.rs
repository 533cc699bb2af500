//! Streaming analysis conversations: session state, orchestration and history

mod backend;
mod gate;
mod ledger;
mod orchestrator;
mod request;
mod session;

pub use backend::{AnalysisBackend, BackendCall, ScriptedBackend, StartedAnalysis};
pub use gate::{check_capability, ToolStatus};
pub use ledger::HistoryLedger;
pub use orchestrator::AnalysisOrchestrator;
pub use request::AnalysisRequest;
pub use session::{ConversationSession, SessionSnapshot};
