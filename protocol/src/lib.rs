//! Data model shared by the Aurora terminal executor, the AI orchestrator
//! and the collaborators that render their results.

pub mod analysis;
pub mod command;
pub mod connection;
pub mod message;
pub mod search;

pub use analysis::CodeImprovement;
pub use analysis::ImpactAssessment;
pub use analysis::PageAnalysis;
pub use command::CommandResult;
pub use command::POLICY_REJECTION_MESSAGE;
pub use command::combine_output;
pub use connection::BackendConnectionState;
pub use connection::ModelInfo;
pub use message::ChatMessage;
pub use message::Role;
pub use search::SearchResponse;
pub use search::SearchResult;
