pub mod assistant;
pub mod reference_reader;
mod query_service;

pub use assistant::{Assistant, AssistantReply, AssistantRequest};
pub use query_service::QueryService;
pub use reference_reader::{ReferenceDocument, ReferenceReader};
