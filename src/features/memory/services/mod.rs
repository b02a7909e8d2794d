mod memory_store;

pub use memory_store::{recent_from, ConversationEntry, Document, MemoryKind, MemoryStore};
