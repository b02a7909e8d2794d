mod memory_dto;

pub use memory_dto::*;
