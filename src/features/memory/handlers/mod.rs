pub mod memory_handler;

pub use memory_handler::{
    __path_clear_short_term, __path_get_memory, __path_set_active_url,
    __path_update_long_term, clear_short_term, get_memory, set_active_url, update_long_term,
};
