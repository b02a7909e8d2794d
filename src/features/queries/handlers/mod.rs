pub mod query_handler;

pub use query_handler::{
    __path_ask, __path_get_query, __path_list_queries, ask, get_query, list_queries,
};
