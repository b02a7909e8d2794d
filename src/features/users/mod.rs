//! Account management feature.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/profile` | Account fields + long-term `user_profile` |
//! | DELETE | `/user/{username}` | Delete own account and everything it owns |
//! | PATCH | `/api/admin/users/{username}` | Admin: change upload quota or role |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
