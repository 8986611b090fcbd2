//! Database layer: repositories over `PgConnection` plus the error
//! categorization shared by all of them.

pub mod errors;
pub mod handlers;
pub mod models;
