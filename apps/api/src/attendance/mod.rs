//! Daily check-in/check-out, HR marking and monthly summaries.

pub mod handlers;
pub mod summary;
