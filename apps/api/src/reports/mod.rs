//! CSV exports for HR.

pub mod csv;
pub mod handlers;
