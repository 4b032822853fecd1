//! Job postings, applications, the hiring pipeline and candidate profiles.

pub mod candidates;
pub mod handlers;
pub mod pipeline;
pub mod resume;
pub mod storage;
