pub mod handlers;
pub mod rules;
