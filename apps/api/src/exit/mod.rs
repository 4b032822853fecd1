//! Resignations, exit processes and departmental clearances.

pub mod clearance;
pub mod handlers;
