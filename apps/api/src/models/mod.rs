pub mod attendance;
pub mod exit;
pub mod interview;
pub mod leave;
pub mod notification;
pub mod payroll;
pub mod performance;
pub mod recruitment;
pub mod user;
