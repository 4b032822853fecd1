//! Monthly payroll generation, approval and payslips.

pub mod calc;
pub mod handlers;

use crate::errors::AppError;
use crate::models::payroll::PayrollStatus;

/// Payroll moves strictly forward: Generated -> Approved -> Paid.
pub fn check_transition(from: PayrollStatus, to: PayrollStatus) -> Result<(), AppError> {
    let allowed = matches!(
        (from, to),
        (PayrollStatus::Generated, PayrollStatus::Approved)
            | (PayrollStatus::Approved, PayrollStatus::Paid)
    );
    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "payroll cannot move from {from:?} to {to:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(check_transition(PayrollStatus::Generated, PayrollStatus::Approved).is_ok());
        assert!(check_transition(PayrollStatus::Approved, PayrollStatus::Paid).is_ok());
    }

    #[test]
    fn test_skipping_or_reversing_rejected() {
        assert!(check_transition(PayrollStatus::Generated, PayrollStatus::Paid).is_err());
        assert!(check_transition(PayrollStatus::Paid, PayrollStatus::Approved).is_err());
        assert!(check_transition(PayrollStatus::Approved, PayrollStatus::Approved).is_err());
    }
}
