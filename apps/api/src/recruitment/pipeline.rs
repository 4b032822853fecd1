//! Hiring pipeline transitions for job applications.

use crate::errors::AppError;
use crate::models::recruitment::ApplicationStatus;

/// `Hired` and `Rejected` are terminal.
pub fn is_terminal(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::Hired | ApplicationStatus::Rejected
    )
}

pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    matches!(
        (from, to),
        (Pending, Shortlisted | Rejected | Interview)
            | (Shortlisted, Pending | Interview | Hired | Rejected)
            | (Interview, Hired | Rejected | Shortlisted)
    )
}

pub fn check_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<(), AppError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "application cannot move from {} to {}",
            from.as_str(),
            to.as_str()
        )))
    }
}

/// An open application can take further interviews; closed ones cannot.
pub fn check_schedulable(status: ApplicationStatus) -> Result<(), AppError> {
    if is_terminal(status) {
        return Err(AppError::InvalidTransition(format!(
            "application is already {}; no interview can be scheduled",
            status.as_str()
        )));
    }
    if status == ApplicationStatus::Interview {
        return Ok(());
    }
    check_transition(status, ApplicationStatus::Interview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_forward_path_to_hire() {
        assert!(can_transition(Pending, Shortlisted));
        assert!(can_transition(Shortlisted, Interview));
        assert!(can_transition(Interview, Hired));
    }

    #[test]
    fn test_shortlist_can_be_undone() {
        assert!(can_transition(Shortlisted, Pending));
        assert!(can_transition(Interview, Shortlisted));
    }

    #[test]
    fn test_pending_cannot_jump_to_hired() {
        assert!(!can_transition(Pending, Hired));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in [Pending, Shortlisted, Interview, Hired, Rejected] {
            assert!(!can_transition(Hired, to));
            assert!(!can_transition(Rejected, to));
        }
        assert!(is_terminal(Hired) && is_terminal(Rejected));
        assert!(!is_terminal(Interview));
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert!(matches!(
            check_transition(Pending, Pending),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_interviews_only_for_open_applications() {
        assert!(check_schedulable(Pending).is_ok());
        assert!(check_schedulable(Shortlisted).is_ok());
        assert!(check_schedulable(Interview).is_ok());
        assert!(matches!(
            check_schedulable(Hired),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(check_schedulable(Rejected).is_err());
    }
}
