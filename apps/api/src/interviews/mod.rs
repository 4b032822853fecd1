pub mod handlers;

use crate::errors::AppError;
use crate::models::interview::InterviewStatus;

/// Only a `Scheduled` interview can be resolved, and never back to `Scheduled`.
pub fn check_update(current: InterviewStatus, next: InterviewStatus) -> Result<(), AppError> {
    if current != InterviewStatus::Scheduled {
        return Err(AppError::InvalidTransition(format!(
            "interview is already {current:?}"
        )));
    }
    if next == InterviewStatus::Scheduled {
        return Err(AppError::Validation(
            "Status must be Completed, Cancelled or No Show".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_rating(rating: Option<i32>) -> Result<(), AppError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_interviews_can_be_resolved() {
        for next in [
            InterviewStatus::Completed,
            InterviewStatus::Cancelled,
            InterviewStatus::NoShow,
        ] {
            assert!(check_update(InterviewStatus::Scheduled, next).is_ok());
        }
    }

    #[test]
    fn test_resolved_interviews_are_frozen() {
        assert!(matches!(
            check_update(InterviewStatus::Completed, InterviewStatus::Cancelled),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(check_update(InterviewStatus::Scheduled, InterviewStatus::Scheduled).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(None).is_ok());
        assert!(validate_rating(Some(1)).is_ok());
        assert!(validate_rating(Some(5)).is_ok());
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
    }
}
