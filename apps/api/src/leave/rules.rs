//! Date rules for leave requests.

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::leave::LeaveStatus;

/// Longest single request, in calendar days.
pub const MAX_LEAVE_DAYS: i64 = 90;

/// Checks a requested span and returns its inclusive length in days.
pub fn validate_span(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<i32, AppError> {
    if start < today {
        return Err(AppError::Validation(
            "Start date cannot be in the past".to_string(),
        ));
    }
    if end < start {
        return Err(AppError::Validation(
            "End date must be on or after start date".to_string(),
        ));
    }
    if (end - start).num_days() + 1 > MAX_LEAVE_DAYS {
        return Err(AppError::Validation(format!(
            "A leave request cannot exceed {MAX_LEAVE_DAYS} days"
        )));
    }
    Ok(inclusive_days(start, end))
}

pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i32 {
    (end - start).num_days() as i32 + 1
}

pub fn spans_overlap(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// HR may only approve or reject; cancelling belongs to the employee.
pub fn check_decision(current: LeaveStatus, decision: LeaveStatus) -> Result<(), AppError> {
    if !matches!(decision, LeaveStatus::Approved | LeaveStatus::Rejected) {
        return Err(AppError::Validation(
            "Decision must be Approved or Rejected".to_string(),
        ));
    }
    if current != LeaveStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "leave request is already {current:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_single_day_counts_as_one() {
        let today = d(2026, 3, 2);
        assert_eq!(validate_span(today, today, today).unwrap(), 1);
    }

    #[test]
    fn test_span_across_month_boundary() {
        assert_eq!(inclusive_days(d(2026, 1, 30), d(2026, 2, 2)), 4);
    }

    #[test]
    fn test_span_length_is_capped() {
        let today = d(2026, 1, 1);
        // 2026-01-01 ..= 2026-03-31 is exactly 90 days
        assert_eq!(validate_span(today, d(2026, 3, 31), today).unwrap(), 90);
        assert!(matches!(
            validate_span(today, d(2026, 4, 1), today),
            Err(AppError::Validation(_))
        ));
        assert!(validate_span(today, d(9999, 12, 31), today).is_err());
    }

    #[test]
    fn test_rejects_past_start_and_inverted_span() {
        let today = d(2026, 3, 10);
        assert!(validate_span(d(2026, 3, 9), d(2026, 3, 12), today).is_err());
        assert!(validate_span(d(2026, 3, 12), d(2026, 3, 11), today).is_err());
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let a = (d(2026, 5, 1), d(2026, 5, 5));
        assert!(spans_overlap(a, (d(2026, 5, 5), d(2026, 5, 8))));
        assert!(spans_overlap(a, (d(2026, 4, 28), d(2026, 5, 1))));
        assert!(spans_overlap(a, (d(2026, 5, 2), d(2026, 5, 3))));
        assert!(!spans_overlap(a, (d(2026, 5, 6), d(2026, 5, 9))));
    }

    #[test]
    fn test_decisions() {
        assert!(check_decision(LeaveStatus::Pending, LeaveStatus::Approved).is_ok());
        assert!(check_decision(LeaveStatus::Pending, LeaveStatus::Rejected).is_ok());
        assert!(matches!(
            check_decision(LeaveStatus::Approved, LeaveStatus::Rejected),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            check_decision(LeaveStatus::Pending, LeaveStatus::Cancelled),
            Err(AppError::Validation(_))
        ));
    }
}
