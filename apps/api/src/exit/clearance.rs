use crate::errors::AppError;
use crate::models::exit::{ClearanceDepartment, ClearanceRow, ClearanceStatus, ResignationStatus};

/// `Pending -> Approved | Rejected`; a rejected clearance may be reopened.
pub fn check_clearance_update(
    current: ClearanceStatus,
    next: ClearanceStatus,
) -> Result<(), AppError> {
    use ClearanceStatus::*;
    match (current, next) {
        (Pending, Approved | Rejected) | (Rejected, Pending) => Ok(()),
        _ => Err(AppError::InvalidTransition(format!(
            "clearance cannot move from {current:?} to {next:?}"
        ))),
    }
}

pub fn check_resignation_decision(
    current: ResignationStatus,
    decision: ResignationStatus,
) -> Result<(), AppError> {
    if !matches!(
        decision,
        ResignationStatus::Approved | ResignationStatus::Rejected
    ) {
        return Err(AppError::Validation(
            "Decision must be Approved or Rejected".to_string(),
        ));
    }
    if current != ResignationStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "resignation is already {current:?}"
        )));
    }
    Ok(())
}

/// Every department has signed off.
pub fn all_cleared(clearances: &[ClearanceRow]) -> bool {
    ClearanceDepartment::ALL.iter().all(|dept| {
        clearances
            .iter()
            .any(|c| c.department == *dept && c.status == ClearanceStatus::Approved)
    })
}

/// Departments still blocking completion, in fixed order.
pub fn outstanding(clearances: &[ClearanceRow]) -> Vec<ClearanceDepartment> {
    ClearanceDepartment::ALL
        .into_iter()
        .filter(|dept| {
            !clearances
                .iter()
                .any(|c| c.department == *dept && c.status == ClearanceStatus::Approved)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn clearance(department: ClearanceDepartment, status: ClearanceStatus) -> ClearanceRow {
        ClearanceRow {
            id: Uuid::new_v4(),
            exit_process_id: Uuid::nil(),
            user_id: Uuid::nil(),
            department,
            status,
            remarks: None,
            approved_by: None,
            approved_at: None,
        }
    }

    #[test]
    fn test_clearance_transitions() {
        use ClearanceStatus::*;
        assert!(check_clearance_update(Pending, Approved).is_ok());
        assert!(check_clearance_update(Pending, Rejected).is_ok());
        assert!(check_clearance_update(Rejected, Pending).is_ok());
        assert!(check_clearance_update(Approved, Rejected).is_err());
        assert!(check_clearance_update(Rejected, Approved).is_err());
        assert!(check_clearance_update(Pending, Pending).is_err());
    }

    #[test]
    fn test_resignation_decision() {
        use ResignationStatus::*;
        assert!(check_resignation_decision(Pending, Approved).is_ok());
        assert!(check_resignation_decision(Pending, Rejected).is_ok());
        assert!(check_resignation_decision(Approved, Rejected).is_err());
        assert!(check_resignation_decision(Pending, Completed).is_err());
    }

    #[test]
    fn test_all_cleared_needs_every_department() {
        let mut rows: Vec<ClearanceRow> = ClearanceDepartment::ALL
            .into_iter()
            .map(|d| clearance(d, ClearanceStatus::Approved))
            .collect();
        assert!(all_cleared(&rows));
        assert!(outstanding(&rows).is_empty());

        rows[1].status = ClearanceStatus::Rejected;
        assert!(!all_cleared(&rows));
        assert_eq!(outstanding(&rows), vec![ClearanceDepartment::Finance]);

        rows.remove(1);
        assert!(!all_cleared(&rows));
    }

    #[test]
    fn test_no_clearances_means_not_cleared() {
        assert!(!all_cleared(&[]));
        assert_eq!(outstanding(&[]).len(), 4);
    }
}
