//! Salary arithmetic: the fixed-percentage payslip breakdown and the attendance adjustment.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const HRA_RATE: f64 = 0.30;
pub const CONVEYANCE_ALLOWANCE: f64 = 1920.0;
pub const MEDICAL_ALLOWANCE: f64 = 1250.0;
pub const LTA_ALLOWANCE: f64 = 1000.0;
pub const PF_RATE: f64 = 0.12;
pub const PROFESSIONAL_TAX: f64 = 200.0;
/// Working days assumed in every month.
pub const STANDARD_WORKING_DAYS: u32 = 22;
/// A late day costs this fraction of a day's pay.
pub const LATE_DAY_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    pub basic: f64,
    pub hra: f64,
    pub conveyance: f64,
    pub medical: f64,
    pub lta: f64,
    pub gross: f64,
    pub provident_fund: f64,
    pub professional_tax: f64,
    pub total_deductions: f64,
    pub net: f64,
}

/// gross = basic + HRA + fixed allowances; net = gross - PF - professional tax.
/// HRA and PF are rounded to whole units.
pub fn compute_breakdown(basic: f64) -> SalaryBreakdown {
    let hra = (basic * HRA_RATE).round();
    let gross = basic + hra + CONVEYANCE_ALLOWANCE + MEDICAL_ALLOWANCE + LTA_ALLOWANCE;
    let provident_fund = (basic * PF_RATE).round();
    let total_deductions = provident_fund + PROFESSIONAL_TAX;
    SalaryBreakdown {
        basic,
        hra,
        conveyance: CONVEYANCE_ALLOWANCE,
        medical: MEDICAL_ALLOWANCE,
        lta: LTA_ALLOWANCE,
        gross,
        provident_fund,
        professional_tax: PROFESSIONAL_TAX,
        total_deductions,
        net: gross - total_deductions,
    }
}

/// Days per attendance status within one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceCounts {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub leave: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceAdjustment {
    pub working_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub leave_days: u32,
    /// Working days with no Present, Late or Leave record.
    pub absent_days: u32,
    pub daily_rate: f64,
    pub deduction: f64,
}

pub fn attendance_adjustment(basic: f64, counts: AttendanceCounts) -> AttendanceAdjustment {
    let attended = counts.present + counts.late + counts.leave;
    let absent_days = STANDARD_WORKING_DAYS.saturating_sub(attended);
    let daily_rate = basic / f64::from(STANDARD_WORKING_DAYS);
    let unpaid_days = f64::from(absent_days) + f64::from(counts.late) * LATE_DAY_WEIGHT;
    AttendanceAdjustment {
        working_days: STANDARD_WORKING_DAYS,
        present_days: counts.present,
        late_days: counts.late,
        leave_days: counts.leave,
        absent_days,
        daily_rate: round2(daily_rate),
        deduction: round2(unpaid_days * daily_rate),
    }
}

/// Final take-home after bonus, ad-hoc deductions and attendance deduction. Never negative.
pub fn compute_net(
    breakdown: &SalaryBreakdown,
    attendance_deduction: f64,
    bonus: f64,
    other_deductions: f64,
) -> f64 {
    round2(breakdown.net + bonus - other_deductions - attendance_deduction).max(0.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn validate_amount(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be a non-negative amount"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_for_round_basic() {
        let b = compute_breakdown(50_000.0);
        assert_eq!(b.hra, 15_000.0);
        assert_eq!(b.gross, 69_170.0);
        assert_eq!(b.provident_fund, 6_000.0);
        assert_eq!(b.professional_tax, 200.0);
        assert_eq!(b.total_deductions, 6_200.0);
        assert_eq!(b.net, 62_970.0);
    }

    #[test]
    fn test_breakdown_rounds_percentages_to_whole_units() {
        let b = compute_breakdown(33_333.0);
        // 9999.9 -> 10000, 3999.96 -> 4000
        assert_eq!(b.hra, 10_000.0);
        assert_eq!(b.provident_fund, 4_000.0);
        assert_eq!(b.gross, 33_333.0 + 10_000.0 + 4_170.0);
    }

    #[test]
    fn test_breakdown_zero_basic_keeps_fixed_components() {
        let b = compute_breakdown(0.0);
        assert_eq!(b.gross, 4_170.0);
        assert_eq!(b.net, 3_970.0);
    }

    #[test]
    fn test_full_attendance_has_no_deduction() {
        let adj = attendance_adjustment(
            44_000.0,
            AttendanceCounts {
                present: 22,
                ..Default::default()
            },
        );
        assert_eq!(adj.absent_days, 0);
        assert_eq!(adj.deduction, 0.0);
        assert_eq!(adj.daily_rate, 2_000.0);
    }

    #[test]
    fn test_absences_and_late_days_are_deducted() {
        let adj = attendance_adjustment(
            22_000.0,
            AttendanceCounts {
                present: 18,
                late: 2,
                absent: 1,
                leave: 1,
            },
        );
        assert_eq!(adj.absent_days, 1);
        // one absent day plus two half days
        assert_eq!(adj.deduction, 2_000.0);
    }

    #[test]
    fn test_more_records_than_working_days_never_go_negative() {
        let adj = attendance_adjustment(
            22_000.0,
            AttendanceCounts {
                present: 23,
                ..Default::default()
            },
        );
        assert_eq!(adj.absent_days, 0);
        assert_eq!(adj.deduction, 0.0);
    }

    #[test]
    fn test_deduction_rounded_to_cents() {
        let adj = attendance_adjustment(
            10_000.0,
            AttendanceCounts {
                present: 21,
                ..Default::default()
            },
        );
        assert_eq!(adj.daily_rate, 454.55);
        assert_eq!(adj.deduction, 454.55);
    }

    #[test]
    fn test_net_includes_bonus_and_deductions() {
        let b = compute_breakdown(50_000.0);
        assert_eq!(compute_net(&b, 0.0, 0.0, 0.0), 62_970.0);
        assert_eq!(compute_net(&b, 1_000.0, 2_500.0, 470.0), 64_000.0);
    }

    #[test]
    fn test_net_floors_at_zero() {
        let b = compute_breakdown(1_000.0);
        assert_eq!(compute_net(&b, 0.0, 0.0, 1_000_000.0), 0.0);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("Bonus", 0.0).is_ok());
        assert!(validate_amount("Bonus", -5.0).is_err());
        assert!(validate_amount("Bonus", f64::INFINITY).is_err());
    }
}
