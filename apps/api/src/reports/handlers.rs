use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::auth::extractor::STAFF;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{Path, Query};
use crate::reports::csv::{opt, render, CsvRow};
use crate::state::AppState;
use crate::validation::Month;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Employees,
    Attendance,
    Leave,
    Payroll,
    Performance,
}

impl ReportKind {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "employees" => Ok(ReportKind::Employees),
            "attendance" => Ok(ReportKind::Attendance),
            "leave" => Ok(ReportKind::Leave),
            "payroll" => Ok(ReportKind::Payroll),
            "performance" => Ok(ReportKind::Performance),
            other => Err(AppError::Validation(format!(
                "Unknown report '{other}'; expected employees, attendance, leave, payroll or performance"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Employees => "employees",
            ReportKind::Attendance => "attendance",
            ReportKind::Leave => "leave",
            ReportKind::Payroll => "payroll",
            ReportKind::Performance => "performance",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn attachment_name(kind: ReportKind, start: NaiveDate, end: NaiveDate) -> String {
    format!("{}-report-{start}-to-{end}.csv", kind.as_str())
}

// ────────────────────────────────────────────────────────────────────────────
// Report rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct EmployeeLine {
    name: String,
    email: String,
    department: Option<String>,
    designation: Option<String>,
    salary: Option<f64>,
    joining_date: Option<NaiveDate>,
    employment_status: Option<String>,
}

impl CsvRow for EmployeeLine {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Email",
        "Department",
        "Designation",
        "Salary",
        "Joining Date",
        "Status",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.email.clone(),
            opt(&self.department),
            opt(&self.designation),
            self.salary.map(|s| format!("{s:.2}")).unwrap_or_default(),
            opt(&self.joining_date),
            opt(&self.employment_status),
        ]
    }
}

#[derive(Debug, FromRow)]
struct AttendanceLine {
    name: String,
    email: String,
    attendance_date: NaiveDate,
    status: String,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
}

impl CsvRow for AttendanceLine {
    const HEADERS: &'static [&'static str] =
        &["Employee", "Email", "Date", "Status", "Check In", "Check Out"];

    fn fields(&self) -> Vec<String> {
        let time = |t: &Option<DateTime<Utc>>| {
            t.as_ref()
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default()
        };
        vec![
            self.name.clone(),
            self.email.clone(),
            self.attendance_date.to_string(),
            self.status.clone(),
            time(&self.check_in),
            time(&self.check_out),
        ]
    }
}

#[derive(Debug, FromRow)]
struct LeaveLine {
    name: String,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i32,
    reason: String,
    status: String,
    applied_at: DateTime<Utc>,
}

impl CsvRow for LeaveLine {
    const HEADERS: &'static [&'static str] = &[
        "Employee",
        "Leave Type",
        "Start Date",
        "End Date",
        "Days",
        "Reason",
        "Status",
        "Applied On",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.leave_type.clone(),
            self.start_date.to_string(),
            self.end_date.to_string(),
            self.days.to_string(),
            self.reason.clone(),
            self.status.clone(),
            self.applied_at.date_naive().to_string(),
        ]
    }
}

#[derive(Debug, FromRow)]
struct PayrollLine {
    name: String,
    month: String,
    basic_salary: f64,
    gross_salary: f64,
    attendance_deduction: f64,
    bonus: f64,
    other_deductions: f64,
    net_salary: f64,
    status: String,
}

impl CsvRow for PayrollLine {
    const HEADERS: &'static [&'static str] = &[
        "Employee",
        "Month",
        "Basic",
        "Gross",
        "Attendance Deduction",
        "Bonus",
        "Other Deductions",
        "Net",
        "Status",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.month.clone(),
            format!("{:.2}", self.basic_salary),
            format!("{:.2}", self.gross_salary),
            format!("{:.2}", self.attendance_deduction),
            format!("{:.2}", self.bonus),
            format!("{:.2}", self.other_deductions),
            format!("{:.2}", self.net_salary),
            self.status.clone(),
        ]
    }
}

#[derive(Debug, FromRow)]
struct PerformanceLine {
    name: String,
    evaluation_period: String,
    rating: f64,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
}

impl CsvRow for PerformanceLine {
    const HEADERS: &'static [&'static str] =
        &["Employee", "Period", "Rating", "Feedback", "Reviewed On"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.evaluation_period.clone(),
            format!("{:.1}", self.rating),
            opt(&self.feedback),
            self.created_at.date_naive().to_string(),
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

async fn build_report(
    db: &PgPool,
    kind: ReportKind,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(usize, String), AppError> {
    let report = match kind {
        ReportKind::Employees => {
            let rows: Vec<EmployeeLine> = sqlx::query_as(
                r#"
                SELECT name, email, department, designation, salary, joining_date, employment_status
                FROM users
                WHERE role = 'Employee'
                ORDER BY name
                "#,
            )
            .fetch_all(db)
            .await?;
            (rows.len(), render(&rows))
        }
        ReportKind::Attendance => {
            let rows: Vec<AttendanceLine> = sqlx::query_as(
                r#"
                SELECT u.name, u.email, a.attendance_date, a.status, a.check_in, a.check_out
                FROM attendance a
                JOIN users u ON u.id = a.user_id
                WHERE a.attendance_date BETWEEN $1 AND $2
                ORDER BY a.attendance_date, u.name
                "#,
            )
            .bind(start)
            .bind(end)
            .fetch_all(db)
            .await?;
            (rows.len(), render(&rows))
        }
        ReportKind::Leave => {
            let rows: Vec<LeaveLine> = sqlx::query_as(
                r#"
                SELECT u.name, l.leave_type, l.start_date, l.end_date, l.days, l.reason,
                       l.status, l.applied_at
                FROM leaves l
                JOIN users u ON u.id = l.user_id
                WHERE l.applied_at::DATE BETWEEN $1 AND $2
                ORDER BY l.applied_at
                "#,
            )
            .bind(start)
            .bind(end)
            .fetch_all(db)
            .await?;
            (rows.len(), render(&rows))
        }
        ReportKind::Payroll => {
            let rows: Vec<PayrollLine> = sqlx::query_as(
                r#"
                SELECT u.name, p.month, p.basic_salary, p.gross_salary, p.attendance_deduction,
                       p.bonus, p.other_deductions, p.net_salary, p.status
                FROM payroll p
                JOIN users u ON u.id = p.user_id
                WHERE p.month BETWEEN $1 AND $2
                ORDER BY p.month, u.name
                "#,
            )
            .bind(Month::of(start).to_string())
            .bind(Month::of(end).to_string())
            .fetch_all(db)
            .await?;
            (rows.len(), render(&rows))
        }
        ReportKind::Performance => {
            let rows: Vec<PerformanceLine> = sqlx::query_as(
                r#"
                SELECT u.name, k.evaluation_period, k.rating, k.feedback, k.created_at
                FROM kpi k
                JOIN users u ON u.id = k.user_id
                WHERE k.created_at::DATE BETWEEN $1 AND $2
                ORDER BY k.created_at
                "#,
            )
            .bind(start)
            .bind(end)
            .fetch_all(db)
            .await?;
            (rows.len(), render(&rows))
        }
    };
    Ok(report)
}

/// GET /api/reports/:kind?start=YYYY-MM-DD&end=YYYY-MM-DD
pub async fn handle_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(kind): Path<String>,
    Query(range): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    user.require(STAFF)?;
    let kind = ReportKind::parse(&kind)?;
    if range.end < range.start {
        return Err(AppError::Validation(
            "end must be on or after start".to_string(),
        ));
    }

    let (count, body) = build_report(&state.db, kind, range.start, range.end).await?;
    info!(
        "{} report {}..{} exported by {} ({count} rows)",
        kind.as_str(),
        range.start,
        range.end,
        user.user_id
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_name(kind, range.start, range.end)
    );
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(ReportKind::parse("payroll").unwrap(), ReportKind::Payroll);
        assert!(ReportKind::parse("salaries").is_err());
        assert!(ReportKind::parse("Payroll").is_err());
    }

    #[test]
    fn test_attachment_name() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert_eq!(
            attachment_name(ReportKind::Leave, start, end),
            "leave-report-2026-01-01-to-2026-03-31.csv"
        );
    }

    #[test]
    fn test_payroll_line_formats_amounts() {
        let line = PayrollLine {
            name: "Dev, Kiran".into(),
            month: "2026-02".into(),
            basic_salary: 30_000.0,
            gross_salary: 43_170.0,
            attendance_deduction: 0.0,
            bonus: 500.0,
            other_deductions: 0.0,
            net_salary: 39_870.0,
            status: "Paid".into(),
        };
        assert_eq!(
            render(&[line]),
            "Employee,Month,Basic,Gross,Attendance Deduction,Bonus,Other Deductions,Net,Status\n\
             \"Dev, Kiran\",2026-02,30000.00,43170.00,0.00,500.00,0.00,39870.00,Paid"
        );
    }
}
