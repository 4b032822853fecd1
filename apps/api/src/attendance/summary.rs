use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::attendance::{AttendanceRow, AttendanceStatus};
use crate::payroll::calc::{round2, AttendanceCounts};
use crate::validation::Month;

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub month: String,
    pub counts: AttendanceCounts,
    pub total_records: usize,
    /// Sum of check-out minus check-in over completed days.
    pub hours_worked: f64,
}

pub fn tally<I>(statuses: I) -> AttendanceCounts
where
    I: IntoIterator<Item = (AttendanceStatus, u32)>,
{
    let mut counts = AttendanceCounts::default();
    for (status, n) in statuses {
        match status {
            AttendanceStatus::Present => counts.present += n,
            AttendanceStatus::Late => counts.late += n,
            AttendanceStatus::Absent => counts.absent += n,
            AttendanceStatus::Leave => counts.leave += n,
        }
    }
    counts
}

pub fn summarize(month: Month, records: &[AttendanceRow]) -> AttendanceSummary {
    let counts = tally(records.iter().map(|r| (r.status, 1)));
    let minutes: i64 = records
        .iter()
        .filter_map(|r| match (r.check_in, r.check_out) {
            (Some(start), Some(end)) if end > start => Some((end - start).num_minutes()),
            _ => None,
        })
        .sum();
    AttendanceSummary {
        month: month.to_string(),
        counts,
        total_records: records.len(),
        hours_worked: round2(minutes as f64 / 60.0),
    }
}

/// Per-status day counts for one employee and month, straight from the database.
pub async fn month_counts<'e>(
    executor: impl PgExecutor<'e>,
    user_id: Uuid,
    month: Month,
) -> Result<AttendanceCounts, sqlx::Error> {
    let rows: Vec<(AttendanceStatus, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)
        FROM attendance
        WHERE user_id = $1 AND attendance_date BETWEEN $2 AND $3
        GROUP BY status
        "#,
    )
    .bind(user_id)
    .bind(month.first_day())
    .bind(month.last_day())
    .fetch_all(executor)
    .await?;
    Ok(tally(
        rows.into_iter()
            .map(|(status, n)| (status, u32::try_from(n).unwrap_or(u32::MAX))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record(day: u32, status: AttendanceStatus, hours: Option<i64>) -> AttendanceRow {
        let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let check_in = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        AttendanceRow {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            attendance_date: date,
            check_in: hours.map(|_| check_in),
            check_out: hours.map(|h| check_in + chrono::Duration::hours(h)),
            status,
            created_at: check_in,
        }
    }

    #[test]
    fn test_tally_counts_each_status() {
        let counts = tally([
            (AttendanceStatus::Present, 3),
            (AttendanceStatus::Late, 1),
            (AttendanceStatus::Leave, 2),
            (AttendanceStatus::Absent, 1),
            (AttendanceStatus::Present, 1),
        ]);
        assert_eq!(
            counts,
            AttendanceCounts {
                present: 4,
                late: 1,
                absent: 1,
                leave: 2
            }
        );
    }

    #[test]
    fn test_summarize_hours_only_for_completed_days() {
        let month = Month::parse("2026-03").unwrap();
        let records = vec![
            record(2, AttendanceStatus::Present, Some(8)),
            record(3, AttendanceStatus::Late, Some(7)),
            record(4, AttendanceStatus::Leave, None),
        ];
        let s = summarize(month, &records);
        assert_eq!(s.month, "2026-03");
        assert_eq!(s.total_records, 3);
        assert_eq!(s.hours_worked, 15.0);
        assert_eq!(s.counts.present, 1);
        assert_eq!(s.counts.late, 1);
        assert_eq!(s.counts.leave, 1);
    }

    #[test]
    fn test_summarize_empty_month() {
        let s = summarize(Month::parse("2026-01").unwrap(), &[]);
        assert_eq!(s.total_records, 0);
        assert_eq!(s.hours_worked, 0.0);
        assert_eq!(s.counts, AttendanceCounts::default());
    }
}
