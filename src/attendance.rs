//! Backfills `Absent` records for joined interns on every past weekday of
//! their employment that has no attendance entry yet.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;
use tracing::{debug, info};

use crate::directory::EmploymentWindow;
use crate::store::{AttendanceLedger, StoreResult};

pub const APPLICATION_JOINED: &str = "joined";
pub const ABSENT_STATUS: &str = "Absent";
pub const SYSTEM_MARKER: &str = "System";
pub const AUTO_ABSENT_REMARK: &str = "Auto-marked absent by system";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub interns: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Collapses the joined applications of each intern into one window that
/// starts at the earliest internship start date.
pub fn merge_windows(windows: Vec<EmploymentWindow>) -> Vec<EmploymentWindow> {
    let mut earliest: HashMap<uuid::Uuid, EmploymentWindow> = HashMap::new();
    for window in windows {
        earliest
            .entry(window.user_id)
            .and_modify(|current| {
                if window.start < current.start {
                    *current = window;
                }
            })
            .or_insert(window);
    }
    let mut merged: Vec<_> = earliest.into_values().collect();
    merged.sort_by_key(|window| (window.start, window.user_id));
    merged
}

/// The inclusive date range to backfill, capped at the day before `today`.
/// `None` when the window has not started yet.
pub fn backfill_range(window: &EmploymentWindow, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let yesterday = today.pred_opt()?;
    let end = window.end.map_or(yesterday, |end| end.min(yesterday));
    (window.start <= end).then_some((window.start, end))
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn weekdays(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = (to - from).num_days().max(-1) + 1;
    (0..days)
        .map(move |offset| from + Duration::days(offset))
        .filter(|date| is_weekday(*date))
}

pub async fn backfill_absences(
    ledger: &dyn AttendanceLedger,
    today: NaiveDate,
) -> StoreResult<BackfillReport> {
    let windows = merge_windows(ledger.joined_windows().await?);
    let mut report = BackfillReport {
        interns: windows.len(),
        ..BackfillReport::default()
    };

    for window in &windows {
        let Some((from, to)) = backfill_range(window, today) else {
            debug!(user_id = %window.user_id, start = %window.start, "employment has not started; skipping");
            continue;
        };

        let recorded = ledger.recorded_dates(window.user_id, from, to).await?;
        for date in weekdays(from, to).filter(|date| !recorded.contains(date)) {
            if ledger.insert_absence(window.user_id, date, Utc::now()).await? {
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }
    }

    info!(
        interns = report.interns,
        inserted = report.inserted,
        duplicates = report.duplicates,
        today = %today,
        "attendance backfill finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekdays_skip_weekends() {
        // 2024-03-01 is a Friday.
        let days: Vec<_> = weekdays(date(2024, 3, 1), date(2024, 3, 5)).collect();
        assert_eq!(days, vec![date(2024, 3, 1), date(2024, 3, 4), date(2024, 3, 5)]);
        assert_eq!(weekdays(date(2024, 3, 5), date(2024, 3, 4)).count(), 0);
    }

    #[test]
    fn range_is_capped_at_yesterday() {
        let user_id = Uuid::new_v4();
        let today = date(2024, 3, 6);
        let open = EmploymentWindow {
            user_id,
            start: date(2024, 3, 1),
            end: None,
        };
        assert_eq!(
            backfill_range(&open, today),
            Some((date(2024, 3, 1), date(2024, 3, 5)))
        );

        let ended = EmploymentWindow {
            end: Some(date(2024, 3, 4)),
            ..open
        };
        assert_eq!(
            backfill_range(&ended, today),
            Some((date(2024, 3, 1), date(2024, 3, 4)))
        );

        let future = EmploymentWindow {
            start: today,
            ..open
        };
        assert_eq!(backfill_range(&future, today), None);
    }

    #[test]
    fn earliest_start_wins() {
        let user_id = Uuid::new_v4();
        let merged = merge_windows(vec![
            EmploymentWindow {
                user_id,
                start: date(2024, 2, 1),
                end: Some(date(2024, 5, 1)),
            },
            EmploymentWindow {
                user_id,
                start: date(2024, 1, 15),
                end: None,
            },
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, date(2024, 1, 15));
        assert_eq!(merged[0].end, None);
    }

    #[tokio::test]
    async fn backfill_fills_gaps_once() {
        let store = MemoryStore::new();
        let intern = crate::directory::User {
            id: Uuid::new_v4(),
            name: "Ivy".to_string(),
            email: "ivy@acme.test".to_string(),
            user_type: crate::directory::UserType::Intern,
            company: Some("Acme".to_string()),
            verified: true,
            is_approved: true,
        };
        store.insert_user(intern.clone(), "hash").unwrap();
        store
            .insert_employment(EmploymentWindow {
                user_id: intern.id,
                start: date(2024, 3, 1),
                end: None,
            })
            .unwrap();
        store
            .record_attendance(intern.id, date(2024, 3, 4), "Present")
            .unwrap();

        let today = date(2024, 3, 7);
        let first = backfill_absences(&store, today).await.unwrap();
        assert_eq!(
            first,
            BackfillReport {
                interns: 1,
                inserted: 3,
                duplicates: 0
            }
        );

        let second = backfill_absences(&store, today).await.unwrap();
        assert_eq!(second.inserted, 0);

        let entries = store.attendance_for(intern.id).unwrap();
        let absent: Vec<_> = entries
            .iter()
            .filter(|(_, entry)| entry.status == ABSENT_STATUS)
            .map(|(day, _)| *day)
            .collect();
        assert_eq!(absent, vec![date(2024, 3, 1), date(2024, 3, 5), date(2024, 3, 6)]);
        assert_eq!(entries.len(), 4);
    }
}
