mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{expect_data, expect_error, TestApp};
use internhub::attendance::{weekdays, ABSENT_STATUS, SYSTEM_MARKER};
use internhub::directory::{EmploymentWindow, UserType};
use serde::Deserialize;

#[derive(Deserialize)]
struct ReportData {
    interns: usize,
    inserted: usize,
    duplicates: usize,
}

#[tokio::test]
async fn backfill_marks_missing_weekdays_once() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let intern = app.add_user("Ivy", UserType::Intern, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let store = app.store();

    let today = Utc::now().date_naive();
    let start = today - Duration::days(14);
    let yesterday = today - Duration::days(1);
    store.insert_employment(EmploymentWindow {
        user_id: intern.id(),
        start,
        end: None,
    })?;
    // A later joined application must not move the start forward.
    store.insert_employment(EmploymentWindow {
        user_id: intern.id(),
        start: today - Duration::days(3),
        end: None,
    })?;
    // Developers are never backfilled even with a window on record.
    store.insert_employment(EmploymentWindow {
        user_id: dev.id(),
        start,
        end: None,
    })?;

    let marked = weekdays(start, yesterday)
        .next()
        .ok_or_else(|| anyhow::anyhow!("no weekday in range"))?;
    store.record_attendance(intern.id(), marked, "Present")?;
    let expected = weekdays(start, yesterday).count() - 1;

    let response = app.post_json("/api/attendance/backfill", &(), dev.token()).await?;
    expect_error(response, StatusCode::FORBIDDEN).await?;

    let response = app.post_json("/api/attendance/backfill", &(), hr.token()).await?;
    let report: ReportData = expect_data(response, StatusCode::OK).await?;
    assert_eq!(report.interns, 1);
    assert_eq!(report.inserted, expected);
    assert_eq!(report.duplicates, 0);

    let entries = store.attendance_for(intern.id())?;
    assert_eq!(entries.len(), expected + 1);
    let (first_date, first_entry) = &entries[0];
    assert_eq!(*first_date, marked);
    assert_eq!(first_entry.status, "Present");
    assert!(entries.iter().all(|(date, _)| *date < today));
    assert!(entries
        .iter()
        .filter(|(date, _)| *date != marked)
        .all(|(_, entry)| entry.status == ABSENT_STATUS && entry.marked_by == SYSTEM_MARKER));
    assert!(store.attendance_for(dev.id())?.is_empty());

    let response = app.post_json("/api/attendance/backfill", &(), hr.token()).await?;
    let again: ReportData = expect_data(response, StatusCode::OK).await?;
    assert_eq!(again.inserted, 0);
    assert_eq!(store.attendance_for(intern.id())?.len(), expected + 1);
    Ok(())
}
