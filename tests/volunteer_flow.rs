mod common;

use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use common::{expect_data, expect_error, TestApp};
use internhub::directory::UserType;
use internhub::roster::{Assignment, RoleKind, VolunteerStatus};
use internhub::views::AssignmentView;
use serde_json::json;

#[tokio::test]
async fn volunteer_review_and_assign_notify_the_team() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let intern = app.add_user("Ivan", UserType::Intern, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    let response = app
        .post_json(
            "/api/project-assignments/volunteer",
            &json!({ "projectId": project.id }),
            dev.token(),
        )
        .await?;
    let filed: Assignment = expect_data(response, StatusCode::CREATED).await?;
    assert_eq!(filed.project_id, project.id);
    assert_eq!(filed.rosters.volunteer_developers.len(), 1);
    assert_eq!(
        filed.rosters.volunteer_developers[0].status,
        VolunteerStatus::Pending
    );
    assert!(filed.rosters.assigned_developers.is_empty());

    let review = json!({
        "assignmentId": filed.id,
        "userId": dev.id(),
        "userType": "developer",
        "status": "approved",
    });
    let response = app
        .put_json("/api/project-assignments/review-volunteer", &review, hr.token())
        .await?;
    let reviewed: Assignment = expect_data(response, StatusCode::OK).await?;
    assert!(reviewed.holds(RoleKind::Mentor, dev.id()));
    let request = &reviewed.rosters.volunteer_developers[0];
    assert_eq!(request.status, VolunteerStatus::Approved);
    assert_eq!(request.reviewed_by, Some(hr.id()));

    let sent = app.wait_for_mail(1).await?;
    assert_eq!(sent[0].to, "dana@acme.test");
    assert_eq!(sent[0].subject, "Project Assignment Update: Atlas");
    assert!(sent[0].body.contains("Dana has been assigned as Mentor."));
    assert!(sent[0].body.contains("Dana (dana@acme.test) - Mentor"));

    // A second review of the same request finds nothing pending.
    let response = app
        .put_json("/api/project-assignments/review-volunteer", &review, hr.token())
        .await?;
    expect_error(response, StatusCode::NOT_FOUND).await?;

    // One failing mailbox must not block the rest of the team.
    app.mailer().fail_for("ivan@acme.test");
    let response = app
        .post_json(
            "/api/project-assignments/assign-user",
            &json!({ "projectId": project.id, "userId": intern.id(), "userType": "intern" }),
            hr.token(),
        )
        .await?;
    let assigned: Assignment = expect_data(response, StatusCode::CREATED).await?;
    assert!(assigned.holds(RoleKind::Intern, intern.id()));

    let sent = app.wait_for_mail(2).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent_after = app.mailer().sent();
    assert_eq!(sent_after.len(), sent.len());
    assert!(sent_after.iter().all(|mail| mail.to != "ivan@acme.test"));
    let update = &sent_after[1];
    assert_eq!(update.to, "dana@acme.test");
    assert!(update.body.contains("Ivan has been assigned as Intern."));
    assert!(update.body.contains("Ivan (ivan@acme.test) - Intern"));
    Ok(())
}

#[tokio::test]
async fn duplicate_volunteer_request_is_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let intern = app.add_user("Ivy", UserType::Intern, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;
    let body = json!({ "projectId": project.id });

    let response = app
        .post_json("/api/project-assignments/volunteer", &body, intern.token())
        .await?;
    let first: Assignment = expect_data(response, StatusCode::CREATED).await?;
    assert_eq!(first.rosters.volunteer_interns.len(), 1);

    let response = app
        .post_json("/api/project-assignments/volunteer", &body, intern.token())
        .await?;
    let message = expect_error(response, StatusCode::BAD_REQUEST).await?;
    assert!(message.contains("already volunteered"));

    let response = app
        .get(
            &format!("/api/project-assignments/{}", first.id),
            intern.token(),
        )
        .await?;
    let current: AssignmentView = expect_data(response, StatusCode::OK).await?;
    assert_eq!(current.volunteer_interns.len(), 1);
    assert_eq!(current.version, first.version);
    Ok(())
}

#[tokio::test]
async fn rejected_volunteer_cannot_file_again() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    let response = app
        .post_json(
            "/api/project-assignments/panelist/volunteer",
            &json!({ "projectId": project.id }),
            dev.token(),
        )
        .await?;
    let filed: Assignment = expect_data(response, StatusCode::CREATED).await?;
    assert_eq!(filed.rosters.volunteer_panelists.len(), 1);

    let response = app
        .put_json(
            "/api/project-assignments/panelist/review-volunteer",
            &json!({ "assignmentId": filed.id, "userId": dev.id(), "status": "rejected" }),
            hr.token(),
        )
        .await?;
    let reviewed: Assignment = expect_data(response, StatusCode::OK).await?;
    assert!(reviewed.rosters.panelists.is_empty());
    assert_eq!(
        reviewed.rosters.volunteer_panelists[0].status,
        VolunteerStatus::Rejected
    );

    let response = app
        .post_json(
            "/api/project-assignments/panelist/volunteer",
            &json!({ "projectId": project.id }),
            dev.token(),
        )
        .await?;
    expect_error(response, StatusCode::BAD_REQUEST).await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.mailer().sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn volunteer_checks_actor_and_project() -> Result<()> {
    let app = TestApp::new()?;
    let approved = app.add_project("Atlas", "Acme", true)?;
    let pending = app.add_project("Draft", "Acme", false)?;
    let foreign = app.add_project("Borealis", "Globex", true)?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let intern = app.add_user("Ivy", UserType::Intern, "Acme")?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let unverified = app.add_user_with("Uma", UserType::Developer, "Acme", |user| {
        user.verified = false;
    })?;
    let unapproved = app.add_user_with("Otto", UserType::Developer, "Acme", |user| {
        user.is_approved = false;
    })?;

    let cases = [
        ("/api/project-assignments/volunteer", approved.id, &unverified, StatusCode::FORBIDDEN),
        ("/api/project-assignments/volunteer", approved.id, &unapproved, StatusCode::FORBIDDEN),
        ("/api/project-assignments/volunteer", approved.id, &hr, StatusCode::FORBIDDEN),
        ("/api/project-assignments/panelist/volunteer", approved.id, &intern, StatusCode::FORBIDDEN),
        ("/api/project-assignments/volunteer", pending.id, &dev, StatusCode::FORBIDDEN),
        ("/api/project-assignments/volunteer", foreign.id, &dev, StatusCode::FORBIDDEN),
        ("/api/project-assignments/volunteer", uuid::Uuid::new_v4(), &dev, StatusCode::NOT_FOUND),
    ];
    for (path, project_id, user, status) in cases {
        let response = app
            .post_json(path, &json!({ "projectId": project_id }), user.token())
            .await?;
        expect_error(response, status).await?;
    }

    // None of the refused requests left an assignment behind.
    let response = app
        .get(
            &format!("/api/project-assignments/project/{}", approved.id),
            hr.token(),
        )
        .await?;
    expect_error(response, StatusCode::NOT_FOUND).await?;
    Ok(())
}

#[tokio::test]
async fn mentor_and_panelist_exclude_each_other() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    let response = app
        .post_json(
            "/api/project-assignments/panelist/assign",
            &json!({ "projectId": project.id, "userId": dev.id() }),
            hr.token(),
        )
        .await?;
    let assignment: Assignment = expect_data(response, StatusCode::CREATED).await?;
    assert_eq!(assignment.rosters.panelists.len(), 1);

    let response = app
        .post_json(
            "/api/project-assignments/volunteer",
            &json!({ "projectId": project.id }),
            dev.token(),
        )
        .await?;
    expect_error(response, StatusCode::CONFLICT).await?;

    let response = app
        .post_json(
            "/api/project-assignments/assign-user",
            &json!({ "projectId": project.id, "userId": dev.id(), "userType": "developer" }),
            hr.token(),
        )
        .await?;
    expect_error(response, StatusCode::CONFLICT).await?;

    let response = app
        .get(
            &format!("/api/project-assignments/{}", assignment.id),
            hr.token(),
        )
        .await?;
    let current: Assignment = expect_data(response, StatusCode::OK).await?;
    assert!(current.rosters.assigned_developers.is_empty());
    assert!(current.rosters.volunteer_developers.is_empty());
    Ok(())
}

#[tokio::test]
async fn review_is_scoped_to_the_reviewers_company() -> Result<()> {
    let app = TestApp::new()?;
    let outsider = app.add_user("Grace", UserType::Hr, "Globex")?;
    let admin = app.add_user("Ada", UserType::Admin, "Platform")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    let response = app
        .post_json(
            "/api/project-assignments/volunteer",
            &json!({ "projectId": project.id }),
            dev.token(),
        )
        .await?;
    let filed: Assignment = expect_data(response, StatusCode::CREATED).await?;

    let review = json!({
        "assignmentId": filed.id,
        "userId": dev.id(),
        "userType": "developer",
        "status": "approved",
    });
    let response = app
        .put_json("/api/project-assignments/review-volunteer", &review, outsider.token())
        .await?;
    expect_error(response, StatusCode::FORBIDDEN).await?;

    let response = app
        .put_json("/api/project-assignments/review-volunteer", &review, dev.token())
        .await?;
    expect_error(response, StatusCode::FORBIDDEN).await?;

    let response = app
        .put_json(
            "/api/project-assignments/review-volunteer",
            &json!({
                "assignmentId": filed.id,
                "userId": dev.id(),
                "userType": "developer",
                "status": "maybe",
            }),
            admin.token(),
        )
        .await?;
    expect_error(response, StatusCode::BAD_REQUEST).await?;

    let response = app
        .put_json("/api/project-assignments/review-volunteer", &review, admin.token())
        .await?;
    let reviewed: Assignment = expect_data(response, StatusCode::OK).await?;
    assert_eq!(reviewed.rosters.assigned_developers.len(), 1);
    Ok(())
}

#[tokio::test]
async fn approved_intern_is_added_even_when_one_mailbox_fails() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let olga = app.add_user("Olga", UserType::Intern, "Acme")?;
    let ivan = app.add_user("Ivan", UserType::Intern, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    for (member, user_type) in [(&dev, "developer"), (&olga, "intern")] {
        let response = app
            .post_json(
                "/api/project-assignments/assign-user",
                &json!({ "projectId": project.id, "userId": member.id(), "userType": user_type }),
                hr.token(),
            )
            .await?;
        expect_data::<Assignment>(response, StatusCode::CREATED).await?;
    }
    // Dana on the first add, Dana and Olga on the second.
    app.wait_for_mail(3).await?;

    let response = app
        .post_json(
            "/api/project-assignments/volunteer",
            &json!({ "projectId": project.id }),
            ivan.token(),
        )
        .await?;
    let filed: Assignment = expect_data(response, StatusCode::CREATED).await?;

    app.mailer().fail_for("ivan@acme.test");
    let response = app
        .put_json(
            "/api/project-assignments/review-volunteer",
            &json!({
                "assignmentId": filed.id,
                "userId": ivan.id(),
                "userType": "intern",
                "status": "approved",
            }),
            hr.token(),
        )
        .await?;
    let reviewed: Assignment = expect_data(response, StatusCode::OK).await?;
    assert!(reviewed.holds(RoleKind::Intern, ivan.id()));

    app.wait_for_mail(5).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent = app.mailer().sent();
    assert_eq!(sent.len(), 5);
    assert!(sent.iter().all(|mail| mail.to != "ivan@acme.test"));
    let mut notified: Vec<&str> = sent[3..].iter().map(|mail| mail.to.as_str()).collect();
    notified.sort_unstable();
    assert_eq!(notified, vec!["dana@acme.test", "olga@acme.test"]);
    assert!(sent[3..]
        .iter()
        .all(|mail| mail.body.contains("Ivan has been assigned as Intern.")));
    Ok(())
}

#[tokio::test]
async fn read_views_show_member_names() -> Result<()> {
    let app = TestApp::new()?;
    let hr = app.add_user("Hannah", UserType::Hr, "Acme")?;
    let dev = app.add_user("Dana", UserType::Developer, "Acme")?;
    let intern = app.add_user("Ivy", UserType::Intern, "Acme")?;
    let project = app.add_project("Atlas", "Acme", true)?;

    let response = app
        .post_json(
            "/api/project-assignments/assign-user",
            &json!({ "projectId": project.id, "userId": dev.id(), "userType": "developer" }),
            hr.token(),
        )
        .await?;
    expect_data::<Assignment>(response, StatusCode::CREATED).await?;
    let response = app
        .post_json(
            "/api/project-assignments/volunteer",
            &json!({ "projectId": project.id }),
            intern.token(),
        )
        .await?;
    expect_data::<Assignment>(response, StatusCode::CREATED).await?;

    let response = app
        .get("/api/project-assignments/pending-volunteers", hr.token())
        .await?;
    let pending: Vec<AssignmentView> = expect_data(response, StatusCode::OK).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].project_name.as_deref(), Some("Atlas"));
    let request = &pending[0].volunteer_interns[0];
    assert_eq!(request.request.user_id, intern.id());
    let volunteer = request
        .user
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("volunteer not resolved"))?;
    assert_eq!(volunteer.name, "Ivy");
    assert_eq!(volunteer.email, "ivy@acme.test");
    assert_eq!(volunteer.user_type, UserType::Intern);

    let response = app
        .get(
            &format!("/api/project-assignments/project/{}", project.id),
            intern.token(),
        )
        .await?;
    let view: AssignmentView = expect_data(response, StatusCode::OK).await?;
    assert_eq!(view.project_name.as_deref(), Some("Atlas"));
    let mentor = view.assigned_developers[0]
        .user
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("mentor not resolved"))?;
    assert_eq!(mentor.name, "Dana");
    assert_eq!(mentor.company.as_deref(), Some("Acme"));
    assert_eq!(view.assigned_developers[0].member.assigned_by, hr.id());
    Ok(())
}
