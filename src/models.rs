use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: String,
    pub company: Option<String>,
    pub verified: bool,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: String,
    pub company: Option<String>,
    pub verified: bool,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = projects)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub description: String,
    pub skill_requirement: Vec<String>,
    pub estimated_time_to_complete: String,
    pub suggested_by: Option<String>,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProjectRow {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub description: String,
    pub skill_requirement: Vec<String>,
    pub estimated_time_to_complete: String,
    pub suggested_by: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = project_assignments)]
#[diesel(belongs_to(ProjectRow, foreign_key = project_id))]
pub struct AssignmentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company: String,
    pub rosters: serde_json::Value,
    pub version: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = project_assignments)]
pub struct NewAssignmentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub company: String,
    pub rosters: serde_json::Value,
    pub version: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mentor_reservations)]
pub struct NewMentorReservation {
    pub user_id: Uuid,
    pub assignment_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = internships)]
pub struct NewInternshipRow {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub internship_start_date: NaiveDate,
    pub internship_end_date: Option<NaiveDate>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub internship_id: Uuid,
    pub status: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = attendance)]
pub struct NewAttendanceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: String,
    pub remarks: Option<String>,
    pub marked_by: String,
    pub marked_at: NaiveDateTime,
}
