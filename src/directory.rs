use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Candidate,
    Intern,
    Developer,
    Hr,
    Admin,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Candidate => "candidate",
            UserType::Intern => "intern",
            UserType::Developer => "developer",
            UserType::Hr => "hr",
            UserType::Admin => "admin",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(UserType::Candidate),
            "intern" => Ok(UserType::Intern),
            "developer" => Ok(UserType::Developer),
            "hr" => Ok(UserType::Hr),
            "admin" => Ok(UserType::Admin),
            other => Err(format!("unknown user type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub company: Option<String>,
    pub verified: bool,
    pub is_approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub description: String,
    pub skill_requirement: Vec<String>,
    pub estimated_time_to_complete: String,
    #[serde(rename = "suggested_by")]
    pub suggested_by: Option<String>,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub company: String,
    pub description: String,
    pub skill_requirement: Vec<String>,
    pub estimated_time_to_complete: String,
    pub suggested_by: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmploymentWindow {
    pub user_id: Uuid,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}
