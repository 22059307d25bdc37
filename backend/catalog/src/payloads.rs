//! Request and response bodies of the HTTP API.

use std::{fmt::Display, ops::AddAssign, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Admin, AdminRole, Branch, Elective, ElectiveType, SelectedElective, Slot, Student};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub elective_id: Uuid,
}

/// Form clients post numbers as text; both `3` and `"3"` are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

impl<T> NumberOrText<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn parse<E: Error>(self) -> Result<Option<T>, E> {
        match self {
            NumberOrText::Number(number) => Ok(Some(number)),
            NumberOrText::Text(text) if text.trim().is_empty() => Ok(None),
            NumberOrText::Text(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| E::custom(format!("invalid number {text:?}: {e}"))),
        }
    }
}

fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    NumberOrText::<T>::deserialize(deserializer)?
        .parse::<D::Error>()?
        .ok_or_else(|| D::Error::custom("expected a number"))
}

/// Like [`number`], but missing, null and blank values are `None`.
fn optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<NumberOrText<T>>::deserialize(deserializer)? {
        Some(value) => value.parse(),
        None => Ok(None),
    }
}

/// Body of `POST /api/electives`. `branch` is only read for super-admins;
/// admins always create in their own branch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElective {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub elective_type: Option<ElectiveType>,
    #[serde(default, deserialize_with = "optional_number")]
    pub elective_number: Option<i64>,
    #[serde(deserialize_with = "number")]
    pub semester: u32,
    #[serde(default)]
    pub branch: Option<Branch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectivePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub elective_type: Option<ElectiveType>,
    #[serde(default, deserialize_with = "optional_number")]
    pub elective_number: Option<i64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub semester: Option<u32>,
}

/// One spreadsheet row. Cells stay loosely typed so numeric passwords and
/// semesters survive the trip from tabular input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StudentRow {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub roll_no: Option<Value>,
    #[serde(default)]
    pub section: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
    #[serde(default)]
    pub semester: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadRequest {
    pub rows: Vec<StudentRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestSummary {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

impl AddAssign for IngestSummary {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadResponse {
    pub msg: String,
    pub results: IngestSummary,
}

/// Student as exposed over the API, without the password hash.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    pub semester: u32,
    pub section: String,
    pub branch: Branch,
    pub role: String,
    pub selected_electives: Vec<SelectedElective>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Student> for StudentProfile {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            semester: student.semester,
            section: student.section.clone(),
            branch: student.branch,
            role: "student".to_string(),
            selected_electives: student.selected_electives.clone(),
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    pub section: String,
    pub semester: u32,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            section: student.section.clone(),
            semester: student.semester,
        }
    }
}

/// Ledger row with its student and elective resolved. Either side is `None`
/// when the referenced record no longer exists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    pub id: Uuid,
    pub student: Option<StudentSummary>,
    pub elective: Option<Elective>,
    #[serde(flatten)]
    pub slot: Slot,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRoleName {
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub branch: Option<Branch>,
    #[serde(default)]
    pub role: Option<AdminRoleName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub branch: Option<Branch>,
    pub role: Option<AdminRoleName>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(flatten)]
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Admin> for AdminView {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name.clone(),
            username: admin.username.clone(),
            role: admin.role,
            created_at: admin.created_at,
            updated_at: admin.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub roll_no: String,
    pub name: String,
    pub semester: u32,
    pub section: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectiveRoster {
    pub elective: Elective,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub rows: Vec<RosterRow>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub code: String,
    pub name: String,
    pub semester: u32,
    pub parity: String,
    pub elective_type: ElectiveType,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Summary {
    pub electives: Vec<SummaryRow>,
    pub rosters: Vec<ElectiveRoster>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcileReport {
    pub students: usize,
    pub changed: usize,
}
