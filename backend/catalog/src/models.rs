use std::{
    fmt::{self, Display},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use thiserror::Error;
use uuid::Uuid;

/// Institutional branch. Legacy spellings are accepted on input and
/// normalised to the canonical code. JSON and command-line input share the
/// [`FromStr`] parser, so both ignore case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Branch {
    #[serde(rename = "CSE")]
    Cse,
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "EEE")]
    Eee,
    #[serde(rename = "ECE")]
    Ece,
    #[serde(rename = "MECH")]
    Mech,
    #[serde(rename = "CIVIL")]
    Civil,
    #[serde(rename = "CHEM")]
    Chem,
    #[serde(rename = "BIO")]
    Bio,
    #[serde(rename = "AIML")]
    Aiml,
    #[serde(rename = "CSM")]
    Csm,
    #[serde(rename = "CET")]
    Cet,
    #[serde(rename = "AIDS")]
    Aids,
}

impl Branch {
    pub const ALL: [Branch; 12] = [
        Branch::Cse,
        Branch::It,
        Branch::Eee,
        Branch::Ece,
        Branch::Mech,
        Branch::Civil,
        Branch::Chem,
        Branch::Bio,
        Branch::Aiml,
        Branch::Csm,
        Branch::Cet,
        Branch::Aids,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Cse => "CSE",
            Branch::It => "IT",
            Branch::Eee => "EEE",
            Branch::Ece => "ECE",
            Branch::Mech => "MECH",
            Branch::Civil => "CIVIL",
            Branch::Chem => "CHEM",
            Branch::Bio => "BIO",
            Branch::Aiml => "AIML",
            Branch::Csm => "CSM",
            Branch::Cet => "CET",
            Branch::Aids => "AIDS",
        }
    }
}

impl Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown branch: {0}")]
pub struct UnknownBranch(pub String);

impl FromStr for Branch {
    type Err = UnknownBranch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let branch = match s.trim().to_ascii_lowercase().as_str() {
            "mechanical" => Branch::Mech,
            "chemical" => Branch::Chem,
            "bio-technology" | "bio tech" => Branch::Bio,
            other => Branch::ALL
                .into_iter()
                .find(|branch| branch.as_str().eq_ignore_ascii_case(other))
                .ok_or_else(|| UnknownBranch(s.trim().to_string()))?,
        };

        Ok(branch)
    }
}

impl<'de> Deserialize<'de> for Branch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectiveType {
    Professional,
    Open,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{label} electives must have electiveNumber between 1 and {max}")]
pub struct ElectiveRangeError {
    pub label: &'static str,
    pub max: u8,
}

impl ElectiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElectiveType::Professional => "professional",
            ElectiveType::Open => "open",
        }
    }

    /// Highest electiveNumber a slot of this type may carry.
    pub fn max_number(self) -> u8 {
        match self {
            ElectiveType::Professional => 6,
            ElectiveType::Open => 3,
        }
    }

    /// Checks `number` against the range bound to this type.
    pub fn check_number(self, number: i64) -> Result<u8, ElectiveRangeError> {
        let max = self.max_number();

        if (1..=i64::from(max)).contains(&number) {
            return Ok(number as u8);
        }

        Err(ElectiveRangeError {
            label: match self {
                ElectiveType::Professional => "Professional",
                ElectiveType::Open => "Open",
            },
            max,
        })
    }
}

impl Display for ElectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "professional" => Ok(ElectiveType::Professional),
            "open" => Ok(ElectiveType::Open),
            other => Err(format!("unknown elective type: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub semester: u32,
    pub elective_type: ElectiveType,
    pub elective_number: u8,
}

/// Cache entry on the student record mirroring one ledger row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedElective {
    #[serde(flatten)]
    pub slot: Slot,
    pub elective: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    pub semester: u32,
    pub section: String,
    pub branch: Branch,
    pub password_hash: String,
    #[serde(default)]
    pub selected_electives: Vec<SelectedElective>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elective {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub elective_type: ElectiveType,
    pub elective_number: u8,
    pub semester: u32,
    pub branch: Branch,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Elective {
    pub fn slot(&self) -> Slot {
        Slot {
            semester: self.semester,
            elective_type: self.elective_type,
            elective_number: self.elective_number,
        }
    }
}

/// Ledger row. The slot is copied from the elective when the row is written
/// and never re-derived afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub student: Uuid,
    pub elective: Uuid,
    #[serde(flatten)]
    pub slot: Slot,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AdminRole {
    Admin { branch: Branch },
    SuperAdmin,
}

impl AdminRole {
    pub fn branch(self) -> Option<Branch> {
        match self {
            AdminRole::Admin { branch } => Some(branch),
            AdminRole::SuperAdmin => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    #[serde(flatten)]
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who a request acts as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Student { branch: Branch },
    Admin { branch: Branch },
    SuperAdmin,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Student { .. } => "student",
            Role::Admin { .. } => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl From<AdminRole> for Role {
    fn from(role: AdminRole) -> Self {
        match role {
            AdminRole::Admin { branch } => Role::Admin { branch },
            AdminRole::SuperAdmin => Role::SuperAdmin,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_professional_range() {
        assert_eq!(ElectiveType::Professional.check_number(6), Ok(6));
        assert_eq!(ElectiveType::Professional.check_number(1), Ok(1));
        assert!(ElectiveType::Professional.check_number(7).is_err());
        assert!(ElectiveType::Professional.check_number(0).is_err());
    }

    #[test]
    fn test_open_range() {
        assert_eq!(ElectiveType::Open.check_number(3), Ok(3));

        let err = ElectiveType::Open.check_number(4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Open electives must have electiveNumber between 1 and 3"
        );
    }

    #[test]
    fn test_branch_aliases() {
        let branch: Branch = serde_json::from_value(json!("Mechanical")).unwrap();
        assert_eq!(branch, Branch::Mech);
        assert_eq!(serde_json::to_value(branch).unwrap(), json!("MECH"));

        assert_eq!("bio tech".parse::<Branch>(), Ok(Branch::Bio));
        assert_eq!("cse".parse::<Branch>(), Ok(Branch::Cse));
        assert!("automobile".parse::<Branch>().is_err());
    }

    #[test]
    fn test_branch_json_matches_parser() {
        for raw in ["cse", "CSE", " Cse ", "civil", "CIVIL", "mechanical", "Bio-Technology"] {
            let parsed = raw.parse::<Branch>();
            let decoded: Result<Branch, _> = serde_json::from_value(json!(raw));

            assert!(parsed.is_ok(), "{raw}");
            assert_eq!(decoded.ok(), parsed.ok(), "{raw}");
        }

        let err = serde_json::from_value::<Branch>(json!("automobile")).unwrap_err();
        assert!(err.to_string().contains("unknown branch: automobile"));
        assert!(serde_json::from_value::<Branch>(json!(5)).is_err());
    }

    #[test]
    fn test_admin_role_shape() {
        let value = serde_json::to_value(AdminRole::Admin {
            branch: Branch::Ece,
        })
        .unwrap();
        assert_eq!(value, json!({ "role": "admin", "branch": "ECE" }));

        let value = serde_json::to_value(AdminRole::SuperAdmin).unwrap();
        assert_eq!(value, json!({ "role": "super_admin" }));
    }

    #[test]
    fn test_role_shape() {
        let value = serde_json::to_value(Role::Student {
            branch: Branch::It,
        })
        .unwrap();
        assert_eq!(value, json!({ "role": "student", "branch": "IT" }));

        let back: Role = serde_json::from_value(value).unwrap();
        assert_eq!(back.name(), "student");
    }

    #[test]
    fn test_registration_is_flat() {
        let registration = Registration {
            id: Uuid::nil(),
            student: Uuid::nil(),
            elective: Uuid::nil(),
            slot: Slot {
                semester: 5,
                elective_type: ElectiveType::Open,
                elective_number: 1,
            },
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&registration).unwrap();
        assert_eq!(value["semester"], json!(5));
        assert_eq!(value["electiveType"], json!("open"));
        assert_eq!(value["electiveNumber"], json!(1));

        let back: Registration = serde_json::from_value(value).unwrap();
        assert_eq!(back, registration);
    }
}
