//! Bulk student ingestion. Rows are processed one at a time and never abort
//! the batch: a bad row becomes a message in [`IngestSummary::errors`].
use catalog::{Branch, Student, payloads::{IngestSummary, StudentRow}};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{Scope, hash_password},
    database::{Store, StoreError},
    error::AppError,
    utils::cell_text,
};

/// Validated contents of one row.
#[derive(Debug, PartialEq, Eq)]
struct RowFields {
    name: String,
    roll_no: String,
    section: String,
    password: String,
    semester: u32,
}

fn read_row(row: &StudentRow) -> Result<RowFields, String> {
    let name = cell_text(row.name.as_ref());
    let roll_no = cell_text(row.roll_no.as_ref());
    let section = cell_text(row.section.as_ref());
    let password = cell_text(row.password.as_ref());
    let semester = cell_text(row.semester.as_ref());

    let missing: Vec<&str> = [
        ("Name", name.is_none()),
        ("RollNo", roll_no.is_none()),
        ("Section", section.is_none()),
        ("Password", password.is_none()),
        ("Semester", semester.is_none()),
    ]
    .into_iter()
    .filter_map(|(header, absent)| absent.then_some(header))
    .collect();

    let (Some(name), Some(roll_no), Some(section), Some(password), Some(semester)) =
        (name, roll_no, section, password, semester)
    else {
        return Err(format!("missing required fields: {}", missing.join(", ")));
    };

    let semester = semester
        .parse::<u32>()
        .ok()
        .filter(|semester| *semester >= 1)
        .ok_or_else(|| format!("invalid Semester {semester:?}"))?;

    Ok(RowFields {
        name,
        roll_no,
        section,
        password,
        semester,
    })
}

enum Outcome {
    Created,
    Updated,
}

async fn apply_row(
    store: &dyn Store,
    fields: RowFields,
    branch: Branch,
    scope: Scope,
    cost: u32,
) -> Result<Outcome, String> {
    let existing = store
        .student_by_roll(&fields.roll_no)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(student) = existing.as_ref().filter(|s| !scope.admits(s.branch)) {
        return Err(format!(
            "student {} belongs to branch {}",
            fields.roll_no, student.branch
        ));
    }

    let password_hash = hash_password(fields.password, cost)
        .await
        .map_err(|e| e.to_string())?;
    let now = Utc::now();

    match existing {
        Some(mut student) => {
            student.name = fields.name;
            student.section = fields.section;
            student.semester = fields.semester;
            student.branch = branch;
            student.password_hash = password_hash;
            student.updated_at = now;

            if !store
                .replace_student(&student)
                .await
                .map_err(|e| e.to_string())?
            {
                return Err(format!("student {} was removed during upload", student.roll_no));
            }

            debug!(roll_no = %student.roll_no, "Updated student");
            Ok(Outcome::Updated)
        }
        None => {
            let student = Student {
                id: Uuid::new_v4(),
                roll_no: fields.roll_no,
                name: fields.name,
                semester: fields.semester,
                section: fields.section,
                branch,
                password_hash,
                selected_electives: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            match store.insert_student(&student).await {
                Ok(()) => {
                    debug!(roll_no = %student.roll_no, "Created student");
                    Ok(Outcome::Created)
                }
                Err(StoreError::UniqueViolation { .. }) => Err(format!(
                    "student {} was created concurrently",
                    student.roll_no
                )),
                Err(e) => Err(e.to_string()),
            }
        }
    }
}

/// Creates or updates one student per row. New and updated students land in
/// `branch`; rows are numbered from 1 in error messages.
pub async fn ingest_students(
    store: &dyn Store,
    rows: Vec<StudentRow>,
    branch: Branch,
    scope: Scope,
    cost: u32,
) -> Result<IngestSummary, AppError> {
    if !scope.admits(branch) {
        return Err(AppError::AccessDenied(
            "Access denied: branch outside your scope".to_string(),
        ));
    }

    let mut summary = IngestSummary::default();

    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;

        let outcome = match read_row(row) {
            Ok(fields) => apply_row(store, fields, branch, scope, cost).await,
            Err(reason) => Err(reason),
        };

        match outcome {
            Ok(Outcome::Created) => summary.created += 1,
            Ok(Outcome::Updated) => summary.updated += 1,
            Err(reason) => {
                warn!(row = number, "Skipping student row: {reason}");
                summary.errors.push(format!("Row {number}: {reason}"));
            }
        }
    }

    info!(
        %branch,
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors.len(),
        "Student upload completed"
    );

    Ok(summary)
}
