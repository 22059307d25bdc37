//! Read-only views for admins: filter values, filtered registrations and
//! per-elective rosters. Everything is restricted to the caller's scope.
use std::collections::{BTreeSet, HashMap, HashSet};

use catalog::{
    Elective, ElectiveType, Registration, Student,
    payloads::{ElectiveRoster, RegistrationView, RosterRow, StudentProfile, Summary, SummaryRow},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Scope,
    database::Store,
    electives::{list_electives, scoped_elective},
    error::AppError,
    registration::populate,
    utils::parity,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFilter {
    pub semester: Option<u32>,
    pub elective_id: Option<Uuid>,
    pub elective_type: Option<ElectiveType>,
    pub section: Option<String>,
}

async fn students_in(store: &dyn Store, scope: Scope) -> Result<Vec<Student>, AppError> {
    let mut students = store.students().await?;
    students.retain(|student| scope.admits(student.branch));

    Ok(students)
}

/// Students in scope without password hashes, sorted by roll number.
pub async fn list_students(store: &dyn Store, scope: Scope) -> Result<Vec<StudentProfile>, AppError> {
    let mut students = students_in(store, scope).await?;
    students.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));

    Ok(students.iter().map(StudentProfile::from).collect())
}

pub async fn semesters(store: &dyn Store, scope: Scope) -> Result<Vec<u32>, AppError> {
    let semesters: BTreeSet<u32> = students_in(store, scope)
        .await?
        .into_iter()
        .map(|student| student.semester)
        .collect();

    Ok(semesters.into_iter().collect())
}

pub async fn sections(
    store: &dyn Store,
    scope: Scope,
    semester: u32,
) -> Result<Vec<String>, AppError> {
    let sections: BTreeSet<String> = students_in(store, scope)
        .await?
        .into_iter()
        .filter(|student| student.semester == semester)
        .map(|student| student.section)
        .collect();

    Ok(sections.into_iter().collect())
}

pub async fn elective_types(
    store: &dyn Store,
    scope: Scope,
    semester: u32,
) -> Result<Vec<ElectiveType>, AppError> {
    let types: BTreeSet<ElectiveType> = list_electives(store, scope, Some(semester))
        .await?
        .into_iter()
        .map(|elective| elective.elective_type)
        .collect();

    Ok(types.into_iter().collect())
}

/// Electives of one semester sorted by name.
pub async fn electives_for_semester(
    store: &dyn Store,
    scope: Scope,
    semester: u32,
) -> Result<Vec<Elective>, AppError> {
    let mut electives = list_electives(store, scope, Some(semester)).await?;
    electives.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(electives)
}

/// Registrations of in-scope students matching every given criterion.
/// `electiveId` takes precedence over `electiveType`.
pub async fn filtered_registrations(
    store: &dyn Store,
    scope: Scope,
    filter: RegistrationFilter,
) -> Result<Vec<RegistrationView>, AppError> {
    let section = filter
        .section
        .as_deref()
        .map(str::trim)
        .filter(|section| !section.is_empty());

    let students: HashSet<Uuid> = students_in(store, scope)
        .await?
        .into_iter()
        .filter(|student| filter.semester.is_none_or(|s| student.semester == s))
        .filter(|student| section.is_none_or(|s| student.section == s))
        .map(|student| student.id)
        .collect();

    let electives: Option<HashSet<Uuid>> = match (filter.elective_id, filter.elective_type) {
        (Some(id), _) => Some(HashSet::from([id])),
        (None, Some(elective_type)) => Some(
            list_electives(store, scope, filter.semester)
                .await?
                .into_iter()
                .filter(|elective| elective.elective_type == elective_type)
                .map(|elective| elective.id)
                .collect(),
        ),
        (None, None) => None,
    };

    let mut registrations = store.registrations().await?;
    registrations.retain(|registration| {
        students.contains(&registration.student)
            && electives
                .as_ref()
                .is_none_or(|ids| ids.contains(&registration.elective))
    });

    populate(store, registrations).await
}

fn roster_rows(
    registrations: &[Registration],
    students: &HashMap<Uuid, Student>,
    elective: Uuid,
    section: Option<&str>,
) -> Vec<RosterRow> {
    let mut rows: Vec<RosterRow> = registrations
        .iter()
        .filter(|registration| registration.elective == elective)
        .filter_map(|registration| students.get(&registration.student))
        .filter(|student| section.is_none_or(|s| student.section == s))
        .map(|student| RosterRow {
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            semester: student.semester,
            section: student.section.clone(),
        })
        .collect();

    rows.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));
    rows
}

async fn student_index(store: &dyn Store) -> Result<HashMap<Uuid, Student>, AppError> {
    Ok(store
        .students()
        .await?
        .into_iter()
        .map(|student| (student.id, student))
        .collect())
}

/// Enrolled students of one elective, optionally one section, sorted by roll
/// number.
pub async fn elective_roster(
    store: &dyn Store,
    scope: Scope,
    elective_id: Uuid,
    section: Option<String>,
) -> Result<ElectiveRoster, AppError> {
    let elective = scoped_elective(store, scope, elective_id).await?;
    let registrations = store.registrations().await?;
    let students = student_index(store).await?;

    let rows = roster_rows(&registrations, &students, elective.id, section.as_deref());

    Ok(ElectiveRoster {
        elective,
        section,
        rows,
    })
}

/// Enrollment count and roster of every elective in scope, ordered by
/// semester then name.
pub async fn summary(store: &dyn Store, scope: Scope) -> Result<Summary, AppError> {
    let electives = list_electives(store, scope, None).await?;
    let registrations = store.registrations().await?;
    let students = student_index(store).await?;

    let mut summary = Summary {
        electives: Vec::with_capacity(electives.len()),
        rosters: Vec::with_capacity(electives.len()),
    };

    for elective in electives {
        let rows = roster_rows(&registrations, &students, elective.id, None);

        summary.electives.push(SummaryRow {
            code: elective.code.clone(),
            name: elective.name.clone(),
            semester: elective.semester,
            parity: parity(elective.semester).to_string(),
            elective_type: elective.elective_type,
            enrollments: rows.len(),
        });
        summary.rosters.push(ElectiveRoster {
            elective,
            section: None,
            rows,
        });
    }

    Ok(summary)
}
