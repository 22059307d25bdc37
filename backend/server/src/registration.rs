//! # Registration
//!
//! The ledger (registrations collection) is authoritative. The
//! `selectedElectives` list on each student is a projection of that
//! student's ledger rows, rebuilt wholesale whenever it is refreshed, so a
//! refresh can be repeated at any time without changing the outcome.
//!
//! ## Registering
//!
//! 1. Resolve the student, then the elective
//! 2. The elective must be in the student's semester and branch
//! 3. The slot `(semester, electiveType, electiveNumber)` must be free
//! 4. Insert the ledger row with the slot copied from the elective
//! 5. Refresh the student's cache; failures are logged, never returned
//!
//! Steps 3 and 4 are separate round trips. When two requests race past
//! step 3, the slot index rejects the second insert and the caller sees the
//! same [`AppError::SlotAlreadyFilled`] as a sequential duplicate.
use std::collections::{HashMap, HashSet};

use catalog::{
    Registration, SelectedElective, Slot,
    payloads::{ReconcileReport, RegistrationView, StudentSummary},
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::Scope,
    database::{Store, StoreError},
    error::AppError,
};

pub async fn register_elective(
    store: &dyn Store,
    student_id: Uuid,
    elective_id: Uuid,
) -> Result<Registration, AppError> {
    let student = store
        .student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    let elective = store
        .elective(elective_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Elective not found".to_string()))?;

    if elective.semester != student.semester || elective.branch != student.branch {
        return Err(AppError::InvalidSelection);
    }

    let slot = Slot {
        semester: student.semester,
        elective_type: elective.elective_type,
        elective_number: elective.elective_number,
    };

    if store.registration_for_slot(student.id, slot).await?.is_some() {
        return Err(AppError::SlotAlreadyFilled);
    }

    let registration = Registration {
        id: Uuid::new_v4(),
        student: student.id,
        elective: elective.id,
        slot,
        created_at: Utc::now(),
    };

    match store.insert_registration(&registration).await {
        Ok(()) => {}
        Err(StoreError::UniqueViolation { .. }) => {
            info!(%student_id, "Concurrent registration already holds slot");
            return Err(AppError::SlotAlreadyFilled);
        }
        Err(e) => return Err(e.into()),
    }

    info!(%student_id, code = %elective.code, "Registered elective");

    if let Err(e) = reconcile_student(store, student.id).await {
        warn!(%student_id, "Failed to refresh selected electives: {e}");
    }

    Ok(registration)
}

/// Cache entries for a set of ledger rows: one per slot, the latest row
/// winning, ordered by slot.
pub fn project(registrations: &[Registration]) -> Vec<SelectedElective> {
    let mut ordered: Vec<&Registration> = registrations.iter().collect();
    ordered.sort_by_key(|registration| registration.created_at);

    let mut selections: Vec<SelectedElective> = Vec::new();
    for registration in ordered {
        selections.retain(|selection| selection.slot != registration.slot);
        selections.push(SelectedElective {
            slot: registration.slot,
            elective: registration.elective,
        });
    }

    selections.sort_by_key(|selection| {
        (
            selection.slot.semester,
            selection.slot.elective_type,
            selection.slot.elective_number,
        )
    });

    selections
}

/// Rebuilds one student's cache from the ledger. Returns whether anything
/// changed.
pub async fn reconcile_student(store: &dyn Store, student_id: Uuid) -> Result<bool, StoreError> {
    let Some(student) = store.student(student_id).await? else {
        return Ok(false);
    };

    let selections = project(&store.registrations_of(student_id).await?);
    if selections == student.selected_electives {
        return Ok(false);
    }

    store.set_selections(student_id, selections).await
}

pub async fn reconcile_scope(store: &dyn Store, scope: Scope) -> Result<ReconcileReport, AppError> {
    let mut report = ReconcileReport::default();

    for student in store.students().await? {
        if !scope.admits(student.branch) {
            continue;
        }

        report.students += 1;
        if reconcile_student(store, student.id).await? {
            report.changed += 1;
        }
    }

    info!(
        students = report.students,
        changed = report.changed,
        "Reconciled selected electives"
    );

    Ok(report)
}

/// Resolves student and elective references. Rows are returned sorted by
/// roll number, then by slot.
pub async fn populate(
    store: &dyn Store,
    registrations: Vec<Registration>,
) -> Result<Vec<RegistrationView>, AppError> {
    let students: HashMap<Uuid, _> = store
        .students()
        .await?
        .into_iter()
        .map(|student| (student.id, student))
        .collect();

    let electives: HashMap<Uuid, _> = store
        .electives()
        .await?
        .into_iter()
        .map(|elective| (elective.id, elective))
        .collect();

    let mut views: Vec<RegistrationView> = registrations
        .into_iter()
        .map(|registration| RegistrationView {
            id: registration.id,
            student: students.get(&registration.student).map(StudentSummary::from),
            elective: electives.get(&registration.elective).cloned(),
            slot: registration.slot,
            created_at: registration.created_at,
        })
        .collect();

    views.sort_by(|a, b| {
        let roll = |view: &RegistrationView| {
            view.student
                .as_ref()
                .map(|student| student.roll_no.clone())
                .unwrap_or_default()
        };

        roll(a).cmp(&roll(b)).then_with(|| {
            (a.slot.semester, a.slot.elective_type, a.slot.elective_number).cmp(&(
                b.slot.semester,
                b.slot.elective_type,
                b.slot.elective_number,
            ))
        })
    });

    Ok(views)
}

pub async fn my_registrations(
    store: &dyn Store,
    student_id: Uuid,
) -> Result<Vec<RegistrationView>, AppError> {
    let registrations = store.registrations_of(student_id).await?;

    populate(store, registrations).await
}

pub async fn registrations_in_scope(
    store: &dyn Store,
    scope: Scope,
) -> Result<Vec<RegistrationView>, AppError> {
    let visible: HashSet<Uuid> = store
        .students()
        .await?
        .into_iter()
        .filter(|student| scope.admits(student.branch))
        .map(|student| student.id)
        .collect();

    let mut registrations = store.registrations().await?;
    registrations.retain(|registration| visible.contains(&registration.student));

    populate(store, registrations).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{Branch, Elective, ElectiveType, Student};
    use chrono::Duration;

    use super::*;
    use crate::database::MemoryStore;

    fn student(semester: u32, branch: Branch) -> Student {
        Student {
            id: Uuid::new_v4(),
            roll_no: format!("R{}", Uuid::new_v4().simple()),
            name: "Asha".to_string(),
            semester,
            section: "A".to_string(),
            branch,
            password_hash: String::new(),
            selected_electives: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn elective(
        code: &str,
        elective_type: ElectiveType,
        number: u8,
        semester: u32,
        branch: Branch,
    ) -> Elective {
        Elective {
            id: Uuid::new_v4(),
            name: format!("Elective {code}"),
            code: code.to_string(),
            elective_type,
            elective_number: number,
            semester,
            branch,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn seeded() -> (MemoryStore, Student, Elective, Elective) {
        let store = MemoryStore::default();
        let student = student(5, Branch::Cse);
        let oe1 = elective("OE1", ElectiveType::Open, 1, 5, Branch::Cse);
        let oe1b = elective("OE1B", ElectiveType::Open, 1, 5, Branch::Cse);

        store.insert_student(&student).await.unwrap();
        store.insert_elective(&oe1).await.unwrap();
        store.insert_elective(&oe1b).await.unwrap();

        (store, student, oe1, oe1b)
    }

    #[tokio::test]
    async fn test_register_then_slot_filled() {
        let (store, student, oe1, oe1b) = seeded().await;

        let registration = register_elective(&store, student.id, oe1.id).await.unwrap();
        assert_eq!(registration.slot.semester, 5);
        assert_eq!(registration.slot.elective_type, ElectiveType::Open);
        assert_eq!(registration.slot.elective_number, 1);

        let err = register_elective(&store, student.id, oe1b.id).await.unwrap_err();
        assert!(matches!(err, AppError::SlotAlreadyFilled));
        assert_eq!(store.registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_mirrors_cache() {
        let (store, student, oe1, _) = seeded().await;
        register_elective(&store, student.id, oe1.id).await.unwrap();

        let cached = store.student(student.id).await.unwrap().unwrap();
        assert_eq!(
            cached.selected_electives,
            vec![SelectedElective {
                slot: oe1.slot(),
                elective: oe1.id,
            }]
        );
    }

    #[tokio::test]
    async fn test_wrong_semester_or_branch() {
        let (store, student, _, _) = seeded().await;
        let other_semester = elective("PE1", ElectiveType::Professional, 1, 6, Branch::Cse);
        let other_branch = elective("PE2", ElectiveType::Professional, 1, 5, Branch::Ece);
        store.insert_elective(&other_semester).await.unwrap();
        store.insert_elective(&other_branch).await.unwrap();

        for id in [other_semester.id, other_branch.id] {
            let err = register_elective(&store, student.id, id).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidSelection));
        }
        assert!(store.registrations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_records() {
        let (store, student, oe1, _) = seeded().await;

        let err = register_elective(&store, Uuid::new_v4(), oe1.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Student not found"));

        let err = register_elective(&store, student.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Elective not found"));
    }

    #[tokio::test]
    async fn test_distinct_slots_coexist() {
        let (store, student, oe1, _) = seeded().await;
        let pe1 = elective("PE1", ElectiveType::Professional, 1, 5, Branch::Cse);
        let oe2 = elective("OE2", ElectiveType::Open, 2, 5, Branch::Cse);
        store.insert_elective(&pe1).await.unwrap();
        store.insert_elective(&oe2).await.unwrap();

        for id in [oe1.id, pe1.id, oe2.id] {
            register_elective(&store, student.id, id).await.unwrap();
        }

        let cached = store.student(student.id).await.unwrap().unwrap();
        assert_eq!(cached.selected_electives.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_settle_to_one() {
        let (store, student, oe1, oe1b) = seeded().await;
        let store: Arc<dyn Store> = Arc::new(store);
        let student_id = student.id;

        let attempts = (0..16).map(|i| {
            let store = store.clone();
            let elective = if i % 2 == 0 { oe1.id } else { oe1b.id };
            tokio::spawn(async move { register_elective(store.as_ref(), student_id, elective).await })
        });

        let mut accepted = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            match attempt.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::SlotAlreadyFilled) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(store.registrations_of(student_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_cache() {
        let (store, student, oe1, _) = seeded().await;
        register_elective(&store, student.id, oe1.id).await.unwrap();

        store.set_selections(student.id, Vec::new()).await.unwrap();
        assert!(reconcile_student(&store, student.id).await.unwrap());
        assert!(!reconcile_student(&store, student.id).await.unwrap());

        let cached = store.student(student.id).await.unwrap().unwrap();
        assert_eq!(cached.selected_electives.len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_scope_counts() {
        let (store, student, oe1, _) = seeded().await;
        let outsider = self::student(5, Branch::Ece);
        store.insert_student(&outsider).await.unwrap();
        register_elective(&store, student.id, oe1.id).await.unwrap();
        store.set_selections(student.id, Vec::new()).await.unwrap();

        let report = reconcile_scope(&store, Scope::Branch(Branch::Cse)).await.unwrap();
        assert_eq!(report, ReconcileReport { students: 1, changed: 1 });

        let report = reconcile_scope(&store, Scope::All).await.unwrap();
        assert_eq!(report, ReconcileReport { students: 2, changed: 0 });
    }

    #[test]
    fn test_project_keeps_latest_per_slot() {
        let slot = Slot {
            semester: 5,
            elective_type: ElectiveType::Open,
            elective_number: 1,
        };
        let earlier = Registration {
            id: Uuid::new_v4(),
            student: Uuid::nil(),
            elective: Uuid::new_v4(),
            slot,
            created_at: Utc::now() - Duration::minutes(5),
        };
        let later = Registration {
            id: Uuid::new_v4(),
            elective: Uuid::new_v4(),
            created_at: Utc::now(),
            ..earlier.clone()
        };

        let projected = project(&[later.clone(), earlier]);
        assert_eq!(
            projected,
            vec![SelectedElective {
                slot,
                elective: later.elective,
            }]
        );
    }

    #[tokio::test]
    async fn test_scope_filters_registrations() {
        let (store, student, oe1, _) = seeded().await;
        register_elective(&store, student.id, oe1.id).await.unwrap();

        let cse = registrations_in_scope(&store, Scope::Branch(Branch::Cse)).await.unwrap();
        assert_eq!(cse.len(), 1);
        assert_eq!(cse[0].elective.as_ref().map(|e| e.id), Some(oe1.id));
        assert_eq!(
            cse[0].student.as_ref().map(|s| s.roll_no.clone()),
            Some(student.roll_no.clone())
        );

        let ece = registrations_in_scope(&store, Scope::Branch(Branch::Ece)).await.unwrap();
        assert!(ece.is_empty());
    }
}
