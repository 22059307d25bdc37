//! Elective catalog. Every write validates `electiveNumber` against
//! `electiveType`; admins only ever see their own branch.
use catalog::{
    Elective, ElectiveType,
    payloads::{ElectivePatch, NewElective},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Scope,
    database::{Store, StoreError},
    error::AppError,
};

const DUPLICATE_CODE: &str = "Elective code already exists";

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }

    Ok(value.to_string())
}

fn check_semester(semester: u32) -> Result<u32, AppError> {
    if semester == 0 {
        return Err(AppError::Validation(
            "semester must be at least 1".to_string(),
        ));
    }

    Ok(semester)
}

fn duplicate_code(e: StoreError) -> AppError {
    match e {
        StoreError::UniqueViolation { .. } => AppError::Duplicate(DUPLICATE_CODE.to_string()),
        other => other.into(),
    }
}

pub async fn create_elective(
    store: &dyn Store,
    scope: Scope,
    input: NewElective,
) -> Result<Elective, AppError> {
    let branch = match scope {
        Scope::Branch(branch) => branch,
        Scope::All => input
            .branch
            .ok_or_else(|| AppError::Validation("Branch is required".to_string()))?,
    };

    let name = required("name", &input.name)?;
    let code = required("code", &input.code)?;
    let semester = check_semester(input.semester)?;

    let (Some(elective_type), Some(number)) = (input.elective_type, input.elective_number) else {
        return Err(AppError::Validation(
            "electiveType and electiveNumber are required".to_string(),
        ));
    };
    let elective_number = elective_type.check_number(number)?;

    if store.elective_by_code(&code).await?.is_some() {
        return Err(AppError::Duplicate(DUPLICATE_CODE.to_string()));
    }

    let now = Utc::now();
    let elective = Elective {
        id: Uuid::new_v4(),
        name,
        code,
        elective_type,
        elective_number,
        semester,
        branch,
        created_at: now,
        updated_at: now,
    };

    store
        .insert_elective(&elective)
        .await
        .map_err(duplicate_code)?;

    info!(code = %elective.code, branch = %elective.branch, "Created elective");

    Ok(elective)
}

/// Electives in scope, optionally for one semester, sorted by semester then
/// name.
pub async fn list_electives(
    store: &dyn Store,
    scope: Scope,
    semester: Option<u32>,
) -> Result<Vec<Elective>, AppError> {
    let mut electives = store.electives().await?;
    electives.retain(|elective| {
        scope.admits(elective.branch) && semester.is_none_or(|s| elective.semester == s)
    });
    electives.sort_by(|a, b| a.semester.cmp(&b.semester).then_with(|| a.name.cmp(&b.name)));

    Ok(electives)
}

pub async fn electives_by_type(
    store: &dyn Store,
    scope: Scope,
    elective_type: ElectiveType,
    semester: Option<u32>,
) -> Result<Vec<Elective>, AppError> {
    let mut electives = list_electives(store, scope, semester).await?;
    electives.retain(|elective| elective.elective_type == elective_type);
    electives.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(electives)
}

/// Looks an elective up inside the caller's scope. An elective of another
/// branch answers exactly like a missing one.
pub async fn scoped_elective(
    store: &dyn Store,
    scope: Scope,
    id: Uuid,
) -> Result<Elective, AppError> {
    store
        .elective(id)
        .await?
        .filter(|elective| scope.admits(elective.branch))
        .ok_or_else(|| AppError::NotFound("Elective not found or access denied".to_string()))
}

pub async fn update_elective(
    store: &dyn Store,
    scope: Scope,
    id: Uuid,
    patch: ElectivePatch,
) -> Result<Elective, AppError> {
    let mut elective = scoped_elective(store, scope, id).await?;

    if let Some(name) = &patch.name {
        elective.name = required("name", name)?;
    }

    if let Some(code) = &patch.code {
        let code = required("code", code)?;
        if code != elective.code {
            if store.elective_by_code(&code).await?.is_some() {
                return Err(AppError::Duplicate(DUPLICATE_CODE.to_string()));
            }
            elective.code = code;
        }
    }

    if let Some(semester) = patch.semester {
        elective.semester = check_semester(semester)?;
    }

    if patch.elective_type.is_some() || patch.elective_number.is_some() {
        let elective_type = patch.elective_type.unwrap_or(elective.elective_type);
        let number = patch
            .elective_number
            .unwrap_or(i64::from(elective.elective_number));

        elective.elective_number = elective_type.check_number(number)?;
        elective.elective_type = elective_type;
    }

    elective.updated_at = Utc::now();

    if !store
        .replace_elective(&elective)
        .await
        .map_err(duplicate_code)?
    {
        return Err(AppError::NotFound(
            "Elective not found or access denied".to_string(),
        ));
    }

    info!(code = %elective.code, "Updated elective");

    Ok(elective)
}

/// Ledger rows pointing at a deleted elective are kept.
pub async fn delete_elective(store: &dyn Store, scope: Scope, id: Uuid) -> Result<(), AppError> {
    let elective = scoped_elective(store, scope, id).await?;

    if !store.delete_elective(elective.id).await? {
        return Err(AppError::NotFound(
            "Elective not found or access denied".to_string(),
        ));
    }

    info!(code = %elective.code, "Deleted elective");

    Ok(())
}

/// Electives open to a student: same semester and branch, sorted by name.
pub async fn electives_for_student(
    store: &dyn Store,
    student_id: Uuid,
) -> Result<Vec<Elective>, AppError> {
    let student = store
        .student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    let mut electives = store.electives().await?;
    electives.retain(|elective| {
        elective.semester == student.semester && elective.branch == student.branch
    });
    electives.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(electives)
}

#[cfg(test)]
mod tests {
    use catalog::Branch;

    use super::*;
    use crate::database::MemoryStore;

    fn new_elective(code: &str, elective_type: ElectiveType, number: i64) -> NewElective {
        NewElective {
            name: format!("Elective {code}"),
            code: code.to_string(),
            elective_type: Some(elective_type),
            elective_number: Some(number),
            semester: 5,
            branch: None,
        }
    }

    const CSE: Scope = Scope::Branch(Branch::Cse);

    #[tokio::test]
    async fn test_range_bounds_on_create() {
        let store = MemoryStore::default();

        let cases = [
            ("PE7", ElectiveType::Professional, 7, false),
            ("PE6", ElectiveType::Professional, 6, true),
            ("PE0", ElectiveType::Professional, 0, false),
            ("OE4", ElectiveType::Open, 4, false),
            ("OE3", ElectiveType::Open, 3, true),
        ];

        for (code, elective_type, number, accepted) in cases {
            let result = create_elective(&store, CSE, new_elective(code, elective_type, number)).await;
            match (accepted, result) {
                (true, Ok(elective)) => assert_eq!(i64::from(elective.elective_number), number),
                (false, Err(AppError::Validation(_))) => {}
                (_, other) => panic!("{code}: unexpected {other:?}"),
            }
        }

        assert_eq!(store.electives().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_branch_wins() {
        let store = MemoryStore::default();
        let mut input = new_elective("OE1", ElectiveType::Open, 1);
        input.branch = Some(Branch::Ece);

        let elective = create_elective(&store, CSE, input).await.unwrap();
        assert_eq!(elective.branch, Branch::Cse);
    }

    #[tokio::test]
    async fn test_super_admin_needs_branch() {
        let store = MemoryStore::default();

        let err = create_elective(&store, Scope::All, new_elective("OE1", ElectiveType::Open, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut input = new_elective("OE1", ElectiveType::Open, 1);
        input.branch = Some(Branch::It);
        let elective = create_elective(&store, Scope::All, input).await.unwrap();
        assert_eq!(elective.branch, Branch::It);
    }

    #[tokio::test]
    async fn test_missing_type_or_number() {
        let store = MemoryStore::default();
        let mut input = new_elective("OE1", ElectiveType::Open, 1);
        input.elective_number = None;

        let err = create_elective(&store, CSE, input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("required")));
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let store = MemoryStore::default();
        create_elective(&store, CSE, new_elective("OE1", ElectiveType::Open, 1))
            .await
            .unwrap();

        let err = create_elective(&store, CSE, new_elective("OE1", ElectiveType::Open, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_partial_update_revalidates() {
        let store = MemoryStore::default();
        let elective = create_elective(&store, CSE, new_elective("PE5", ElectiveType::Professional, 5))
            .await
            .unwrap();

        let patch = ElectivePatch {
            elective_type: Some(ElectiveType::Open),
            ..ElectivePatch::default()
        };
        let err = update_elective(&store, CSE, elective.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let patch = ElectivePatch {
            elective_number: Some(7),
            ..ElectivePatch::default()
        };
        assert!(update_elective(&store, CSE, elective.id, patch).await.is_err());

        let patch = ElectivePatch {
            elective_type: Some(ElectiveType::Open),
            elective_number: Some(2),
            name: Some("Renamed".to_string()),
            ..ElectivePatch::default()
        };
        let updated = update_elective(&store, CSE, elective.id, patch).await.unwrap();
        assert_eq!(updated.elective_type, ElectiveType::Open);
        assert_eq!(updated.elective_number, 2);
        assert_eq!(updated.name, "Renamed");

        let stored = store.elective(elective.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_other_branch_looks_missing() {
        let store = MemoryStore::default();
        let ece = create_elective(
            &store,
            Scope::Branch(Branch::Ece),
            new_elective("OE1", ElectiveType::Open, 1),
        )
        .await
        .unwrap();

        let foreign = scoped_elective(&store, CSE, ece.id).await.unwrap_err();
        let missing = scoped_elective(&store, CSE, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert_eq!(foreign.status(), missing.status());

        assert!(delete_elective(&store, CSE, ece.id).await.is_err());
        assert!(store.elective(ece.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_listing_sorted_and_scoped() {
        let store = MemoryStore::default();
        for (code, name, semester) in [("B", "Beta", 6), ("A", "Alpha", 6), ("C", "Gamma", 5)] {
            let mut input = new_elective(code, ElectiveType::Professional, 1);
            input.name = name.to_string();
            input.semester = semester;
            create_elective(&store, CSE, input).await.unwrap();
        }
        create_elective(
            &store,
            Scope::Branch(Branch::It),
            new_elective("IT1", ElectiveType::Open, 1),
        )
        .await
        .unwrap();

        let names: Vec<String> = list_electives(&store, CSE, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);

        assert_eq!(list_electives(&store, CSE, Some(6)).await.unwrap().len(), 2);
        assert_eq!(list_electives(&store, Scope::All, None).await.unwrap().len(), 4);
    }
}
