//! Accounts: login for every role, password changes and super-admin
//! management of admin accounts.
use catalog::{
    Admin, AdminRole, Branch, Role,
    payloads::{AdminPatch, AdminRoleName, AdminView, LoginRequest, LoginResponse, NewAdmin},
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{TokenCodec, hash_password, verify_password},
    config::Config,
    database::{Store, StoreError},
    error::AppError,
};

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn duplicate_username(e: StoreError) -> AppError {
    match e {
        StoreError::UniqueViolation { .. } => {
            AppError::Conflict("Username already exists".to_string())
        }
        other => other.into(),
    }
}

/// Students log in by roll number. Anyone else is looked up as an admin by
/// username, falling back to the roll number field.
pub async fn login(
    store: &dyn Store,
    tokens: &TokenCodec,
    request: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let roll_no = present(request.roll_no.as_deref());

    if let Some(roll_no) = roll_no {
        if let Some(student) = store.student_by_roll(roll_no).await? {
            if !verify_password(request.password, student.password_hash).await? {
                return Err(AppError::InvalidCredentials);
            }

            info!(roll_no = %student.roll_no, "Student logged in");

            let role = Role::Student {
                branch: student.branch,
            };

            return Ok(LoginResponse {
                token: tokens.issue(student.id, role)?,
                role: role.name().to_string(),
                id: student.id,
                name: student.name,
                branch: Some(student.branch),
                username: None,
                semester: Some(student.semester),
                section: Some(student.section),
            });
        }
    }

    let Some(username) = present(request.username.as_deref()).or(roll_no) else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    let admin = store
        .admin_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(request.password, admin.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let role = Role::from(admin.role);
    info!(username = %admin.username, role = role.name(), "Admin logged in");

    Ok(LoginResponse {
        token: tokens.issue(admin.id, role)?,
        role: role.name().to_string(),
        id: admin.id,
        name: admin.name,
        branch: admin.role.branch(),
        username: Some(admin.username),
        semester: None,
        section: None,
    })
}

pub async fn change_password(
    store: &dyn Store,
    admin_id: Uuid,
    current: Option<String>,
    new: Option<String>,
    cost: u32,
) -> Result<(), AppError> {
    let (Some(current), Some(new)) = (
        current.filter(|p| !p.is_empty()),
        new.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Current password and new password are required".to_string(),
        ));
    };

    let mut admin = store
        .admin(admin_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    if !verify_password(current.clone(), admin.password_hash.clone()).await? {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    if current == new {
        return Err(AppError::Validation(
            "New password must be different from current password".to_string(),
        ));
    }

    admin.password_hash = hash_password(new, cost).await?;
    admin.updated_at = Utc::now();

    if !store.replace_admin(&admin).await? {
        return Err(AppError::NotFound("Admin not found".to_string()));
    }

    info!(username = %admin.username, "Password changed");

    Ok(())
}

/// Newest first.
pub async fn list_admins(store: &dyn Store) -> Result<Vec<AdminView>, AppError> {
    let mut admins = store.admins().await?;
    admins.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(admins.iter().map(AdminView::from).collect())
}

pub async fn create_admin(
    store: &dyn Store,
    input: NewAdmin,
    cost: u32,
) -> Result<AdminView, AppError> {
    let (Some(name), Some(username), Some(password)) = (
        present(input.name.as_deref()),
        present(input.username.as_deref()),
        input.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Name, username and password are required".to_string(),
        ));
    };

    let role = match input.role.unwrap_or(AdminRoleName::Admin) {
        AdminRoleName::Admin => AdminRole::Admin {
            branch: input.branch.ok_or_else(|| {
                AppError::Validation("Branch is required when creating an admin".to_string())
            })?,
        },
        AdminRoleName::SuperAdmin => AdminRole::SuperAdmin,
    };

    if store.admin_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let now = Utc::now();
    let admin = Admin {
        id: Uuid::new_v4(),
        name: name.to_string(),
        username: username.to_string(),
        password_hash: hash_password(password.to_string(), cost).await?,
        role,
        created_at: now,
        updated_at: now,
    };

    store
        .insert_admin(&admin)
        .await
        .map_err(duplicate_username)?;

    info!(username = %admin.username, "Created admin");

    Ok(AdminView::from(&admin))
}

pub async fn update_admin(
    store: &dyn Store,
    id: Uuid,
    patch: AdminPatch,
    cost: u32,
) -> Result<AdminView, AppError> {
    let mut admin = store
        .admin(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    if let Some(username) = present(patch.username.as_deref()) {
        if username != admin.username {
            if store.admin_by_username(username).await?.is_some() {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
            admin.username = username.to_string();
        }
    }

    if let Some(name) = present(patch.name.as_deref()) {
        admin.name = name.to_string();
    }

    let role = patch.role.unwrap_or(match admin.role {
        AdminRole::Admin { .. } => AdminRoleName::Admin,
        AdminRole::SuperAdmin => AdminRoleName::SuperAdmin,
    });

    admin.role = match role {
        AdminRoleName::Admin => AdminRole::Admin {
            branch: patch.branch.or(admin.role.branch()).ok_or_else(|| {
                AppError::Validation("Branch is required for administrators".to_string())
            })?,
        },
        AdminRoleName::SuperAdmin => AdminRole::SuperAdmin,
    };

    if let Some(password) = patch.password.filter(|p| !p.is_empty()) {
        admin.password_hash = hash_password(password, cost).await?;
    }

    admin.updated_at = Utc::now();

    if !store
        .replace_admin(&admin)
        .await
        .map_err(duplicate_username)?
    {
        return Err(AppError::NotFound("Admin not found".to_string()));
    }

    info!(username = %admin.username, "Updated admin");

    Ok(AdminView::from(&admin))
}

pub async fn delete_admin(store: &dyn Store, caller: Uuid, id: Uuid) -> Result<(), AppError> {
    if caller == id {
        return Err(AppError::Validation(
            "You cannot delete your own administrator account".to_string(),
        ));
    }

    if !store.delete_admin(id).await? {
        return Err(AppError::NotFound("Admin not found".to_string()));
    }

    info!(%id, "Deleted admin");

    Ok(())
}

async fn seed_one(
    store: &dyn Store,
    name: String,
    username: String,
    password: &str,
    role: AdminRole,
    cost: u32,
) -> Result<bool, AppError> {
    if store.admin_by_username(&username).await?.is_some() {
        return Ok(false);
    }

    let now = Utc::now();
    let admin = Admin {
        id: Uuid::new_v4(),
        name,
        username,
        password_hash: hash_password(password.to_string(), cost).await?,
        role,
        created_at: now,
        updated_at: now,
    };

    match store.insert_admin(&admin).await {
        Ok(()) => Ok(true),
        Err(StoreError::UniqueViolation { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// One admin per branch plus the configured super-admin. Existing accounts
/// are left alone.
pub async fn seed_admins(store: &dyn Store, config: &Config) -> Result<usize, AppError> {
    let mut created = 0;

    for branch in Branch::ALL {
        let seeded = seed_one(
            store,
            format!("{branch} Admin"),
            format!("admin{}", branch.as_str().to_lowercase()),
            &config.default_admin_password,
            AdminRole::Admin { branch },
            config.bcrypt_cost,
        )
        .await?;

        if seeded {
            created += 1;
        }
    }

    match &config.super_admin {
        Some(seed) => {
            let seeded = seed_one(
                store,
                "Super Admin".to_string(),
                seed.username.clone(),
                &seed.password,
                AdminRole::SuperAdmin,
                config.bcrypt_cost,
            )
            .await?;

            if seeded {
                created += 1;
            }
        }
        None => warn!("No super-admin configured"),
    }

    info!(created, "Seeded admin accounts");

    Ok(created)
}
