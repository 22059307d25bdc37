//! # Stores
//!
//! Four collections back the platform: students, electives, registrations
//! (the ledger) and admins. Each collection has exactly one unique index:
//!
//! | Collection    | Unique key                                            |
//! |---------------|-------------------------------------------------------|
//! | students      | roll number                                           |
//! | electives     | code                                                  |
//! | registrations | student, semester, electiveType, electiveNumber       |
//! | admins        | username                                              |
//!
//! An insert or replace that would break an index fails with
//! [`StoreError::UniqueViolation`] and writes nothing. Callers rely on this to
//! settle races between two requests that both passed an earlier lookup.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: tables behind one lock, used when no Redis URL is set
//! - [`RedisStore`]: one Redis hash per collection holding JSON documents plus
//!   one hash per unique index, both written by one Lua script
use std::sync::Arc;

use async_trait::async_trait;
use catalog::{Admin, Elective, Registration, SelectedElective, Slot, Student};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate {index}: {key}")]
    UniqueViolation { index: &'static str, key: String },

    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt record in {collection}: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },
}

/// A document stored in one collection under one unique index.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const INDEX: &'static str;

    fn id(&self) -> Uuid;

    fn unique_key(&self) -> String;
}

impl Record for Student {
    const COLLECTION: &'static str = "students";
    const INDEX: &'static str = "roll_no";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        self.roll_no.clone()
    }
}

impl Record for Elective {
    const COLLECTION: &'static str = "electives";
    const INDEX: &'static str = "code";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        self.code.clone()
    }
}

impl Record for Registration {
    const COLLECTION: &'static str = "registrations";
    const INDEX: &'static str = "slot";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        slot_key(self.student, self.slot)
    }
}

impl Record for Admin {
    const COLLECTION: &'static str = "admins";
    const INDEX: &'static str = "username";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> String {
        self.username.clone()
    }
}

pub fn slot_key(student: Uuid, slot: Slot) -> String {
    format!(
        "{student}:{}:{}:{}",
        slot.semester, slot.elective_type, slot.elective_number
    )
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError>;

    async fn student_by_roll(&self, roll_no: &str) -> Result<Option<Student>, StoreError>;

    async fn students(&self) -> Result<Vec<Student>, StoreError>;

    async fn insert_student(&self, student: &Student) -> Result<(), StoreError>;

    /// Returns `false` when no student has this id.
    async fn replace_student(&self, student: &Student) -> Result<bool, StoreError>;

    async fn elective(&self, id: Uuid) -> Result<Option<Elective>, StoreError>;

    async fn elective_by_code(&self, code: &str) -> Result<Option<Elective>, StoreError>;

    async fn electives(&self) -> Result<Vec<Elective>, StoreError>;

    async fn insert_elective(&self, elective: &Elective) -> Result<(), StoreError>;

    async fn replace_elective(&self, elective: &Elective) -> Result<bool, StoreError>;

    async fn delete_elective(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn registration_for_slot(
        &self,
        student: Uuid,
        slot: Slot,
    ) -> Result<Option<Registration>, StoreError>;

    async fn registrations(&self) -> Result<Vec<Registration>, StoreError>;

    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError>;

    async fn admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError>;

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError>;

    async fn admins(&self) -> Result<Vec<Admin>, StoreError>;

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError>;

    async fn replace_admin(&self, admin: &Admin) -> Result<bool, StoreError>;

    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn registrations_of(&self, student: Uuid) -> Result<Vec<Registration>, StoreError> {
        let mut registrations = self.registrations().await?;
        registrations.retain(|registration| registration.student == student);

        Ok(registrations)
    }

    /// Overwrites the student's `selectedElectives` cache.
    async fn set_selections(
        &self,
        student: Uuid,
        selections: Vec<SelectedElective>,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = self.student(student).await? else {
            return Ok(false);
        };

        record.selected_electives = selections;
        record.updated_at = Utc::now();

        self.replace_student(&record).await
    }
}

pub async fn init_store(redis_url: Option<&str>) -> Result<Arc<dyn Store>, StoreError> {
    match redis_url {
        Some(url) => {
            info!("Connecting to Redis...");
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
        None => {
            info!("No REDIS_URL set, keeping records in memory");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}
