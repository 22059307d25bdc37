//! # Redis
//!
//! Persistent backend.
//!
//! ## Layout
//!
//! - `students`, `electives`, `registrations`, `admins`: hash of id to JSON document
//! - `students:roll_no`, `electives:code`, `registrations:slot`, `admins:username`:
//!   hash of unique key to id
//!
//! Every write runs as one Lua script, so a key claim and its document land
//! or fail together. A claim whose document is gone is treated as free.
use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use catalog::{Admin, Elective, Registration, Slot, Student};
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use uuid::Uuid;

use super::{Record, Store, StoreError, slot_key};

// KEYS: index, collection. ARGV: key, id, document.
// Returns 1 when written, 0 when a live record owns the key.
static INSERT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local owner = redis.call('HGET', KEYS[1], ARGV[1])
        if owner and redis.call('HEXISTS', KEYS[2], owner) == 1 then
            return 0
        end
        redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
        redis.call('HSET', KEYS[2], ARGV[2], ARGV[3])
        return 1
        ",
    )
});

// KEYS: index, collection. ARGV: id, old key, new key, document.
// Returns 1 when written, 0 when the record is gone, -1 when a live record
// owns the new key.
static REPLACE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('HEXISTS', KEYS[2], ARGV[1]) == 0 then
            return 0
        end
        if ARGV[2] ~= ARGV[3] then
            local owner = redis.call('HGET', KEYS[1], ARGV[3])
            if owner and owner ~= ARGV[1] and redis.call('HEXISTS', KEYS[2], owner) == 1 then
                return -1
            end
            redis.call('HSET', KEYS[1], ARGV[3], ARGV[1])
            if redis.call('HGET', KEYS[1], ARGV[2]) == ARGV[1] then
                redis.call('HDEL', KEYS[1], ARGV[2])
            end
        end
        redis.call('HSET', KEYS[2], ARGV[1], ARGV[4])
        return 1
        ",
    )
});

// KEYS: index, collection. ARGV: id, key.
// Returns the number of documents removed.
static REMOVE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local removed = redis.call('HDEL', KEYS[2], ARGV[1])
        if redis.call('HGET', KEYS[1], ARGV[2]) == ARGV[1] then
            redis.call('HDEL', KEYS[1], ARGV[2])
        end
        return removed
        ",
    )
});

pub struct RedisStore {
    connection: ConnectionManager,
}

fn index_name<T: Record>() -> String {
    format!("{}:{}", T::COLLECTION, T::INDEX)
}

fn decode<T: Record>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }

    async fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.hget(T::COLLECTION, id.to_string()).await?;

        raw.as_deref().map(decode::<T>).transpose()
    }

    async fn by_key<T: Record>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.clone();
        let id: Option<String> = connection.hget(index_name::<T>(), key).await?;

        let Some(id) = id else {
            return Ok(None);
        };

        let id = Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt {
            collection: T::COLLECTION,
            reason: e.to_string(),
        })?;

        self.get(id).await
    }

    async fn all<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Vec<String> = connection.hvals(T::COLLECTION).await?;

        raw.iter().map(|document| decode(document)).collect()
    }

    async fn insert<T: Record>(&self, row: &T) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let key = row.unique_key();

        let written: i64 = INSERT
            .key(index_name::<T>())
            .key(T::COLLECTION)
            .arg(&key)
            .arg(row.id().to_string())
            .arg(serde_json::to_string(row)?)
            .invoke_async(&mut connection)
            .await?;

        if written == 0 {
            return Err(StoreError::UniqueViolation {
                index: T::INDEX,
                key,
            });
        }

        Ok(())
    }

    async fn replace<T: Record>(&self, row: &T) -> Result<bool, StoreError> {
        let Some(current) = self.get::<T>(row.id()).await? else {
            return Ok(false);
        };

        let mut connection = self.connection.clone();
        let key = row.unique_key();

        let written: i64 = REPLACE
            .key(index_name::<T>())
            .key(T::COLLECTION)
            .arg(row.id().to_string())
            .arg(current.unique_key())
            .arg(&key)
            .arg(serde_json::to_string(row)?)
            .invoke_async(&mut connection)
            .await?;

        match written {
            -1 => Err(StoreError::UniqueViolation {
                index: T::INDEX,
                key,
            }),
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    async fn remove<T: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(current) = self.get::<T>(id).await? else {
            return Ok(false);
        };

        let mut connection = self.connection.clone();
        let removed: i64 = REMOVE
            .key(index_name::<T>())
            .key(T::COLLECTION)
            .arg(id.to_string())
            .arg(current.unique_key())
            .invoke_async(&mut connection)
            .await?;

        Ok(removed > 0)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        self.get(id).await
    }

    async fn student_by_roll(&self, roll_no: &str) -> Result<Option<Student>, StoreError> {
        self.by_key(roll_no).await
    }

    async fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.all().await
    }

    async fn insert_student(&self, student: &Student) -> Result<(), StoreError> {
        self.insert(student).await
    }

    async fn replace_student(&self, student: &Student) -> Result<bool, StoreError> {
        self.replace(student).await
    }

    async fn elective(&self, id: Uuid) -> Result<Option<Elective>, StoreError> {
        self.get(id).await
    }

    async fn elective_by_code(&self, code: &str) -> Result<Option<Elective>, StoreError> {
        self.by_key(code).await
    }

    async fn electives(&self) -> Result<Vec<Elective>, StoreError> {
        self.all().await
    }

    async fn insert_elective(&self, elective: &Elective) -> Result<(), StoreError> {
        self.insert(elective).await
    }

    async fn replace_elective(&self, elective: &Elective) -> Result<bool, StoreError> {
        self.replace(elective).await
    }

    async fn delete_elective(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove::<Elective>(id).await
    }

    async fn registration_for_slot(
        &self,
        student: Uuid,
        slot: Slot,
    ) -> Result<Option<Registration>, StoreError> {
        self.by_key(&slot_key(student, slot)).await
    }

    async fn registrations(&self) -> Result<Vec<Registration>, StoreError> {
        self.all().await
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        self.insert(registration).await
    }

    async fn admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError> {
        self.get(id).await
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        self.by_key(username).await
    }

    async fn admins(&self) -> Result<Vec<Admin>, StoreError> {
        self.all().await
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        self.insert(admin).await
    }

    async fn replace_admin(&self, admin: &Admin) -> Result<bool, StoreError> {
        self.replace(admin).await
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove::<Admin>(id).await
    }
}
