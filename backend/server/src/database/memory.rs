use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use catalog::{Admin, Elective, Registration, Slot, Student};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Record, Store, StoreError, slot_key};

struct Table<T> {
    rows: HashMap<Uuid, T>,
    unique: HashMap<String, Uuid>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            unique: HashMap::new(),
        }
    }
}

impl<T: Record> Table<T> {
    fn get(&self, id: Uuid) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn by_key(&self, key: &str) -> Option<T> {
        self.unique.get(key).and_then(|id| self.get(*id))
    }

    fn all(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn insert(&mut self, row: &T) -> Result<(), StoreError> {
        let key = row.unique_key();

        match self.unique.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::UniqueViolation {
                index: T::INDEX,
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(row.id());
                self.rows.insert(row.id(), row.clone());
                Ok(())
            }
        }
    }

    fn replace(&mut self, row: &T) -> Result<bool, StoreError> {
        let Some(current) = self.rows.get(&row.id()) else {
            return Ok(false);
        };

        let old_key = current.unique_key();
        let new_key = row.unique_key();

        if old_key != new_key {
            if self.unique.contains_key(&new_key) {
                return Err(StoreError::UniqueViolation {
                    index: T::INDEX,
                    key: new_key,
                });
            }

            self.unique.remove(&old_key);
            self.unique.insert(new_key, row.id());
        }

        self.rows.insert(row.id(), row.clone());
        Ok(true)
    }

    fn remove(&mut self, id: Uuid) -> bool {
        match self.rows.remove(&id) {
            Some(row) => {
                self.unique.remove(&row.unique_key());
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct Tables {
    students: Table<Student>,
    electives: Table<Elective>,
    registrations: Table<Registration>,
    admins: Table<Admin>,
}

/// Process-local store. Every operation takes the lock once, so each single
/// write is atomic against the unique indexes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        Ok(self.tables.read().students.get(id))
    }

    async fn student_by_roll(&self, roll_no: &str) -> Result<Option<Student>, StoreError> {
        Ok(self.tables.read().students.by_key(roll_no))
    }

    async fn students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.tables.read().students.all())
    }

    async fn insert_student(&self, student: &Student) -> Result<(), StoreError> {
        self.tables.write().students.insert(student)
    }

    async fn replace_student(&self, student: &Student) -> Result<bool, StoreError> {
        self.tables.write().students.replace(student)
    }

    async fn elective(&self, id: Uuid) -> Result<Option<Elective>, StoreError> {
        Ok(self.tables.read().electives.get(id))
    }

    async fn elective_by_code(&self, code: &str) -> Result<Option<Elective>, StoreError> {
        Ok(self.tables.read().electives.by_key(code))
    }

    async fn electives(&self) -> Result<Vec<Elective>, StoreError> {
        Ok(self.tables.read().electives.all())
    }

    async fn insert_elective(&self, elective: &Elective) -> Result<(), StoreError> {
        self.tables.write().electives.insert(elective)
    }

    async fn replace_elective(&self, elective: &Elective) -> Result<bool, StoreError> {
        self.tables.write().electives.replace(elective)
    }

    async fn delete_elective(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().electives.remove(id))
    }

    async fn registration_for_slot(
        &self,
        student: Uuid,
        slot: Slot,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self
            .tables
            .read()
            .registrations
            .by_key(&slot_key(student, slot)))
    }

    async fn registrations(&self) -> Result<Vec<Registration>, StoreError> {
        Ok(self.tables.read().registrations.all())
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        self.tables.write().registrations.insert(registration)
    }

    async fn admin(&self, id: Uuid) -> Result<Option<Admin>, StoreError> {
        Ok(self.tables.read().admins.get(id))
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self.tables.read().admins.by_key(username))
    }

    async fn admins(&self) -> Result<Vec<Admin>, StoreError> {
        Ok(self.tables.read().admins.all())
    }

    async fn insert_admin(&self, admin: &Admin) -> Result<(), StoreError> {
        self.tables.write().admins.insert(admin)
    }

    async fn replace_admin(&self, admin: &Admin) -> Result<bool, StoreError> {
        self.tables.write().admins.replace(admin)
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().admins.remove(id))
    }
}
