use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use indexmap::IndexMap;

use super::{NewUser, User, UserChanges, UserHook, UserId, UserStore, normalize_email};
use crate::{DataError, DataResult};

/// Process-local user store.
///
/// Backs the integration tests and the server's ephemeral mode, where no
/// database url is configured. Insertion order doubles as creation order.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    hook: UserHook,
    users: RwLock<IndexMap<UserId, User>>,
}

impl MemoryUserStore {
    pub fn new(hook: UserHook) -> Self {
        Self {
            hook,
            users: RwLock::new(IndexMap::new()),
        }
    }

    fn read(&self) -> DataResult<RwLockReadGuard<'_, IndexMap<UserId, User>>> {
        self.users.read().map_err(|_| DataError::Poisoned)
    }

    fn write(&self) -> DataResult<RwLockWriteGuard<'_, IndexMap<UserId, User>>> {
        self.users.write().map_err(|_| DataError::Poisoned)
    }
}

fn email_owner<'a>(users: &'a IndexMap<UserId, User>, email: &str) -> Option<&'a User> {
    users.values().find(|user| user.email == email)
}

impl UserStore for MemoryUserStore {
    fn find_by_id(&self, id: &UserId) -> DataResult<Option<User>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> DataResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.read()?;
        Ok(email_owner(&users, &email).cloned())
    }

    fn list(&self) -> DataResult<Vec<User>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn insert(&self, new: NewUser) -> DataResult<User> {
        let user = self.hook.prepare(new)?;
        let mut users = self.write()?;
        if email_owner(&users, &user.email).is_some() {
            return Err(DataError::EmailTaken);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn save(&self, user: &User) -> DataResult<User> {
        let mut users = self.write()?;
        if !users.contains_key(&user.id) {
            return Err(DataError::Query(diesel::result::Error::NotFound));
        }
        if email_owner(&users, &user.email).is_some_and(|owner| owner.id != user.id) {
            return Err(DataError::EmailTaken);
        }
        let mut stored = user.clone();
        stored.email = normalize_email(&stored.email);
        stored.updated_at = Utc::now();
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update(&self, id: &UserId, changes: UserChanges) -> DataResult<Option<User>> {
        let mut users = self.write()?;
        let email = changes.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if email_owner(&users, email).is_some_and(|owner| owner.id != *id) {
                return Err(DataError::EmailTaken);
            }
        }

        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    fn delete(&self, id: &UserId) -> DataResult<Option<User>> {
        Ok(self.write()?.shift_remove(id))
    }
}
