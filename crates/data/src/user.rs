mod memory;
mod pg;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{DataError, DataResult};

pub use memory::MemoryUserStore;
pub use pg::PgUserStore;

/// Account role. Stored and rendered in uppercase.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Moderator,
    #[default]
    Client,
}

impl Role {
    pub fn parse(value: &str) -> DataResult<Self> {
        Self::from_str(value).map_err(|_| DataError::InvalidRole(value.to_owned()))
    }

    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// Opaque user identifier, a v4 UUID in hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> DataResult<Self> {
        Uuid::try_parse(value.trim())
            .map(Self)
            .map_err(|_| DataError::InvalidId)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for UserId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Checks a plaintext password against the stored bcrypt hash.
    pub fn verify_password(&self, password: &str) -> DataResult<bool> {
        Ok(bcrypt::verify(password, &self.password_hash)?)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Flips the activation flag. The caller persists the change with
    /// [`UserStore::save`].
    pub fn toggle_activation(&mut self) -> bool {
        self.is_active = !self.is_active;
        self.updated_at = Utc::now();
        self.is_active
    }
}

/// A user that has not been stored yet. `password` is plaintext; the
/// [`UserHook`] hashes it on insert.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Partial update applied by [`UserStore::update`]. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Pre-save hook run on every insert.
///
/// Hashes the plaintext password and promotes the account whose email
/// matches the configured admin address. Nothing here runs on later saves,
/// so a stored hash is never hashed twice.
#[derive(Debug, Clone)]
pub struct UserHook {
    admin_email: Option<String>,
    bcrypt_cost: u32,
}

impl Default for UserHook {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UserHook {
    pub const DEFAULT_COST: u32 = 10;

    pub fn new(admin_email: Option<&str>) -> Self {
        Self {
            admin_email: admin_email
                .map(normalize_email)
                .filter(|email| !email.is_empty()),
            bcrypt_cost: Self::DEFAULT_COST,
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.admin_email.as_deref()
    }

    pub fn prepare(&self, new: NewUser) -> DataResult<User> {
        let email = normalize_email(&new.email);
        let password_hash = bcrypt::hash(&new.password, self.bcrypt_cost)?;

        let mut role = new.role.unwrap_or_default();
        if self.admin_email.as_deref() == Some(email.as_str()) {
            if role != Role::Admin {
                tracing::info!(%email, "assigning admin role to configured admin email");
            }
            role = Role::Admin;
        }

        let now = Utc::now();
        Ok(User {
            id: UserId::new(),
            email,
            password_hash,
            role,
            is_active: new.is_active.unwrap_or(true),
            name: new.name.trim().to_owned(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Storage seam between the web layer and the database.
///
/// Emails passed in are normalized by the implementation, so callers may
/// hand over raw form input.
pub trait UserStore: Send + Sync + fmt::Debug {
    fn find_by_id(&self, id: &UserId) -> DataResult<Option<User>>;

    fn find_by_email(&self, email: &str) -> DataResult<Option<User>>;

    /// All users, oldest first.
    fn list(&self) -> DataResult<Vec<User>>;

    /// Runs the pre-save hook and stores the result.
    ///
    /// Fails with [`DataError::EmailTaken`] if the email is already used.
    fn insert(&self, new: NewUser) -> DataResult<User>;

    /// Persists every mutable column of an existing user.
    ///
    /// Fails with [`DataError::Query`] wrapping `NotFound` if the user is
    /// gone.
    fn save(&self, user: &User) -> DataResult<User>;

    fn update(&self, id: &UserId, changes: UserChanges) -> DataResult<Option<User>>;

    /// Removes the user and returns the deleted record.
    fn delete(&self, id: &UserId) -> DataResult<Option<User>>;
}
