use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::{NewUser, Role, User, UserChanges, UserHook, UserId, UserStore, normalize_email};
use crate::schema::users;
use crate::{DataError, DataResult, DieselPool, PgPooledConnection};

#[derive(Identifiable, Queryable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewDbUser<'a> {
    pub id: String,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub is_active: bool,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for NewDbUser<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id.to_string(),
            email: &user.email,
            password_hash: &user.password_hash,
            role: user.role.as_ref(),
            is_active: user.is_active,
            name: &user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Changeset for [`UserStore::update`]; `None` fields are skipped by diesel.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = users)]
struct DbUserChanges<'a> {
    name: Option<&'a str>,
    email: Option<&'a str>,
    role: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

/// Full-row changeset for [`UserStore::save`].
#[derive(AsChangeset, Debug)]
#[diesel(table_name = users)]
struct DbUserRow<'a> {
    email: &'a str,
    password_hash: &'a str,
    role: &'a str,
    is_active: bool,
    name: &'a str,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = DataError;

    fn try_from(db: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::parse(&db.id)?,
            role: Role::parse(&db.role)?,
            email: db.email,
            password_hash: db.password_hash,
            is_active: db.is_active,
            name: db.name,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

fn map_write_error(err: DieselError) -> DataError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => DataError::EmailTaken,
        other => DataError::Query(other),
    }
}

/// PostgreSQL-backed [`UserStore`].
pub struct PgUserStore {
    db_pool: DieselPool,
    hook: UserHook,
}

impl std::fmt::Debug for PgUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUserStore")
            .field("hook", &self.hook)
            .finish_non_exhaustive()
    }
}

impl PgUserStore {
    pub fn new(db_pool: DieselPool, hook: UserHook) -> Self {
        Self { db_pool, hook }
    }

    fn connect(&self) -> DataResult<PgPooledConnection> {
        Ok(self.db_pool.get()?)
    }
}

impl UserStore for PgUserStore {
    fn find_by_id(&self, id: &UserId) -> DataResult<Option<User>> {
        users::table
            .find(id.to_string())
            .first::<DbUser>(&mut self.connect()?)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn find_by_email(&self, email: &str) -> DataResult<Option<User>> {
        users::table
            .filter(users::email.eq(normalize_email(email)))
            .first::<DbUser>(&mut self.connect()?)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    fn list(&self) -> DataResult<Vec<User>> {
        users::table
            .order(users::created_at.asc())
            .load::<DbUser>(&mut self.connect()?)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    fn insert(&self, new: NewUser) -> DataResult<User> {
        let user = self.hook.prepare(new)?;
        diesel::insert_into(users::table)
            .values(NewDbUser::from(&user))
            .get_result::<DbUser>(&mut self.connect()?)
            .map_err(map_write_error)?
            .try_into()
    }

    fn save(&self, user: &User) -> DataResult<User> {
        let email = normalize_email(&user.email);
        diesel::update(users::table.find(user.id.to_string()))
            .set(DbUserRow {
                email: &email,
                password_hash: &user.password_hash,
                role: user.role.as_ref(),
                is_active: user.is_active,
                name: &user.name,
                updated_at: Utc::now(),
            })
            .get_result::<DbUser>(&mut self.connect()?)
            .map_err(map_write_error)?
            .try_into()
    }

    fn update(&self, id: &UserId, changes: UserChanges) -> DataResult<Option<User>> {
        let email = changes.email.as_deref().map(normalize_email);
        diesel::update(users::table.find(id.to_string()))
            .set(DbUserChanges {
                name: changes.name.as_deref(),
                email: email.as_deref(),
                role: changes.role.as_ref().map(|role| role.as_ref()),
                updated_at: Utc::now(),
            })
            .get_result::<DbUser>(&mut self.connect()?)
            .optional()
            .map_err(map_write_error)?
            .map(User::try_from)
            .transpose()
    }

    fn delete(&self, id: &UserId) -> DataResult<Option<User>> {
        diesel::delete(users::table.find(id.to_string()))
            .get_result::<DbUser>(&mut self.connect()?)
            .optional()?
            .map(User::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_user(id: &str, role: &str) -> DbUser {
        let now = Utc::now();
        DbUser {
            id: id.to_owned(),
            email: "jane@example.com".to_owned(),
            password_hash: "$2b$04$hash".to_owned(),
            role: role.to_owned(),
            is_active: true,
            name: "Jane".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unique_violation_maps_to_email_taken() {
        let err = map_write_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::new()),
        ));
        assert!(matches!(err, DataError::EmailTaken));
    }

    #[test]
    fn other_write_errors_stay_query_errors() {
        let err = map_write_error(DieselError::NotFound);
        assert!(matches!(err, DataError::Query(DieselError::NotFound)));
    }

    #[test]
    fn row_converts_to_user() {
        let id = UserId::new();
        let user = User::try_from(db_user(&id.to_string(), "MODERATOR")).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Moderator);
    }

    #[test]
    fn row_with_unknown_role_is_rejected() {
        let err = User::try_from(db_user(&UserId::new().to_string(), "root")).unwrap_err();
        assert!(matches!(err, DataError::InvalidRole(role) if role == "root"));
    }

    #[test]
    fn row_with_malformed_id_is_rejected() {
        let err = User::try_from(db_user("not-a-uuid", "CLIENT")).unwrap_err();
        assert!(matches!(err, DataError::InvalidId));
    }

    #[test]
    fn insert_row_uses_uppercase_role() {
        let user = User::try_from(db_user(&UserId::new().to_string(), "ADMIN")).unwrap();
        let row = NewDbUser::from(&user);
        assert_eq!(row.role, "ADMIN");
        assert_eq!(row.id, user.id.to_string());
    }
}
