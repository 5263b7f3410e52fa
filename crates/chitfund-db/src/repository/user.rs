//! SurrealDB implementation of [`UserRepository`].

use chitfund_core::error::ChitFundResult;
use chitfund_core::models::user::{CreateUser, UpdateUser, User};
use chitfund_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: Option<String>,
    mobile: Option<String>,
    name: String,
    is_email_verified: bool,
    is_mobile_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: Option<String>,
    mobile: Option<String>,
    name: String,
    is_email_verified: bool,
    is_mobile_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> User {
        User {
            id,
            email: self.email,
            mobile: self.mobile,
            name: self.name,
            is_email_verified: self.is_email_verified,
            is_mobile_verified: self.is_mobile_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid("user", "id", &self.record_id)?;
        Ok(UserRow {
            email: self.email,
            mobile: self.mobile,
            name: self.name,
            is_email_verified: self.is_email_verified,
            is_mobile_verified: self.is_mobile_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id))
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_by_field(&self, field: &'static str, value: &str) -> ChitFundResult<User> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE {field} = $value LIMIT 1"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("{field}={value}")))?;

        Ok(row.try_into_user()?)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> ChitFundResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, mobile = $mobile, name = $name, \
                 is_email_verified = $is_email_verified, \
                 is_mobile_verified = $is_mobile_verified",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("mobile", input.mobile))
            .bind(("name", input.name))
            .bind(("is_email_verified", input.is_email_verified))
            .bind(("is_mobile_verified", input.is_mobile_verified))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("user", id_str.clone(), e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id))
    }

    async fn get_by_id(&self, id: Uuid) -> ChitFundResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id))
    }

    async fn get_by_email(&self, email: &str) -> ChitFundResult<User> {
        self.get_by_field("email", email).await
    }

    async fn get_by_mobile(&self, mobile: &str) -> ChitFundResult<User> {
        self.get_by_field("mobile", mobile).await
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> ChitFundResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.mobile.is_some() {
            sets.push("mobile = $mobile");
        }
        if input.is_email_verified.is_some() {
            sets.push("is_email_verified = $is_email_verified");
        }
        if input.is_mobile_verified.is_some() {
            sets.push("is_mobile_verified = $is_mobile_verified");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(mobile) = input.mobile {
            builder = builder.bind(("mobile", mobile));
        }
        if let Some(verified) = input.is_email_verified {
            builder = builder.bind(("is_email_verified", verified));
        }
        if let Some(verified) = input.is_mobile_verified {
            builder = builder.bind(("is_mobile_verified", verified));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("user", id_str.clone(), e))?;

        // UPDATE on a missing record id yields no rows.
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.into_user(id))
    }
}
