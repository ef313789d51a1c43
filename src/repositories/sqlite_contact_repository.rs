use crate::domain::{ContactId, EmailAddress, PhoneNumber, UserId, ValidationError};
use crate::error::{StoreError, StoreResult};
use crate::models::{Contact, ContactPage, ContactPatch, NewContact, NewUser, User};
use crate::repositories::traits::{
    ConstraintStatus, ContactRepository, UserRepository, ViolationGroup, USER_PHONE_CONSTRAINT,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    totp_secret   TEXT,
    totp_enabled  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    name       TEXT NOT NULL,
    phone      TEXT NOT NULL,
    email      TEXT,
    address    TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_user_name ON contacts(user_id, name);
"#;

const CONTACT_COLUMNS: &str = "id, user_id, name, phone, email, address, created_at";
const USER_COLUMNS: &str = "id, email, password_hash, totp_secret, totp_enabled, created_at";

fn invalid_column(column: usize, err: ValidationError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    let email: Option<String> = row.get(4)?;

    Ok(Contact {
        id: ContactId::new(row.get(0)?).map_err(|e| invalid_column(0, e))?,
        user_id: UserId::new(row.get(1)?).map_err(|e| invalid_column(1, e))?,
        name: row.get(2)?,
        phone: PhoneNumber::new(row.get::<_, String>(3)?).map_err(|e| invalid_column(3, e))?,
        email: email
            .map(EmailAddress::new)
            .transpose()
            .map_err(|e| invalid_column(4, e))?,
        address: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?).map_err(|e| invalid_column(0, e))?,
        email: EmailAddress::new(row.get::<_, String>(1)?).map_err(|e| invalid_column(1, e))?,
        password_hash: row.get(2)?,
        totp_secret: row.get(3)?,
        totp_enabled: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Unique-index failures, recognised by result code rather than message text.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn fetch_owned(tx: &Transaction<'_>, user_id: UserId, id: ContactId) -> StoreResult<Contact> {
    tx.query_row(
        &format!(
            "SELECT {} FROM contacts WHERE id = ?1 AND user_id = ?2",
            CONTACT_COLUMNS
        ),
        params![id.get(), user_id.get()],
        contact_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("Contact {} not found", id)))
}

fn phone_taken(
    tx: &Transaction<'_>,
    user_id: UserId,
    phone: &str,
    except: Option<ContactId>,
) -> StoreResult<bool> {
    let taken = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM contacts WHERE user_id = ?1 AND phone = ?2 AND id != ?3)",
        params![user_id.get(), phone, except.map(ContactId::get).unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn count_violation_groups(conn: &Connection) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (
             SELECT 1 FROM contacts GROUP BY user_id, phone HAVING COUNT(*) > 1
         )",
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// SQLite-backed contact and user store.
///
/// The connection is shared behind a mutex and every call runs on the
/// blocking thread pool. Writes take `BEGIN IMMEDIATE` transactions, so the
/// phone-uniqueness check and the write it guards are atomic even before
/// the `uq_user_phone` index exists.
#[derive(Clone)]
pub struct SqliteContactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContactRepository {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, creating missing tables.
    ///
    /// Existing tables and rows are left as they are, so a database that
    /// predates the uniqueness constraint can be repaired afterwards.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("SQLite contact store ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Database(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl ContactRepository for SqliteContactRepository {
    async fn get(&self, user_id: UserId, id: ContactId) -> StoreResult<Contact> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            fetch_owned(&tx, user_id, id)
        })
        .await
    }

    async fn list(&self, user_id: UserId, offset: usize, limit: usize) -> StoreResult<ContactPage> {
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let total: i64 = tx.query_row(
                "SELECT COUNT(*) FROM contacts WHERE user_id = ?1",
                params![user_id.get()],
                |row| row.get(0),
            )?;

            let contacts = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM contacts WHERE user_id = ?1
                     ORDER BY name ASC, id ASC LIMIT ?2 OFFSET ?3",
                    CONTACT_COLUMNS
                ))?;
                let rows = stmt.query_map(
                    params![
                        user_id.get(),
                        i64::try_from(limit).unwrap_or(i64::MAX),
                        i64::try_from(offset).unwrap_or(i64::MAX)
                    ],
                    contact_from_row,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            Ok(ContactPage {
                contacts,
                total: total as usize,
            })
        })
        .await
    }

    async fn create(&self, user_id: UserId, contact: NewContact) -> StoreResult<Contact> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let duplicate = || StoreError::DuplicatePhone {
                user_id,
                phone: contact.phone.to_string(),
            };

            if phone_taken(&tx, user_id, contact.phone.as_str(), None)? {
                return Err(duplicate());
            }

            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO contacts (user_id, name, phone, email, address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id.get(),
                    contact.name,
                    contact.phone.as_str(),
                    contact.email.as_ref().map(EmailAddress::as_str),
                    contact.address,
                    created_at
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate()
                } else {
                    e.into()
                }
            })?;
            let id = ContactId::new(tx.last_insert_rowid())?;
            tx.commit()?;

            Ok(Contact {
                id,
                user_id,
                name: contact.name,
                phone: contact.phone,
                email: contact.email,
                address: contact.address,
                created_at,
            })
        })
        .await
    }

    async fn update(
        &self,
        user_id: UserId,
        id: ContactId,
        patch: ContactPatch,
    ) -> StoreResult<Contact> {
        let patch = patch.validate()?;

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = fetch_owned(&tx, user_id, id)?;

            if patch.is_empty() {
                return Ok(existing);
            }

            if let Some(phone) = &patch.phone {
                if *phone != existing.phone && phone_taken(&tx, user_id, phone.as_str(), Some(id))? {
                    return Err(StoreError::DuplicatePhone {
                        user_id,
                        phone: phone.to_string(),
                    });
                }
            }

            let mut assignments: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(name) = &patch.name {
                assignments.push("name = ?");
                values.push(Value::Text(name.clone()));
            }
            if let Some(phone) = &patch.phone {
                assignments.push("phone = ?");
                values.push(Value::Text(phone.to_string()));
            }
            if let Some(email) = &patch.email {
                assignments.push("email = ?");
                values.push(email.as_ref().map_or(Value::Null, |e| Value::Text(e.to_string())));
            }
            if let Some(address) = &patch.address {
                assignments.push("address = ?");
                values.push(address.clone().map_or(Value::Null, Value::Text));
            }
            values.push(Value::Integer(id.get()));
            values.push(Value::Integer(user_id.get()));

            let sql = format!(
                "UPDATE contacts SET {} WHERE id = ? AND user_id = ?",
                assignments.join(", ")
            );
            tx.execute(&sql, params_from_iter(values)).map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicatePhone {
                        user_id,
                        phone: patch
                            .phone
                            .as_ref()
                            .map(PhoneNumber::to_string)
                            .unwrap_or_default(),
                    }
                } else {
                    e.into()
                }
            })?;

            let updated = fetch_owned(&tx, user_id, id)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
    }

    async fn delete(&self, user_id: UserId, id: ContactId) -> StoreResult<()> {
        self.run(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM contacts WHERE id = ?1 AND user_id = ?2",
                params![id.get(), user_id.get()],
            )?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("Contact {} not found", id)));
            }
            Ok(())
        })
        .await
    }

    async fn find_uniqueness_violations(&self) -> StoreResult<Vec<ViolationGroup>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, c.phone
                 FROM contacts c
                 JOIN (
                     SELECT user_id, phone FROM contacts
                     GROUP BY user_id, phone HAVING COUNT(*) > 1
                 ) d ON c.user_id = d.user_id AND c.phone = d.phone
                 ORDER BY c.user_id, c.phone, c.id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut groups: Vec<ViolationGroup> = Vec::new();
            for row in rows {
                let (id, user_id, phone) = row?;
                let id = ContactId::new(id)?;
                let user_id = UserId::new(user_id)?;

                match groups.last_mut() {
                    Some(group) if group.user_id == user_id && group.phone == phone => {
                        group.contact_ids.push(id);
                    }
                    _ => groups.push(ViolationGroup {
                        user_id,
                        phone,
                        contact_ids: vec![id],
                    }),
                }
            }
            Ok(groups)
        })
        .await
    }

    async fn remove_duplicates(
        &self,
        group: &ViolationGroup,
        survivor: ContactId,
    ) -> StoreResult<Vec<ContactId>> {
        let user_id = group.user_id;
        let phone = group.phone.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let survivor_in_group: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM contacts WHERE id = ?1 AND user_id = ?2 AND phone = ?3)",
                params![survivor.get(), user_id.get(), phone],
                |row| row.get(0),
            )?;
            if !survivor_in_group {
                return Err(StoreError::NotFound(format!(
                    "Survivor {} is not in group ({}, {})",
                    survivor, user_id, phone
                )));
            }

            let doomed = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM contacts
                     WHERE user_id = ?1 AND phone = ?2 AND id != ?3 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![user_id.get(), phone, survivor.get()], |row| {
                    row.get::<_, i64>(0)
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            tx.execute(
                "DELETE FROM contacts WHERE user_id = ?1 AND phone = ?2 AND id != ?3",
                params![user_id.get(), phone, survivor.get()],
            )?;

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM contacts WHERE user_id = ?1 AND phone = ?2",
                params![user_id.get(), phone],
                |row| row.get(0),
            )?;
            if remaining != 1 {
                // Dropping the transaction rolls the deletes back.
                return Err(StoreError::ViolationsRemain(1));
            }

            tx.commit()?;
            doomed
                .into_iter()
                .map(|id| ContactId::new(id).map_err(StoreError::from))
                .collect()
        })
        .await
    }

    async fn install_unique_constraint(&self) -> StoreResult<ConstraintStatus> {
        self.run(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let present: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1)",
                params![USER_PHONE_CONSTRAINT],
                |row| row.get(0),
            )?;
            if present {
                return Ok(ConstraintStatus::AlreadyPresent);
            }

            let created = tx.execute(
                &format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {} ON contacts(user_id, phone)",
                    USER_PHONE_CONSTRAINT
                ),
                [],
            );
            match created {
                Ok(_) => {
                    tx.commit()?;
                    Ok(ConstraintStatus::Installed)
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    let remaining = count_violation_groups(&tx)?;
                    Err(StoreError::ViolationsRemain(remaining.max(1)))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}

#[async_trait]
impl UserRepository for SqliteContactRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.run(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![user.email.as_str(), user.password_hash, created_at],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail(user.email.to_string())
                } else {
                    e.into()
                }
            })?;

            Ok(User {
                id: UserId::new(conn.last_insert_rowid())?,
                email: user.email,
                password_hash: user.password_hash,
                totp_secret: None,
                totp_enabled: false,
                created_at,
            })
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.get()],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", id)))
        })
        .await
    }

    async fn find_user_by_email(&self, email: &EmailAddress) -> StoreResult<Option<User>> {
        let email = email.to_string();

        self.run(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                    params![email],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    async fn set_two_factor(
        &self,
        id: UserId,
        secret: Option<String>,
        enabled: bool,
    ) -> StoreResult<User> {
        self.run(move |conn| {
            let updated = conn.execute(
                "UPDATE users SET totp_secret = ?1, totp_enabled = ?2 WHERE id = ?3",
                params![secret, enabled, id.get()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("User {} not found", id)));
            }

            let user = conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id.get()],
                user_from_row,
            )?;
            Ok(user)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert!(is_unique_violation(&err));

        let err = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_invalid_phone_row_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO contacts (user_id, name, phone, created_at) VALUES (1, 'Bad', '12', ?1)",
            params![Utc::now()],
        )
        .unwrap();

        let err = conn
            .query_row(
                &format!("SELECT {} FROM contacts", CONTACT_COLUMNS),
                [],
                contact_from_row,
            )
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(3, _, _)));
    }
}
