//! SQLite backend
//!
//! One connection per operation, opened on the blocking pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, info};

use super::{
    DiagnosisRecord, DiagnosisStore, NewDiagnosis, NewUser, StoreError, StoreResult, User, UserStore,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

CREATE TABLE IF NOT EXISTS diagnoses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    symptoms TEXT NOT NULL,
    disease_predicted TEXT NOT NULL,
    confidence_score REAL NOT NULL,
    recommendations TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_diagnoses_user ON diagnoses(user_id, created_at);
"#;

const USER_COLUMNS: &str = "id, email, username, hashed_password, is_active, created_at, updated_at";
const DIAGNOSIS_COLUMNS: &str =
    "id, user_id, symptoms, disease_predicted, confidence_score, recommendations, created_at";

#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and its tables.
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf() };
        store.init().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub async fn init(&self) -> StoreResult<()> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            conn.execute_batch(SCHEMA)?;
            info!("Database tables ready at {}", path.display());
            Ok::<_, StoreError>(())
        })
        .await?
    }

    pub async fn table_names(&self) -> StoreResult<Vec<String>> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
            Ok::<_, StoreError>(names)
        })
        .await?
    }

    pub async fn drop_all(&self) -> StoreResult<()> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            conn.execute_batch("DROP TABLE IF EXISTS diagnoses; DROP TABLE IF EXISTS users;")?;
            info!("All tables dropped");
            Ok::<_, StoreError>(())
        })
        .await?
    }
}

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

struct UserRow {
    id: i64,
    email: String,
    username: String,
    hashed_password: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            hashed_password: row.get(3)?,
            is_active: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: self.id,
            email: self.email,
            username: self.username,
            hashed_password: self.hashed_password,
            is_active: self.is_active,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct DiagnosisRow {
    id: i64,
    user_id: i64,
    symptoms: String,
    disease_predicted: String,
    confidence_score: f64,
    recommendations: Option<String>,
    created_at: String,
}

impl DiagnosisRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            symptoms: row.get(2)?,
            disease_predicted: row.get(3)?,
            confidence_score: row.get(4)?,
            recommendations: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> StoreResult<DiagnosisRecord> {
        let recommendations = match self.recommendations {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(DiagnosisRecord {
            id: self.id,
            user_id: self.user_id,
            symptoms: serde_json::from_str(&self.symptoms)?,
            disease_predicted: self.disease_predicted,
            confidence_score: self.confidence_score,
            recommendations,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn select_user(conn: &Connection, clause: &str, value: &dyn rusqlite::ToSql) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, clause);
    conn.query_row(&sql, [value], UserRow::from_row)
        .optional()?
        .map(UserRow::into_user)
        .transpose()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

/// Which of email and username is already taken. Email wins when both are.
fn conflict_for(conn: &Connection, email: &str, username: &str) -> rusqlite::Result<Option<StoreError>> {
    let taken: Option<String> = conn
        .query_row(
            "SELECT email FROM users WHERE email = ?1 OR username = ?2 ORDER BY (email = ?1) DESC LIMIT 1",
            params![email, username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(taken.map(|taken_email| {
        StoreError::Conflict(if taken_email == email {
            "Email already registered".to_string()
        } else {
            "Username already taken".to_string()
        })
    }))
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let ts = now();

            // The unique indexes decide; a losing concurrent insert lands here too.
            if let Err(e) = conn.execute(
                "INSERT INTO users (email, username, hashed_password, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?4)",
                params![&user.email, &user.username, &user.hashed_password, &ts],
            ) {
                if is_unique_violation(&e) {
                    if let Some(conflict) = conflict_for(&conn, &user.email, &user.username)? {
                        return Err(conflict);
                    }
                }
                return Err(e.into());
            }
            let id = conn.last_insert_rowid();
            debug!("Created user {} ({})", id, user.username);

            let created = parse_ts(&ts)?;
            Ok(User {
                id,
                email: user.email,
                username: user.username,
                hashed_password: user.hashed_password,
                is_active: true,
                created_at: created,
                updated_at: created,
            })
        })
        .await?
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let path = self.db_path.clone();
        let email = email.to_string();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            select_user(&conn, "email", &email)
        })
        .await?
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            select_user(&conn, "id", &id)
        })
        .await?
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let removed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            Ok::<_, StoreError>(removed > 0)
        })
        .await?
    }
}

#[async_trait]
impl DiagnosisStore for SqliteStore {
    async fn insert_diagnosis(&self, diagnosis: NewDiagnosis) -> StoreResult<DiagnosisRecord> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let ts = now();
            let symptoms_json = serde_json::to_string(&diagnosis.symptoms)?;
            let recommendations_json = serde_json::to_string(&diagnosis.recommendations)?;

            conn.execute(
                "INSERT INTO diagnoses (user_id, symptoms, disease_predicted, confidence_score, recommendations, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    diagnosis.user_id,
                    &symptoms_json,
                    &diagnosis.disease_predicted,
                    diagnosis.confidence_score,
                    &recommendations_json,
                    &ts
                ],
            )?;

            Ok(DiagnosisRecord {
                id: conn.last_insert_rowid(),
                user_id: diagnosis.user_id,
                symptoms: diagnosis.symptoms,
                disease_predicted: diagnosis.disease_predicted,
                confidence_score: diagnosis.confidence_score,
                recommendations: diagnosis.recommendations,
                created_at: parse_ts(&ts)?,
            })
        })
        .await?
    }

    async fn count_diagnoses(&self, user_id: i64) -> StoreResult<i64> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM diagnoses WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok::<_, StoreError>(count)
        })
        .await?
    }

    async fn list_diagnoses(&self, user_id: i64, skip: u32, limit: u32) -> StoreResult<Vec<DiagnosisRecord>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let sql = format!(
                "SELECT {} FROM diagnoses WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
                DIAGNOSIS_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id, limit, skip], DiagnosisRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(DiagnosisRow::into_record).collect::<StoreResult<Vec<_>>>()
        })
        .await?
    }

    async fn get_diagnosis(&self, user_id: i64, id: i64) -> StoreResult<Option<DiagnosisRecord>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let sql = format!("SELECT {} FROM diagnoses WHERE id = ?1 AND user_id = ?2", DIAGNOSIS_COLUMNS);
            conn.query_row(&sql, params![id, user_id], DiagnosisRow::from_row)
                .optional()?
                .map(DiagnosisRow::into_record)
                .transpose()
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn alice() -> NewUser {
        NewUser {
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            hashed_password: "hash".to_string(),
        }
    }

    fn check(user_id: i64, disease: &str) -> NewDiagnosis {
        NewDiagnosis {
            user_id,
            symptoms: vec!["leaf_drop".to_string()],
            disease_predicted: disease.to_string(),
            confidence_score: 0.85,
            recommendations: vec!["Prune".to_string(), "Mulch".to_string()],
        }
    }

    #[tokio::test]
    async fn test_user_workflow() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;

        let user = store.create_user(alice()).await?;
        assert!(user.is_active);

        let by_email = store.get_user_by_email("alice@example.com").await?.expect("user by email");
        assert_eq!(by_email.id, user.id);
        assert_eq!(store.get_user_by_id(user.id).await?.unwrap().username, "alice");
        assert!(store.get_user_by_id(user.id + 100).await?.is_none());

        assert_eq!(store.table_names().await?, vec!["diagnoses".to_string(), "users".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;
        store.create_user(alice()).await?;

        match store.create_user(alice()).await {
            Err(StoreError::Conflict(msg)) => assert_eq!(msg, "Email already registered"),
            other => panic!("expected conflict, got {:?}", other.map(|u| u.id)),
        }

        let mut same_name = alice();
        same_name.email = "other@example.com".to_string();
        match store.create_user(same_name).await {
            Err(StoreError::Conflict(msg)) => assert_eq!(msg, "Username already taken"),
            other => panic!("expected conflict, got {:?}", other.map(|u| u.id)),
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_report_the_taken_field() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;

        let attempts: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut user = alice();
                    user.username = format!("alice{}", i);
                    store.create_user(user).await
                })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await? {
                Ok(_) => created += 1,
                Err(StoreError::Conflict(msg)) => assert_eq!(msg, "Email already registered"),
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(created, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_email_conflict_takes_precedence() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;
        store.create_user(alice()).await?;
        store
            .create_user(NewUser {
                email: "bob@example.com".to_string(),
                username: "bob".to_string(),
                hashed_password: "hash".to_string(),
            })
            .await?;

        let mut clash = alice();
        clash.username = "bob".to_string();
        match store.create_user(clash).await {
            Err(StoreError::Conflict(msg)) => assert_eq!(msg, "Email already registered"),
            other => panic!("expected conflict, got {:?}", other.map(|u| u.id)),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_paged() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;
        let user = store.create_user(alice()).await?;

        for disease in ["Rust", "Black Spot", "Crown Gall"] {
            store.insert_diagnosis(check(user.id, disease)).await?;
        }

        assert_eq!(store.count_diagnoses(user.id).await?, 3);
        let page = store.list_diagnoses(user.id, 0, 2).await?;
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].disease_predicted, "Crown Gall");
        assert_eq!(page[1].disease_predicted, "Black Spot");

        let rest = store.list_diagnoses(user.id, 2, 10).await?;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].disease_predicted, "Rust");
        assert_eq!(rest[0].recommendations, vec!["Prune".to_string(), "Mulch".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_diagnosis_lookup_is_owner_scoped() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;
        let alice = store.create_user(alice()).await?;
        let bob = store
            .create_user(NewUser {
                email: "bob@example.com".to_string(),
                username: "bob".to_string(),
                hashed_password: "hash".to_string(),
            })
            .await?;

        let record = store.insert_diagnosis(check(alice.id, "Rust")).await?;
        assert!(store.get_diagnosis(alice.id, record.id).await?.is_some());
        assert!(store.get_diagnosis(bob.id, record.id).await?.is_none());
        assert_eq!(store.count_diagnoses(bob.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteStore::new(temp_file.path()).await?;
        let user = store.create_user(alice()).await?;
        let record = store.insert_diagnosis(check(user.id, "Rust")).await?;

        assert!(store.delete_user(user.id).await?);
        assert!(!store.delete_user(user.id).await?);
        assert_eq!(store.count_diagnoses(user.id).await?, 0);
        assert!(store.get_diagnosis(user.id, record.id).await?.is_none());
        Ok(())
    }
}
