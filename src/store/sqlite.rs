// src/store/sqlite.rs
use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use std::path::PathBuf;

use crate::errors::{ForgeError, Result};
use crate::identity::{Identity, IdentityProvider};
use crate::models::{ProblemCase, SubmissionRecord};
use crate::store::SubmissionStore;

/// Local SQLite database with the same tables as the hosted store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a `sqlite:` url, creating the file and running migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let path = database_url.strip_prefix("sqlite:").ok_or_else(|| {
            ForgeError::Config("DATABASE_URL must start with 'sqlite:'".to_string())
        })?;

        let (db_url, max_connections) = if path.contains(":memory:") {
            // Every connection to :memory: is its own database.
            (database_url.to_string(), 1)
        } else {
            let db_path = PathBuf::from(path);
            let absolute_path = if db_path.is_relative() {
                std::env::current_dir()?.join(&db_path)
            } else {
                db_path
            };
            if let Some(parent) = absolute_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            log::info!("Database file path: {}", absolute_path.display());
            (format!("sqlite://{}?mode=rwc", absolute_path.display()), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ForgeError::Database(e.into()))?;

        log::info!("Database connected and migrated");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_case(&self, problem_id: &str, case: &ProblemCase) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO test_cases (id, problem_id, input, expected_output, is_hidden, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&case.id)
        .bind(problem_id)
        .bind(&case.input)
        .bind(&case.expected_output)
        .bind(case.hidden)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_user(&self, user_id: &str, role: &str, token: &str) -> Result<()> {
        sqlx::query("INSERT INTO users (id, role, token) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(role)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn test_cases(&self, problem_id: &str, include_hidden: bool) -> Result<Vec<ProblemCase>> {
        let rows = sqlx::query(
            r#"
            SELECT id, input, expected_output, is_hidden
            FROM test_cases
            WHERE problem_id = ? AND (? OR is_hidden = 0)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(problem_id)
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProblemCase {
                id: row.get(0),
                input: row.get(1),
                expected_output: row.get(2),
                hidden: row.get(3),
            })
            .collect())
    }

    async fn save_submission(&self, record: &SubmissionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO submissions
                (id, user_id, problem_id, code, language, status, score, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.problem_id)
        .bind(&record.code)
        .bind(&record.language)
        .bind(record.status.as_str())
        .bind(record.score)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn submissions_for(
        &self,
        user_id: &str,
        problem_id: Option<&str>,
    ) -> Result<Vec<SubmissionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, problem_id, code, language, status, score, created_at
            FROM submissions
            WHERE user_id = ? AND (? IS NULL OR problem_id = ?)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(problem_id)
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.get(5);
                Ok(SubmissionRecord {
                    id: row.get(0),
                    user_id: row.get(1),
                    problem_id: row.get(2),
                    code: row.get(3),
                    language: row.get(4),
                    status: status.parse()?,
                    score: row.get(6),
                    created_at: row.get(7),
                })
            })
            .collect()
    }
}

#[async_trait]
impl IdentityProvider for SqliteStore {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let row = sqlx::query("SELECT id, role FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ForgeError::Auth("unknown session token".to_string()))?;
        let role: String = row.get(1);
        Ok(Identity {
            user_id: row.get(0),
            role: role.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::models::{Language, SubmissionStatus};

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn case(id: &str, hidden: bool) -> ProblemCase {
        ProblemCase {
            id: id.to_string(),
            input: format!("in-{}", id),
            expected_output: format!("out-{}", id),
            hidden,
        }
    }

    #[tokio::test]
    async fn hidden_cases_are_filtered() {
        let store = store().await;
        store.insert_case("p1", &case("a", false)).await.unwrap();
        store.insert_case("p1", &case("b", true)).await.unwrap();
        store.insert_case("p2", &case("c", false)).await.unwrap();

        let visible = store.test_cases("p1", false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "a");

        let all = store.test_cases("p1", true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn submissions_round_trip_newest_first() {
        let store = store().await;
        let mut older = SubmissionRecord::saved("u1", "p1", Language::Python, "pass");
        older.created_at = "2025-01-01T00:00:00+00:00".to_string();
        let mut newer = SubmissionRecord::saved("u1", "p2", Language::Cpp, "int main(){}");
        newer.created_at = "2025-02-01T00:00:00+00:00".to_string();
        newer.status = SubmissionStatus::Accepted;
        newer.score = Some(100);
        store.save_submission(&older).await.unwrap();
        store.save_submission(&newer).await.unwrap();

        let all = store.submissions_for("u1", None).await.unwrap();
        assert_eq!(all, vec![newer.clone(), older]);

        let filtered = store.submissions_for("u1", Some("p2")).await.unwrap();
        assert_eq!(filtered, vec![newer]);
        assert!(store.submissions_for("u2", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tokens_resolve_to_identities() {
        let store = store().await;
        store.insert_user("u1", "coder", "tok-1").await.unwrap();

        let identity = store.resolve("tok-1").await.unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.role, Role::Coder);
        assert!(matches!(store.resolve("nope").await, Err(ForgeError::Auth(_))));
    }
}
