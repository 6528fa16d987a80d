// src/store/mod.rs

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::errors::Result;
use crate::identity::IdentityProvider;
use crate::models::{ProblemCase, SubmissionRecord};

pub mod sqlite;
pub mod supabase;

use sqlite::SqliteStore;
use supabase::SupabaseStore;

/// The relational data store holding test cases and submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Cases of `problem_id` in creation order. Hidden cases only when asked for.
    async fn test_cases(&self, problem_id: &str, include_hidden: bool) -> Result<Vec<ProblemCase>>;

    async fn save_submission(&self, record: &SubmissionRecord) -> Result<()>;

    /// Newest first.
    async fn submissions_for(
        &self,
        user_id: &str,
        problem_id: Option<&str>,
    ) -> Result<Vec<SubmissionRecord>>;
}

/// Write `record`, logging instead of failing.
pub async fn record_best_effort(store: &dyn SubmissionStore, record: &SubmissionRecord) {
    match store.save_submission(record).await {
        Ok(()) => log::info!(
            "Saved submission {} ({}) for user {}",
            record.id,
            record.status.as_str(),
            record.user_id
        ),
        Err(e) => log::error!("Failed to save submission {}: {}", record.id, e),
    }
}

/// Store and identity provider backed by the configured service.
pub struct Backends {
    pub store: Arc<dyn SubmissionStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub async fn connect(config: &StoreConfig, client: reqwest::Client) -> Result<Backends> {
    match config {
        StoreConfig::Sqlite { url } => {
            let store = Arc::new(SqliteStore::connect(url).await?);
            Ok(Backends {
                store: store.clone(),
                identity: store,
            })
        }
        StoreConfig::Supabase(supabase) => {
            let store = Arc::new(SupabaseStore::new(client, supabase.clone()));
            Ok(Backends {
                store: store.clone(),
                identity: store,
            })
        }
    }
}
