// src/store/supabase.rs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::config::SupabaseConfig;
use crate::errors::{ForgeError, Result};
use crate::identity::{Identity, IdentityProvider};
use crate::models::{ProblemCase, SubmissionRecord};
use crate::store::SubmissionStore;

/// Hosted Supabase project, reached through its REST (PostgREST) and auth endpoints.
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

#[derive(Deserialize)]
struct UserRow {
    role: String,
}

impl SupabaseStore {
    pub fn new(client: Client, config: SupabaseConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Attach the project key, authorising as `bearer` (the anon key when absent).
    fn authed(&self, builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.config.anon_key))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ForgeError::Auth(body));
        }
        Err(ForgeError::StoreApi {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SubmissionStore for SupabaseStore {
    async fn test_cases(&self, problem_id: &str, include_hidden: bool) -> Result<Vec<ProblemCase>> {
        let problem_filter = format!("eq.{}", problem_id);
        let mut query = vec![
            ("select", "id,input,expected_output,is_hidden"),
            ("problem_id", problem_filter.as_str()),
            ("order", "created_at.asc"),
        ];
        if !include_hidden {
            query.push(("is_hidden", "eq.false"));
        }
        let builder = self.client.get(self.url("/rest/v1/test_cases")).query(&query);
        let resp = self.send(self.authed(builder, None)).await?;
        Ok(resp.json().await?)
    }

    async fn save_submission(&self, record: &SubmissionRecord) -> Result<()> {
        let builder = self
            .client
            .post(self.url("/rest/v1/submissions"))
            .header("Prefer", "return=minimal")
            .json(record);
        self.send(self.authed(builder, None)).await?;
        Ok(())
    }

    async fn submissions_for(
        &self,
        user_id: &str,
        problem_id: Option<&str>,
    ) -> Result<Vec<SubmissionRecord>> {
        let user_filter = format!("eq.{}", user_id);
        let problem_filter = problem_id.map(|p| format!("eq.{}", p));
        let mut query = vec![
            ("select", "*"),
            ("user_id", user_filter.as_str()),
            ("order", "created_at.desc"),
        ];
        if let Some(filter) = &problem_filter {
            query.push(("problem_id", filter.as_str()));
        }
        let builder = self.client.get(self.url("/rest/v1/submissions")).query(&query);
        let resp = self.send(self.authed(builder, None)).await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseStore {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let builder = self.client.get(self.url("/auth/v1/user"));
        let user: AuthUser = self.send(self.authed(builder, Some(token))).await?.json().await?;

        let id_filter = format!("eq.{}", user.id);
        let builder = self
            .client
            .get(self.url("/rest/v1/users"))
            .query(&[("select", "role"), ("id", id_filter.as_str())]);
        let rows: Vec<UserRow> = self.send(self.authed(builder, Some(token))).await?.json().await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ForgeError::Auth("user data not found".to_string()))?;

        Ok(Identity {
            user_id: user.id,
            role: row.role.parse()?,
        })
    }
}
