//! Profile table API client.

use crate::{MergeError, MergeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

/// Onboarding progress as stored in the remote profile tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOnboarding {
    pub step: u32,
    pub completed: bool,
}

/// One week's build activity as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWeeklyUsage {
    pub week_start: String,
    pub builds_this_week: u32,
    pub last_build_at: DateTime<Utc>,
}

/// Interface to the authenticated user's remote progress tables.
///
/// All calls carry the caller's access token; the profile API enforces
/// row-level ownership, so `user_id` is a row filter, not an authority.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_onboarding(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> MergeResult<Option<RemoteOnboarding>>;

    async fn upsert_onboarding(
        &self,
        access_token: &str,
        user_id: &str,
        record: &RemoteOnboarding,
    ) -> MergeResult<()>;

    async fn fetch_weekly_usage(
        &self,
        access_token: &str,
        user_id: &str,
        week_start: &str,
    ) -> MergeResult<Option<RemoteWeeklyUsage>>;

    async fn upsert_weekly_usage(
        &self,
        access_token: &str,
        user_id: &str,
        record: &RemoteWeeklyUsage,
    ) -> MergeResult<()>;

    async fn set_first_story(&self, access_token: &str, user_id: &str) -> MergeResult<()>;
}

/// Production [`ProfileStore`] speaking the profile table REST API.
pub struct HttpProfileStore {
    http_client: reqwest::Client,
    api_url: Url,
    publishable_key: String,
}

impl HttpProfileStore {
    pub fn new(api_url: &str, publishable_key: &str) -> MergeResult<Self> {
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: Url::parse(api_url)?,
            publishable_key: publishable_key.to_string(),
        })
    }

    /// Create a profile store for the configured table API.
    pub fn from_config(config: &fable_config::Config) -> MergeResult<Self> {
        Self::new(&config.api_url, &config.publishable_key)
    }

    fn table_url(&self, table: &str) -> MergeResult<Url> {
        Ok(self.api_url.join(&format!("rest/v1/{}", table))?)
    }

    fn authed(&self, request: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.publishable_key)
            .bearer_auth(access_token)
    }

    async fn check(response: reqwest::Response) -> MergeResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(MergeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_first<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        access_token: &str,
    ) -> MergeResult<Option<T>> {
        let response = self.authed(self.http_client.get(url), access_token).send().await?;
        let response = Self::check(response).await?;
        let mut rows: Vec<T> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn upsert(
        &self,
        url: Url,
        access_token: &str,
        body: &serde_json::Value,
    ) -> MergeResult<()> {
        let response = self
            .authed(self.http_client.post(url), access_token)
            .header("Prefer", "resolution=merge-duplicates")
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    async fn fetch_onboarding(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> MergeResult<Option<RemoteOnboarding>> {
        let mut url = self.table_url("onboarding_progress")?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", user_id))
            .append_pair("select", "step,completed");
        self.fetch_first(url, access_token).await
    }

    async fn upsert_onboarding(
        &self,
        access_token: &str,
        user_id: &str,
        record: &RemoteOnboarding,
    ) -> MergeResult<()> {
        let url = self.table_url("onboarding_progress")?;
        let body = json!([{
            "user_id": user_id,
            "step": record.step,
            "completed": record.completed,
        }]);
        self.upsert(url, access_token, &body).await
    }

    async fn fetch_weekly_usage(
        &self,
        access_token: &str,
        user_id: &str,
        week_start: &str,
    ) -> MergeResult<Option<RemoteWeeklyUsage>> {
        let mut url = self.table_url("weekly_usage")?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", user_id))
            .append_pair("week_start", &format!("eq.{}", week_start))
            .append_pair("select", "week_start,builds_this_week,last_build_at");
        self.fetch_first(url, access_token).await
    }

    async fn upsert_weekly_usage(
        &self,
        access_token: &str,
        user_id: &str,
        record: &RemoteWeeklyUsage,
    ) -> MergeResult<()> {
        let url = self.table_url("weekly_usage")?;
        let body = json!([{
            "user_id": user_id,
            "week_start": record.week_start,
            "builds_this_week": record.builds_this_week,
            "last_build_at": record.last_build_at,
        }]);
        self.upsert(url, access_token, &body).await
    }

    async fn set_first_story(&self, access_token: &str, user_id: &str) -> MergeResult<()> {
        let url = self.table_url("milestones")?;
        let body = json!([{
            "user_id": user_id,
            "name": "first_story_built",
            "reached_at": Utc::now(),
        }]);
        self.upsert(url, access_token, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_joins_under_rest_v1() {
        let store = HttpProfileStore::new("https://api.fable.app/", "pk_test").unwrap();
        let url = store.table_url("weekly_usage").unwrap();
        assert_eq!(url.as_str(), "https://api.fable.app/rest/v1/weekly_usage");
    }

    #[test]
    fn test_from_config_uses_configured_api() {
        let config = fable_config::Config::default();
        let store = HttpProfileStore::from_config(&config).unwrap();
        let url = store.table_url("milestones").unwrap();
        assert!(url.as_str().starts_with(&config.api_url));
    }

    #[test]
    fn test_new_rejects_malformed_url() {
        assert!(HttpProfileStore::new("not a url", "pk_test").is_err());
    }

    #[test]
    fn test_remote_onboarding_round_trips() {
        let record = RemoteOnboarding {
            step: 4,
            completed: false,
        };
        let raw = serde_json::to_string(&record).unwrap();
        let back: RemoteOnboarding = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, record);
    }
}
