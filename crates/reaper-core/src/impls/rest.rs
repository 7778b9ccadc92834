//! RestControlPlane - Spanner REST v1 による ControlPlane 実装
//!
//! - `GET  {endpoint}/v1/projects/{p}/instances`
//! - `GET  {endpoint}/v1/{instance}/databases`
//! - `GET  {endpoint}/v1/{database}/sessions`
//! - `DELETE {endpoint}/v1/{session}`
//!
//! 各リクエストには `request_timeout` が設定されます。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::auth::TokenSource;
use crate::domain::{
    ControlPlaneError, Database, DatabaseName, Instance, InstanceName, Page, ProjectId,
    ResourceName, Session, SessionName,
};
use crate::domain::names::ResourceKind;
use crate::ports::ControlPlane;

pub const DEFAULT_ENDPOINT: &str = "https://spanner.googleapis.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInstancesResponse {
    #[serde(default)]
    instances: Vec<NamedResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDatabasesResponse {
    #[serde(default)]
    databases: Vec<NamedResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResource {
    name: String,
    create_time: DateTime<Utc>,
    #[serde(default)]
    approximate_last_use_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSessionsResponse {
    #[serde(default)]
    sessions: Vec<SessionResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn page_of<T>(items: Vec<T>, next_page_token: Option<String>) -> Page<T> {
    Page {
        items,
        next_page_token: next_page_token.filter(|t| !t.is_empty()),
    }
}

/// Parse one resource name; malformed entries are logged and skipped.
fn well_formed<K: ResourceKind>(raw: String) -> Option<ResourceName<K>> {
    match ResourceName::parse(raw.as_str()) {
        Ok(name) => Some(name),
        Err(err) => {
            tracing::warn!(name = %raw, error = %err, "skipping malformed resource name");
            None
        }
    }
}

fn instances_page(resp: ListInstancesResponse) -> Page<Instance> {
    let items = resp
        .instances
        .into_iter()
        .filter_map(|r| well_formed(r.name).map(|name| Instance { name }))
        .collect();
    page_of(items, resp.next_page_token)
}

fn databases_page(resp: ListDatabasesResponse) -> Page<Database> {
    let items = resp
        .databases
        .into_iter()
        .filter_map(|r| well_formed(r.name).map(|name| Database { name }))
        .collect();
    page_of(items, resp.next_page_token)
}

fn sessions_page(resp: ListSessionsResponse) -> Page<Session> {
    let items = resp
        .sessions
        .into_iter()
        .filter_map(|r| {
            well_formed(r.name).map(|name| Session {
                name,
                create_time: r.create_time,
                approximate_last_use_time: r.approximate_last_use_time,
            })
        })
        .collect();
    page_of(items, resp.next_page_token)
}

/// Map a non-success HTTP response to a `ControlPlaneError`.
fn error_from_response(status: StatusCode, body: &str) -> ControlPlaneError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{}: {}", envelope.error.status, envelope.error.message),
        Err(_) => body.trim().to_string(),
    };
    match status {
        StatusCode::UNAUTHORIZED => ControlPlaneError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        StatusCode::FORBIDDEN => ControlPlaneError::PermissionDenied(message),
        StatusCode::NOT_FOUND => ControlPlaneError::NotFound(message),
        _ => ControlPlaneError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_from_transport(err: reqwest::Error) -> ControlPlaneError {
    if err.is_timeout() {
        ControlPlaneError::Timeout(err.to_string())
    } else if err.is_decode() {
        ControlPlaneError::Decode(err.to_string())
    } else {
        ControlPlaneError::Transport(err.to_string())
    }
}

/// Spanner REST client.
pub struct RestControlPlane {
    client: Client,
    endpoint: String,
    tokens: TokenSource,
}

impl RestControlPlane {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: TokenSource,
        request_timeout: Duration,
    ) -> Result<Self, ControlPlaneError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(error_from_transport)?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// `SPANNER_EMULATOR_HOST` 形式（`host:port`）から emulator 用クライアントを作成
    pub fn for_emulator(host: &str, request_timeout: Duration) -> Result<Self, ControlPlaneError> {
        Self::new(format!("http://{host}"), TokenSource::None, request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, resource_path: &str, page_token: Option<&str>) -> Result<Url, ControlPlaneError> {
        let mut url = Url::parse(&format!("{}/v1/{}", self.endpoint, resource_path))
            .map_err(|e| ControlPlaneError::Transport(format!("invalid url: {e}")))?;
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("pageToken", token);
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<String, ControlPlaneError> {
        tracing::debug!(%method, %url, "control plane request");
        let mut request = self.client.request(method, url);
        if let Some(token) = self.tokens.bearer().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(error_from_transport)?;
        let status = response.status();
        let body = response.text().await.map_err(error_from_transport)?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource_path: &str,
        page_token: Option<&str>,
    ) -> Result<T, ControlPlaneError> {
        let url = self.url(resource_path, page_token)?;
        let body = self.send(Method::GET, url).await?;
        serde_json::from_str(&body).map_err(|e| ControlPlaneError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ControlPlane for RestControlPlane {
    async fn list_instances(
        &self,
        project: &ProjectId,
        page_token: Option<&str>,
    ) -> Result<Page<Instance>, ControlPlaneError> {
        let path = format!("{}/instances", project.resource_path());
        Ok(instances_page(self.get_json(&path, page_token).await?))
    }

    async fn list_databases(
        &self,
        instance: &InstanceName,
        page_token: Option<&str>,
    ) -> Result<Page<Database>, ControlPlaneError> {
        let path = format!("{instance}/databases");
        Ok(databases_page(self.get_json(&path, page_token).await?))
    }

    async fn list_sessions(
        &self,
        database: &DatabaseName,
        page_token: Option<&str>,
    ) -> Result<Page<Session>, ControlPlaneError> {
        let path = format!("{database}/sessions");
        Ok(sessions_page(self.get_json(&path, page_token).await?))
    }

    async fn delete_session(&self, session: &SessionName) -> Result<(), ControlPlaneError> {
        let url = self.url(session.as_str(), None)?;
        self.send(Method::DELETE, url).await?;
        Ok(())
    }
}
