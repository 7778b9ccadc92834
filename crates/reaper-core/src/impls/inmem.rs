//! InMemoryControlPlane - テスト・開発用の control plane
//!
//! # 学習ポイント
//! - tokio::sync::Mutex による内部状態の保護（ロックを跨いで await しない）
//! - offset ベースの page token によるページング
//! - 障害注入（一覧・削除のどの階層でも失敗させられる）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    ControlPlaneError, Database, DatabaseName, Instance, InstanceName, Page, ProjectId, Session,
    SessionName,
};
use crate::ports::ControlPlane;

struct DatabaseEntry {
    database: Database,
    sessions: Vec<Session>,
}

struct InstanceEntry {
    instance: Instance,
    databases: Vec<DatabaseEntry>,
}

#[derive(Default)]
struct InMemoryState {
    instances: Vec<InstanceEntry>,

    /// Sessions deleted through `delete_session`, in call order.
    deleted: Vec<SessionName>,

    instance_listing_failure: Option<ControlPlaneError>,
    database_listing_failures: HashMap<InstanceName, ControlPlaneError>,
    session_listing_failures: HashMap<DatabaseName, ControlPlaneError>,
    delete_failures: HashMap<SessionName, ControlPlaneError>,
}

impl InMemoryState {
    fn instance_mut(&mut self, name: &InstanceName) -> Option<&mut InstanceEntry> {
        self.instances.iter_mut().find(|e| &e.instance.name == name)
    }

    fn database(&self, name: &DatabaseName) -> Option<&DatabaseEntry> {
        self.instances
            .iter()
            .flat_map(|i| i.databases.iter())
            .find(|d| &d.database.name == name)
    }

    fn database_mut(&mut self, name: &DatabaseName) -> Option<&mut DatabaseEntry> {
        self.instances
            .iter_mut()
            .flat_map(|i| i.databases.iter_mut())
            .find(|d| &d.database.name == name)
    }
}

/// In-memory control plane.
///
/// # 使用例
/// ```ignore
/// let plane = InMemoryControlPlane::new().with_page_size(2);
/// let inst = plane.add_instance(&project, "inst-a").await?;
/// let db = plane.add_database(&inst, "orders").await?;
/// plane.add_session(&db, "s1", created_at).await?;
/// ```
pub struct InMemoryControlPlane {
    state: Arc<Mutex<InMemoryState>>,
    page_size: usize,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState::default())),
            page_size: usize::MAX,
        }
    }

    /// Split every listing into pages of at most `page_size` items.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn add_instance(
        &self,
        project: &ProjectId,
        instance_id: &str,
    ) -> Result<InstanceName, ControlPlaneError> {
        let name = InstanceName::new(project, instance_id)?;
        self.state.lock().await.instances.push(InstanceEntry {
            instance: Instance { name: name.clone() },
            databases: Vec::new(),
        });
        Ok(name)
    }

    pub async fn add_database(
        &self,
        instance: &InstanceName,
        database_id: &str,
    ) -> Result<DatabaseName, ControlPlaneError> {
        let name = instance.database(database_id)?;
        let mut state = self.state.lock().await;
        let entry = state
            .instance_mut(instance)
            .ok_or_else(|| ControlPlaneError::NotFound(instance.to_string()))?;
        entry.databases.push(DatabaseEntry {
            database: Database { name: name.clone() },
            sessions: Vec::new(),
        });
        Ok(name)
    }

    pub async fn add_session(
        &self,
        database: &DatabaseName,
        session_id: &str,
        create_time: DateTime<Utc>,
    ) -> Result<SessionName, ControlPlaneError> {
        let name = database.session(session_id)?;
        let mut state = self.state.lock().await;
        let entry = state
            .database_mut(database)
            .ok_or_else(|| ControlPlaneError::NotFound(database.to_string()))?;
        entry.sessions.push(Session::new(name.clone(), create_time));
        Ok(name)
    }

    pub async fn fail_instance_listing(&self, err: ControlPlaneError) {
        self.state.lock().await.instance_listing_failure = Some(err);
    }

    pub async fn fail_database_listing(&self, instance: &InstanceName, err: ControlPlaneError) {
        self.state
            .lock()
            .await
            .database_listing_failures
            .insert(instance.clone(), err);
    }

    pub async fn fail_session_listing(&self, database: &DatabaseName, err: ControlPlaneError) {
        self.state
            .lock()
            .await
            .session_listing_failures
            .insert(database.clone(), err);
    }

    pub async fn fail_delete(&self, session: &SessionName, err: ControlPlaneError) {
        self.state
            .lock()
            .await
            .delete_failures
            .insert(session.clone(), err);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.instance_listing_failure = None;
        state.database_listing_failures.clear();
        state.session_listing_failures.clear();
        state.delete_failures.clear();
    }

    /// Sessions deleted so far, in call order.
    pub async fn deleted(&self) -> Vec<SessionName> {
        self.state.lock().await.deleted.clone()
    }

    /// Sessions still present.
    pub async fn live_sessions(&self) -> Vec<SessionName> {
        let state = self.state.lock().await;
        state
            .instances
            .iter()
            .flat_map(|i| i.databases.iter())
            .flat_map(|d| d.sessions.iter())
            .map(|s| s.name.clone())
            .collect()
    }

    fn paginate<T: Clone>(
        &self,
        items: &[T],
        page_token: Option<&str>,
    ) -> Result<Page<T>, ControlPlaneError> {
        let offset = match page_token {
            None | Some("") => 0,
            Some(token) => token.parse::<usize>().map_err(|_| ControlPlaneError::Api {
                status: 400,
                message: format!("invalid page token {token:?}"),
            })?,
        };
        let end = offset.saturating_add(self.page_size).min(items.len());
        let page_items = items.get(offset..end).unwrap_or_default().to_vec();
        if end < items.len() {
            Ok(Page::with_next(page_items, end.to_string()))
        } else {
            Ok(Page::last(page_items))
        }
    }
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn list_instances(
        &self,
        project: &ProjectId,
        page_token: Option<&str>,
    ) -> Result<Page<Instance>, ControlPlaneError> {
        let state = self.state.lock().await;
        if let Some(err) = &state.instance_listing_failure {
            return Err(err.clone());
        }
        let instances: Vec<Instance> = state
            .instances
            .iter()
            .filter(|e| project.owns(&e.instance.name))
            .map(|e| e.instance.clone())
            .collect();
        self.paginate(&instances, page_token)
    }

    async fn list_databases(
        &self,
        instance: &InstanceName,
        page_token: Option<&str>,
    ) -> Result<Page<Database>, ControlPlaneError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.database_listing_failures.get(instance) {
            return Err(err.clone());
        }
        let entry = state
            .instance_mut(instance)
            .ok_or_else(|| ControlPlaneError::NotFound(instance.to_string()))?;
        let databases: Vec<Database> = entry.databases.iter().map(|d| d.database.clone()).collect();
        self.paginate(&databases, page_token)
    }

    async fn list_sessions(
        &self,
        database: &DatabaseName,
        page_token: Option<&str>,
    ) -> Result<Page<Session>, ControlPlaneError> {
        let state = self.state.lock().await;
        if let Some(err) = state.session_listing_failures.get(database) {
            return Err(err.clone());
        }
        let entry = state
            .database(database)
            .ok_or_else(|| ControlPlaneError::NotFound(database.to_string()))?;
        self.paginate(&entry.sessions, page_token)
    }

    async fn delete_session(&self, session: &SessionName) -> Result<(), ControlPlaneError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.delete_failures.get(session) {
            return Err(err.clone());
        }
        let removed = state
            .instances
            .iter_mut()
            .flat_map(|i| i.databases.iter_mut())
            .find_map(|d| {
                let pos = d.sessions.iter().position(|s| &s.name == session)?;
                Some(d.sessions.remove(pos))
            });
        match removed {
            Some(_) => {
                state.deleted.push(session.clone());
                Ok(())
            }
            None => Err(ControlPlaneError::NotFound(session.to_string())),
        }
    }
}
