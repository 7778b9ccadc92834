//! ControlPlane port - 外部のデータベースサービス（Spanner）の管理 API
//!
//! このシステムは一覧取得と session 削除を呼び出すだけで、
//! 実装・整合性・ワイヤプロトコルは外部サービス側の責務です。
//!
//! # 実装
//! - **RestControlPlane**: Spanner REST v1（本番用）
//! - **InMemoryControlPlane**: テスト用（ページサイズ・障害注入を制御可能）

use async_trait::async_trait;

use crate::domain::{
    ControlPlaneError, Database, DatabaseName, Instance, InstanceName, Page, ProjectId, Session,
    SessionName,
};

/// ControlPlane は instance / database / session の一覧と session 削除を提供
///
/// # 設計原則
/// - 一覧はページ単位（`page_token` が `None` なら先頭ページ）
/// - 呼び出し側がページを順に消費する（遅延・有限のシーケンス）
/// - `Send + Sync` を要求（`Arc<dyn ControlPlane>` で共有）
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn list_instances(
        &self,
        project: &ProjectId,
        page_token: Option<&str>,
    ) -> Result<Page<Instance>, ControlPlaneError>;

    async fn list_databases(
        &self,
        instance: &InstanceName,
        page_token: Option<&str>,
    ) -> Result<Page<Database>, ControlPlaneError>;

    async fn list_sessions(
        &self,
        database: &DatabaseName,
        page_token: Option<&str>,
    ) -> Result<Page<Session>, ControlPlaneError>;

    /// Fails with `ControlPlaneError::NotFound` if the session is already gone.
    async fn delete_session(&self, session: &SessionName) -> Result<(), ControlPlaneError>;
}
