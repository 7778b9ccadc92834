//! Sweeper - instance → database → session の 1 回分の走査
//!
//! # フロー
//! 1. ControlPlane::list_instances() をページ順に消費
//! 2. instance ごとに list_databases()
//! 3. database ごとに list_sessions()
//! 4. session ごとに EvictionPolicy で判定し、必要なら delete_session()
//!
//! # 障害の局所化
//! - 一覧取得の失敗はその階層のサブツリーだけをスキップ（兄弟は続行）
//! - 削除の失敗はログを出して次の session へ
//! - 認証エラー（401）だけが sweep 全体を中断する。認可エラー（403）はサブツリーのスキップ

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};

use crate::domain::policy::as_secs_f64;
use crate::domain::{
    ControlPlaneError, Database, EvictionPolicy, Instance, Page, ProjectId, Session, SweepError,
    SweepReport, Verdict,
};
use crate::ports::{Clock, ControlPlane};

/// Tracks the page token of one listing.
#[derive(Debug, Default)]
struct PageCursor {
    next: Option<String>,
    exhausted: bool,
}

impl PageCursor {
    fn has_more(&self) -> bool {
        !self.exhausted
    }

    fn token(&self) -> Option<&str> {
        self.next.as_deref()
    }

    fn advance<T>(&mut self, page: Page<T>) -> Vec<T> {
        self.next = page.next_page_token.filter(|t| !t.is_empty());
        self.exhausted = self.next.is_none();
        page.items
    }
}

/// Walks the whole hierarchy of one project once.
///
/// Holds no state between sweeps; every call re-lists everything.
pub struct Sweeper {
    project: ProjectId,
    control_plane: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    policy: EvictionPolicy,
}

impl Sweeper {
    pub fn new(
        project: ProjectId,
        control_plane: Arc<dyn ControlPlane>,
        clock: Arc<dyn Clock>,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            project,
            control_plane,
            clock,
            policy,
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Run one sweep.
    ///
    /// Returns `Err` only for fatal (credential) failures. Everything else is
    /// logged and counted in the report.
    pub async fn sweep(&self) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::started(self.clock.now());
        info!(
            project = %self.project,
            threshold_secs = as_secs_f64(self.policy.threshold()),
            "checking long-running sessions"
        );

        self.sweep_project(&mut report)
            .instrument(info_span!("sweep", project = %self.project))
            .await?;

        report.finished_at = Some(self.clock.now());
        info!(
            instances = report.instances,
            databases = report.databases,
            sessions = report.sessions,
            evicted = report.evicted,
            kept = report.kept,
            future_dated = report.future_dated,
            already_gone = report.already_gone,
            enumeration_failures = report.enumeration_failures,
            eviction_failures = report.eviction_failures,
            complete = report.is_complete(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_project(&self, report: &mut SweepReport) -> Result<(), SweepError> {
        let mut cursor = PageCursor::default();
        while cursor.has_more() {
            let page = match self
                .control_plane
                .list_instances(&self.project, cursor.token())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    // Nothing else to visit without the instance list.
                    return listing_failed("listing instances", self.project.as_str(), err, report);
                }
            };
            for instance in cursor.advance(page) {
                report.instances += 1;
                self.sweep_instance(&instance, report)
                    .instrument(info_span!("instance", instance = %instance.name.short()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn sweep_instance(
        &self,
        instance: &Instance,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        info!(instance = %instance.name, "instance");

        let mut cursor = PageCursor::default();
        while cursor.has_more() {
            let page = match self
                .control_plane
                .list_databases(&instance.name, cursor.token())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    return listing_failed("listing databases", instance.name.as_str(), err, report);
                }
            };
            for database in cursor.advance(page) {
                report.databases += 1;
                self.sweep_database(&database, report)
                    .instrument(info_span!("database", database = %database.name.short()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn sweep_database(
        &self,
        database: &Database,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        info!(database = %database.name.short(), "database");

        let mut cursor = PageCursor::default();
        while cursor.has_more() {
            let page = match self
                .control_plane
                .list_sessions(&database.name, cursor.token())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    return listing_failed("listing sessions", database.name.as_str(), err, report);
                }
            };
            for session in cursor.advance(page) {
                report.sessions += 1;
                self.evaluate_session(&session, report).await?;
            }
        }
        Ok(())
    }

    async fn evaluate_session(
        &self,
        session: &Session,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        let now = self.clock.now();
        match self.policy.evaluate(session.create_time, now) {
            Verdict::Keep { age } => {
                report.kept += 1;
                info!(
                    session = %session.name.short(),
                    age_secs = as_secs_f64(age),
                    last_used = ?session.approximate_last_use_time,
                    "session"
                );
                Ok(())
            }
            Verdict::FutureCreateTime { ahead } => {
                report.future_dated += 1;
                warn!(
                    session = %session.name.short(),
                    create_time = %session.create_time,
                    ahead_secs = as_secs_f64(ahead),
                    "session create_time is ahead of the local clock; not eligible"
                );
                Ok(())
            }
            Verdict::Evict { age } => self.evict(session, age, report).await,
        }
    }

    async fn evict(
        &self,
        session: &Session,
        age: chrono::TimeDelta,
        report: &mut SweepReport,
    ) -> Result<(), SweepError> {
        let age_secs = as_secs_f64(age);
        match self.control_plane.delete_session(&session.name).await {
            Ok(()) => {
                report.evicted += 1;
                info!(
                    session = %session.name,
                    age_secs,
                    threshold_secs = as_secs_f64(self.policy.threshold()),
                    "session evicted"
                );
                Ok(())
            }
            Err(ControlPlaneError::NotFound(_)) => {
                report.already_gone += 1;
                info!(session = %session.name, age_secs, "session already gone");
                Ok(())
            }
            Err(err) if err.is_fatal() => {
                error!(session = %session.name, error = %err, "fatal error while evicting session");
                Err(SweepError::Fatal {
                    during: "deleting session",
                    source: err,
                })
            }
            Err(err) => {
                report.eviction_failures += 1;
                warn!(
                    session = %session.name,
                    age_secs,
                    error = %err,
                    kind = ?err.kind(),
                    "failed to evict session"
                );
                Ok(())
            }
        }
    }
}

/// Record a failed listing. Fatal errors abort the sweep; the rest only end
/// the current sub-tree.
fn listing_failed(
    during: &'static str,
    parent: &str,
    err: ControlPlaneError,
    report: &mut SweepReport,
) -> Result<(), SweepError> {
    if err.is_fatal() {
        error!(parent, error = %err, "fatal error while {during}");
        return Err(SweepError::Fatal {
            during,
            source: err,
        });
    }
    report.enumeration_failures += 1;
    warn!(parent, error = %err, kind = ?err.kind(), "{during} failed; skipping");
    Ok(())
}
