use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use reaper_core::app::Sweeper;
use reaper_core::domain::{ControlPlaneError, EvictionPolicy, ProjectId, SweepError};
use reaper_core::impls::InMemoryControlPlane;
use reaper_core::ports::FixedClock;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 19, 9, 30, 0).unwrap()
}

fn ago(secs: i64) -> DateTime<Utc> {
    now() - TimeDelta::seconds(secs)
}

fn project() -> ProjectId {
    ProjectId::new("demo-project").unwrap()
}

fn sweeper(plane: &Arc<InMemoryControlPlane>, clock: &Arc<FixedClock>) -> Sweeper {
    Sweeper::new(
        project(),
        plane.clone(),
        clock.clone(),
        EvictionPolicy::new(TimeDelta::seconds(300)),
    )
}

#[tokio::test]
async fn evicts_only_the_old_session() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db_a = plane.add_database(&inst, "db-a").await.unwrap();
    let db_b = plane.add_database(&inst, "db-b").await.unwrap();
    let old = plane.add_session(&db_a, "old", ago(400)).await.unwrap();
    plane.add_session(&db_b, "fresh-1", ago(10)).await.unwrap();
    plane.add_session(&db_b, "fresh-2", ago(10)).await.unwrap();

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![old]);
    assert_eq!(report.instances, 1);
    assert_eq!(report.databases, 2);
    assert_eq!(report.sessions, 3);
    assert_eq!(report.evicted, 1);
    assert_eq!(report.kept, 2);
    assert!(report.is_complete());
    assert_eq!(report.started_at, Some(now()));
}

#[tokio::test]
async fn threshold_boundary_is_inclusive() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    let at = plane.add_session(&db, "at", ago(300)).await.unwrap();
    let below = plane.add_session(&db, "below", ago(299)).await.unwrap();

    sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![at]);
    assert_eq!(plane.live_sessions().await, vec![below]);
}

#[tokio::test]
async fn empty_session_listing_is_not_an_error() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    plane.add_database(&inst, "empty").await.unwrap();

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(report.databases, 1);
    assert_eq!(report.sessions, 0);
    assert!(plane.deleted().await.is_empty());
}

#[tokio::test]
async fn future_create_time_is_skipped_without_error() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    plane
        .add_session(&db, "skewed", now() + TimeDelta::seconds(5))
        .await
        .unwrap();

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(report.future_dated, 1);
    assert_eq!(report.evicted, 0);
    assert!(plane.deleted().await.is_empty());
}

#[tokio::test]
async fn every_page_of_every_level_is_visited() {
    let plane = Arc::new(InMemoryControlPlane::new().with_page_size(2));
    let clock = Arc::new(FixedClock::new(now()));
    let mut expected = Vec::new();
    for i in 0..3 {
        let inst = plane
            .add_instance(&project(), &format!("inst-{i}"))
            .await
            .unwrap();
        for d in 0..3 {
            let db = plane.add_database(&inst, &format!("db-{d}")).await.unwrap();
            for s in 0..5 {
                let name = plane
                    .add_session(&db, &format!("s-{s}"), ago(1_000))
                    .await
                    .unwrap();
                expected.push(name);
            }
        }
    }

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(report.instances, 3);
    assert_eq!(report.databases, 9);
    assert_eq!(report.sessions, 45);
    assert_eq!(report.evicted, 45);
    assert_eq!(plane.deleted().await, expected);
}

#[tokio::test]
async fn session_listing_failure_does_not_stop_siblings() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst_a = plane.add_instance(&project(), "inst-a").await.unwrap();
    let inst_b = plane.add_instance(&project(), "inst-b").await.unwrap();
    let broken = plane.add_database(&inst_a, "broken").await.unwrap();
    let sibling = plane.add_database(&inst_a, "sibling").await.unwrap();
    let other = plane.add_database(&inst_b, "other").await.unwrap();
    plane.add_session(&broken, "hidden", ago(900)).await.unwrap();
    let s1 = plane.add_session(&sibling, "s1", ago(900)).await.unwrap();
    let s2 = plane.add_session(&other, "s2", ago(900)).await.unwrap();
    plane
        .fail_session_listing(&broken, ControlPlaneError::Transport("connection reset".into()))
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![s1, s2]);
    assert_eq!(report.enumeration_failures, 1);
    assert_eq!(report.databases, 3);
    assert!(!report.is_complete());
}

#[tokio::test]
async fn database_listing_failure_skips_only_that_instance() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst_a = plane.add_instance(&project(), "inst-a").await.unwrap();
    let inst_b = plane.add_instance(&project(), "inst-b").await.unwrap();
    let db_a = plane.add_database(&inst_a, "db").await.unwrap();
    let db_b = plane.add_database(&inst_b, "db").await.unwrap();
    plane.add_session(&db_a, "s", ago(900)).await.unwrap();
    let s_b = plane.add_session(&db_b, "s", ago(900)).await.unwrap();
    plane
        .fail_database_listing(
            &inst_a,
            ControlPlaneError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        )
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![s_b]);
    assert_eq!(report.instances, 2);
    assert_eq!(report.databases, 1);
    assert_eq!(report.enumeration_failures, 1);
}

#[tokio::test]
async fn instance_listing_failure_ends_sweep_gracefully() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    plane
        .fail_instance_listing(ControlPlaneError::Timeout("30s".into()))
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(report.instances, 0);
    assert_eq!(report.enumeration_failures, 1);
}

#[tokio::test]
async fn permission_denied_on_one_database_does_not_stop_siblings() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let locked = plane.add_database(&inst, "locked").await.unwrap();
    let sibling = plane.add_database(&inst, "sibling").await.unwrap();
    let hidden = plane.add_session(&locked, "old", ago(900)).await.unwrap();
    let old = plane.add_session(&sibling, "old", ago(900)).await.unwrap();
    plane
        .fail_session_listing(
            &locked,
            ControlPlaneError::PermissionDenied("PERMISSION_DENIED: locked".into()),
        )
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![old]);
    assert!(plane.live_sessions().await.contains(&hidden));
    assert_eq!(report.databases, 2);
    assert_eq!(report.enumeration_failures, 1);
}

#[tokio::test]
async fn permission_denied_on_delete_is_counted_and_skipped() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    let denied = plane.add_session(&db, "denied", ago(900)).await.unwrap();
    let next = plane.add_session(&db, "next", ago(900)).await.unwrap();
    plane
        .fail_delete(&denied, ControlPlaneError::PermissionDenied("denied".into()))
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![next]);
    assert_eq!(report.eviction_failures, 1);
}

#[tokio::test]
async fn credential_failure_is_fatal() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    plane
        .fail_database_listing(
            &inst,
            ControlPlaneError::Unauthorized {
                status: 401,
                message: "token expired".into(),
            },
        )
        .await;

    let err = sweeper(&plane, &clock).sweep().await.unwrap_err();

    assert!(matches!(
        err,
        SweepError::Fatal {
            during: "listing databases",
            ..
        }
    ));
}

#[tokio::test]
async fn deletion_failures_are_logged_and_skipped() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    let gone = plane.add_session(&db, "gone", ago(900)).await.unwrap();
    let flaky = plane.add_session(&db, "flaky", ago(900)).await.unwrap();
    let ok = plane.add_session(&db, "ok", ago(900)).await.unwrap();
    plane
        .fail_delete(&gone, ControlPlaneError::NotFound(gone.to_string()))
        .await;
    plane
        .fail_delete(&flaky, ControlPlaneError::Transport("broken pipe".into()))
        .await;

    let report = sweeper(&plane, &clock).sweep().await.unwrap();

    assert_eq!(plane.deleted().await, vec![ok]);
    assert_eq!(report.evicted, 1);
    assert_eq!(report.already_gone, 1);
    assert_eq!(report.eviction_failures, 1);
}

#[tokio::test]
async fn repeated_sweeps_make_the_same_decisions() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    let young = plane.add_session(&db, "young", ago(60)).await.unwrap();
    let skewed = plane
        .add_session(&db, "skewed", now() + TimeDelta::seconds(5))
        .await
        .unwrap();
    let sweeper = sweeper(&plane, &clock);

    let first = sweeper.sweep().await.unwrap();
    let second = sweeper.sweep().await.unwrap();

    assert_eq!(first, second);
    assert!(plane.deleted().await.is_empty());
    assert_eq!(plane.live_sessions().await, vec![young, skewed]);
}

#[tokio::test]
async fn young_sessions_survive_until_they_cross_the_threshold() {
    let plane = Arc::new(InMemoryControlPlane::new());
    let clock = Arc::new(FixedClock::new(now()));
    let inst = plane.add_instance(&project(), "inst-a").await.unwrap();
    let db = plane.add_database(&inst, "db").await.unwrap();
    let session = plane.add_session(&db, "s", ago(0)).await.unwrap();
    let sweeper = sweeper(&plane, &clock);

    for _ in 0..4 {
        clock.advance(TimeDelta::seconds(60));
        sweeper.sweep().await.unwrap();
        assert!(plane.deleted().await.is_empty());
    }

    clock.advance(TimeDelta::seconds(60));
    sweeper.sweep().await.unwrap();
    assert_eq!(plane.deleted().await, vec![session]);
}
