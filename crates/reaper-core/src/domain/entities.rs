//! Entities observed during a sweep.
//!
//! すべて一時的なデータで、sweep ごとに control plane から読み直します
//! （キャッシュ・永続化はしない）。

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::names::{DatabaseName, InstanceName, SessionName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub name: InstanceName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Database {
    pub name: DatabaseName,
}

/// A live server-side session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub name: SessionName,

    /// When the session was created (the only input to the age check).
    pub create_time: DateTime<Utc>,

    /// Informational only; never used for eviction decisions.
    pub approximate_last_use_time: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(name: SessionName, create_time: DateTime<Utc>) -> Self {
        Self {
            name,
            create_time,
            approximate_last_use_time: None,
        }
    }
}

/// One page of a listing.
///
/// `next_page_token` が `None`（または空文字列）なら最終ページ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    pub fn with_next(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: Some(token.into()),
        }
    }
}
