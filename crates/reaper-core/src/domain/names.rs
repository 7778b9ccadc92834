//! Resource names (strongly-typed, fully-qualified).
//!
//! Spanner のリソースは `projects/{p}/instances/{i}/databases/{d}/sessions/{s}`
//! という階層的なパスで識別されます。
//!
//! ## Phantom Type パターン
//! `ResourceName<K>` というジェネリック型で共通実装（パース・短縮名・Display）を
//! 提供しつつ、`K` は実行時には使わないマーカー型として、
//! InstanceName / DatabaseName / SessionName を混同できないようにしています。

use std::fmt;
use std::marker::PhantomData;

use serde::{Serialize, Serializer};

/// NameError はリソース名のパース失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("resource name {name:?} has no '/{collection}/' segment")]
    MissingSegment {
        name: String,
        collection: &'static str,
    },

    #[error("resource name {name:?} has an empty {collection} id")]
    EmptyId {
        name: String,
        collection: &'static str,
    },

    #[error("project id must not be empty")]
    EmptyProject,
}

/// ResourceKind は各リソース種別のマーカー trait
///
/// パス中のコレクション名（"instances", "databases", "sessions"）を提供します。
pub trait ResourceKind: Send + Sync + 'static {
    fn collection() -> &'static str;
}

/// Instance のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceKind {}

impl ResourceKind for InstanceKind {
    fn collection() -> &'static str {
        "instances"
    }
}

/// Database のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatabaseKind {}

impl ResourceKind for DatabaseKind {
    fn collection() -> &'static str {
        "databases"
    }
}

/// Session のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKind {}

impl ResourceKind for SessionKind {
    fn collection() -> &'static str {
        "sessions"
    }
}

/// Fully-qualified resource name of kind `K`.
///
/// The short name is the suffix after the *last* `/{collection}/` segment,
/// computed once at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName<K: ResourceKind> {
    full: String,
    short_start: usize,
    _marker: PhantomData<K>,
}

impl<K: ResourceKind> ResourceName<K> {
    /// 完全修飾名をパース
    pub fn parse(full: impl Into<String>) -> Result<Self, NameError> {
        let full = full.into();
        let marker = format!("/{}/", K::collection());
        let Some(pos) = full.rfind(&marker) else {
            return Err(NameError::MissingSegment {
                name: full,
                collection: K::collection(),
            });
        };
        let short_start = pos + marker.len();
        if short_start >= full.len() {
            return Err(NameError::EmptyId {
                name: full,
                collection: K::collection(),
            });
        }
        Ok(Self {
            full,
            short_start,
            _marker: PhantomData,
        })
    }

    /// 完全修飾名（API 呼び出しに使う）
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// 短縮名（ログ表示用）
    pub fn short(&self) -> &str {
        &self.full[self.short_start..]
    }

    fn child<C: ResourceKind>(&self, id: &str) -> Result<ResourceName<C>, NameError> {
        ResourceName::parse(format!("{}/{}/{}", self.full, C::collection(), id))
    }
}

impl<K: ResourceKind> fmt::Display for ResourceName<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl<K: ResourceKind> Serialize for ResourceName<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

/// `projects/{p}/instances/{i}`
pub type InstanceName = ResourceName<InstanceKind>;

/// `projects/{p}/instances/{i}/databases/{d}`
pub type DatabaseName = ResourceName<DatabaseKind>;

/// `projects/{p}/instances/{i}/databases/{d}/sessions/{s}`
pub type SessionName = ResourceName<SessionKind>;

impl InstanceName {
    pub fn new(project: &ProjectId, instance_id: &str) -> Result<Self, NameError> {
        Self::parse(format!(
            "projects/{}/instances/{}",
            project.as_str(),
            instance_id
        ))
    }

    pub fn database(&self, database_id: &str) -> Result<DatabaseName, NameError> {
        self.child(database_id)
    }
}

impl DatabaseName {
    pub fn session(&self, session_id: &str) -> Result<SessionName, NameError> {
        self.child(session_id)
    }
}

/// The project whose instances are swept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, NameError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(NameError::EmptyProject);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `projects/{p}` (parent of instance listings)
    pub fn resource_path(&self) -> String {
        format!("projects/{}", self.0)
    }

    /// Whether `instance` lives in this project.
    pub fn owns(&self, instance: &InstanceName) -> bool {
        instance
            .as_str()
            .strip_prefix(&self.resource_path())
            .is_some_and(|rest| rest.starts_with("/instances/"))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
