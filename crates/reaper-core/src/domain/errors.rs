//! Errors - エラー型と分類
//!
//! control plane 呼び出しの失敗を運用上の分類（ErrorKind）にマッピングし、
//! sweep がどこまで処理を続けるかを決めます。

use super::names::NameError;

/// ErrorKind は control plane エラーの分類
///
/// - Fatal: 認証エラー（credential が無効、ループ全体を停止）
/// - Transient: 一時的なエラー（次の sweep で自然に再試行される）
/// - Permanent: 恒久的なエラー（対象のサブツリーをスキップ）
///
/// 認可エラー（403）は個別リソースの IAM に依存するため Permanent 扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fatal,
    Transient,
    Permanent,
}

/// Failure of a single control-plane call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("unauthenticated (http {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("api error (http {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ControlPlaneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControlPlaneError::Unauthorized { .. } => ErrorKind::Fatal,
            ControlPlaneError::Api { status, .. } if *status == 429 || *status >= 500 => {
                ErrorKind::Transient
            }
            ControlPlaneError::Transport(_) | ControlPlaneError::Timeout(_) => {
                ErrorKind::Transient
            }
            ControlPlaneError::NotFound(_)
            | ControlPlaneError::PermissionDenied(_)
            | ControlPlaneError::Api { .. }
            | ControlPlaneError::Decode(_) => ErrorKind::Permanent,
        }
    }

    /// Only credential problems stop the reaper.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

impl From<NameError> for ControlPlaneError {
    fn from(err: NameError) -> Self {
        ControlPlaneError::Decode(err.to_string())
    }
}

/// SweepError は sweep（およびループ）を中断させるエラー
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("fatal control plane error while {during}: {source}")]
    Fatal {
        during: &'static str,
        #[source]
        source: ControlPlaneError,
    },

    #[error("reaper task ended abnormally: {0}")]
    TaskFailed(String),
}
