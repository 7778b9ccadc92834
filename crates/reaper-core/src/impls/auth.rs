//! TokenSource - REST 呼び出し用の bearer token
//!
//! - None: 認証なし（emulator）
//! - Static: 固定 token（外部で発行したもの）
//! - Gcloud: `gcloud auth print-access-token` の結果をキャッシュし、期限前に再取得

use std::fmt;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::ControlPlaneError;

/// Access tokens issued by gcloud live for one hour.
pub const GCLOUD_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

pub enum TokenSource {
    None,
    Static(String),
    Gcloud(GcloudToken),
}

impl TokenSource {
    pub fn gcloud() -> Self {
        TokenSource::Gcloud(GcloudToken::new(GCLOUD_TOKEN_TTL))
    }

    /// Token to send, or `None` when no `Authorization` header is needed.
    pub async fn bearer(&self) -> Result<Option<String>, ControlPlaneError> {
        match self {
            TokenSource::None => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Gcloud(gcloud) => gcloud.token().await.map(Some),
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::None => f.write_str("TokenSource::None"),
            TokenSource::Static(_) => f.write_str("TokenSource::Static(<redacted>)"),
            TokenSource::Gcloud(_) => f.write_str("TokenSource::Gcloud"),
        }
    }
}

/// Token fetched from the gcloud CLI, refreshed after `ttl`.
pub struct GcloudToken {
    ttl: Duration,
    cached: Mutex<Option<(String, Instant)>>,
}

impl GcloudToken {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: Mutex::new(None),
        }
    }

    async fn token(&self) -> Result<String, ControlPlaneError> {
        let mut cached = self.cached.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref()
            && fetched_at.elapsed() < self.ttl
        {
            return Ok(token.clone());
        }

        let token = match fetch_gcloud_token().await {
            Ok(token) => token,
            Err(err) => return Err(refresh_failed(err, cached.is_some())),
        };
        tracing::debug!("refreshed gcloud access token");
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// 一度でも token を取得できていれば、再取得の失敗は一時的なものとして扱う
fn refresh_failed(err: ControlPlaneError, had_token: bool) -> ControlPlaneError {
    if !had_token {
        return err;
    }
    tracing::warn!(error = %err, "gcloud token refresh failed; retrying on the next request");
    ControlPlaneError::Transport(format!("gcloud token refresh failed: {err}"))
}

async fn fetch_gcloud_token() -> Result<String, ControlPlaneError> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| ControlPlaneError::Unauthorized {
            status: 401,
            message: format!("failed to run gcloud: {e}"),
        })?;

    if !output.status.success() {
        return Err(ControlPlaneError::Unauthorized {
            status: 401,
            message: format!(
                "gcloud auth print-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ControlPlaneError::Unauthorized {
            status: 401,
            message: "gcloud returned an empty access token".to_string(),
        });
    }
    Ok(token)
}
