//! Bounded polling of sandbox status.
//!
//! A sandbox goes through three observable phases after creation: the VM
//! reaches `RUNNING`, the setup script finishes (`setup_status`), and the
//! application command comes up (`app_status`). Each wait polls the
//! Service, classifies the answer and sleeps for the poll interval until
//! the phase completes, a terminal failure is seen, the phase timeout
//! elapses or the provider is stopped.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::Sandbox;
use crate::convert::sandbox::is_transitional;
use crate::error::{ApiResultExt, ProviderError};
use crate::resources::Context;

/// Longest wait any phase accepts, in seconds.
pub const MAX_WAIT_SECS: i64 = 86_400;

/// A configured wait in seconds, clamped to `1..=MAX_WAIT_SECS`.
pub fn wait_duration(seconds: Option<i64>, default: i64) -> Duration {
    Duration::from_secs(seconds.unwrap_or(default).clamp(1, MAX_WAIT_SECS) as u64)
}

/// What one poll says about a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Poll {
    Done,
    Pending,
    Failed(String),
}

/// Wait until the sandbox leaves its transitional states.
///
/// A `STOPPED` sandbox is started when `start_if_stopped` is set and then
/// given [`ProviderOptions::start_timeout`](crate::config::ProviderOptions)
/// to reach `RUNNING`.
pub async fn wait_for_running(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    timeout: Duration,
    start_if_stopped: bool,
) -> Result<Sandbox, ProviderError> {
    let sandbox = poll_until(ctx, domain, sandbox_id, "running", timeout, |s| {
        match s.status.as_str() {
            "FAILED" => Poll::Failed(format!("status={}", s.status)),
            status if is_transitional(status) => Poll::Pending,
            _ => Poll::Done,
        }
    })
    .await?;

    match sandbox.status.as_str() {
        "RUNNING" => Ok(sandbox),
        "STOPPED" if start_if_stopped => {
            info!(sandbox = sandbox_id, "Sandbox is stopped, starting it");
            ctx.client
                .start_sandbox(domain, sandbox_id)
                .await
                .or_api_err("start sandbox")?;
            poll_until(ctx, domain, sandbox_id, "running", ctx.options.start_timeout, |s| {
                match s.status.as_str() {
                    "RUNNING" => Poll::Done,
                    "FAILED" => Poll::Failed(format!("status={}", s.status)),
                    _ => Poll::Pending,
                }
            })
            .await
        }
        _ => Ok(sandbox),
    }
}

/// Wait until the setup script has finished successfully.
pub async fn wait_for_configured(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    timeout: Duration,
) -> Result<Sandbox, ProviderError> {
    poll_until(ctx, domain, sandbox_id, "configured", timeout, |s| {
        match s.setup_status.as_str() {
            "SUCCESS" => Poll::Done,
            "FAILED" => Poll::Failed(format!("setup_status={}", s.setup_status)),
            _ => Poll::Pending,
        }
    })
    .await
}

/// Wait until the application command is running. An app that already
/// ended counts as a failure since a long-running app was requested.
pub async fn wait_for_app(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    timeout: Duration,
) -> Result<Sandbox, ProviderError> {
    poll_until(ctx, domain, sandbox_id, "app running", timeout, |s| {
        match s.app_status.as_str() {
            "RUNNING" => Poll::Done,
            "ENDED" | "FAILED" => Poll::Failed(format!("app_status={}", s.app_status)),
            _ => Poll::Pending,
        }
    })
    .await
}

/// Wait until a stop request has taken effect.
pub async fn wait_for_stopped(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    timeout: Duration,
) -> Result<Sandbox, ProviderError> {
    poll_until(ctx, domain, sandbox_id, "stopped", timeout, |s| {
        match s.status.as_str() {
            "STOPPED" => Poll::Done,
            "FAILED" => Poll::Failed(format!("status={}", s.status)),
            _ => Poll::Pending,
        }
    })
    .await
}

async fn poll_until<F>(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    phase: &'static str,
    timeout: Duration,
    classify: F,
) -> Result<Sandbox, ProviderError>
where
    F: Fn(&Sandbox) -> Poll + Send,
{
    let max_wait = Duration::from_secs(MAX_WAIT_SECS as u64);
    let start = Instant::now();
    let deadline = start
        .checked_add(timeout.min(max_wait))
        .unwrap_or(start + max_wait);
    let mut shutdown = ctx.shutdown.clone();

    loop {
        if *shutdown.borrow() {
            return Err(cancelled(sandbox_id, phase));
        }

        let sandbox = ctx
            .client
            .get_sandbox(domain, sandbox_id)
            .await
            .or_api_err("get sandbox")?;

        match classify(&sandbox) {
            Poll::Done => {
                info!(
                    sandbox = sandbox_id,
                    phase,
                    status = %sandbox.status,
                    "Sandbox phase reached"
                );
                return Ok(sandbox);
            }
            Poll::Failed(status) => {
                return Err(ProviderError::SandboxFailed {
                    sandbox: sandbox_id.to_string(),
                    phase,
                    status,
                })
            }
            Poll::Pending => {
                debug!(
                    sandbox = sandbox_id,
                    phase,
                    status = %sandbox.status,
                    setup_status = %sandbox.setup_status,
                    app_status = %sandbox.app_status,
                    "Sandbox not ready"
                );
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ProviderError::SandboxTimeout {
                sandbox: sandbox_id.to_string(),
                phase,
                waited_secs: timeout.as_secs(),
            });
        }
        let nap = ctx.options.poll_interval.min(deadline - now);

        tokio::select! {
            _ = tokio::time::sleep(nap) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Err(cancelled(sandbox_id, phase));
                }
            }
        }
    }
}

fn cancelled(sandbox_id: &str, phase: &str) -> ProviderError {
    ProviderError::Cancelled(format!(
        "provider stopped while waiting for sandbox {sandbox_id} to be {phase}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::watch;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::BuddyClient;
    use crate::config::ProviderOptions;

    fn context(server: &MockServer, shutdown: watch::Receiver<bool>) -> Context {
        Context::new(
            Arc::new(BuddyClient::with_http_client(
                &server.uri(),
                "t",
                reqwest::Client::new(),
            )),
            ProviderOptions::default()
                .with_poll_interval(Duration::from_millis(20))
                .with_start_timeout(Duration::from_secs(2)),
            shutdown,
        )
    }

    fn sandbox(status: &str, setup: &str, app: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "sb1",
            "status": status,
            "setup_status": setup,
            "app_status": app,
        })
    }

    async fn mount_once(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/workspaces/acme/sandboxes/sb1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_running_after_creating() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("CREATING", "INPROGRESS", "NONE")).await;
        mount_once(&server, sandbox("RUNNING", "INPROGRESS", "NONE")).await;

        let ctx = context(&server, rx);
        let sb = wait_for_running(&ctx, "acme", "sb1", Duration::from_secs(5), true)
            .await
            .unwrap();
        assert_eq!(sb.status, "RUNNING");
    }

    #[tokio::test]
    async fn test_failed_status_is_terminal() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("FAILED", "NONE", "NONE")).await;

        let ctx = context(&server, rx);
        let err = wait_for_running(&ctx, "acme", "sb1", Duration::from_secs(5), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::SandboxFailed { phase: "running", .. }));
    }

    #[tokio::test]
    async fn test_stopped_sandbox_is_started() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("STOPPED", "SUCCESS", "NONE")).await;
        mount_once(&server, sandbox("STARTING", "SUCCESS", "NONE")).await;
        mount_once(&server, sandbox("RUNNING", "SUCCESS", "NONE")).await;
        Mock::given(method("POST"))
            .and(path("/workspaces/acme/sandboxes/sb1/start"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sandbox("STARTING", "SUCCESS", "NONE")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server, rx);
        let sb = wait_for_running(&ctx, "acme", "sb1", Duration::from_secs(5), true)
            .await
            .unwrap();
        assert_eq!(sb.status, "RUNNING");
    }

    #[tokio::test]
    async fn test_configured_timeout() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        Mock::given(method("GET"))
            .and(path("/workspaces/acme/sandboxes/sb1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sandbox("RUNNING", "INPROGRESS", "NONE")),
            )
            .mount(&server)
            .await;

        let ctx = context(&server, rx);
        let err = wait_for_configured(&ctx, "acme", "sb1", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::SandboxTimeout { phase: "configured", .. }));
    }

    #[tokio::test]
    async fn test_app_ended_fails() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("RUNNING", "SUCCESS", "ENDED")).await;

        let ctx = context(&server, rx);
        let err = wait_for_app(&ctx, "acme", "sb1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Sandbox sb1 failed while waiting to be app running: app_status=ENDED"
        );
    }

    #[tokio::test]
    async fn test_stop_cancels_wait() {
        let server = MockServer::start().await;
        let (tx, rx) = watch::channel(false);
        Mock::given(method("GET"))
            .and(path("/workspaces/acme/sandboxes/sb1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sandbox("CREATING", "NONE", "NONE")),
            )
            .mount(&server)
            .await;

        let ctx = context(&server, rx);
        let wait = wait_for_running(&ctx, "acme", "sb1", Duration::from_secs(30), true);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(wait, stop);
        assert!(matches!(result, Err(ProviderError::Cancelled(_))));
    }

    #[test]
    fn test_wait_duration_is_clamped() {
        assert_eq!(wait_duration(None, 300), Duration::from_secs(300));
        assert_eq!(wait_duration(Some(0), 300), Duration::from_secs(1));
        assert_eq!(
            wait_duration(Some(i64::MAX), 300),
            Duration::from_secs(MAX_WAIT_SECS as u64)
        );
    }

    #[tokio::test]
    async fn test_huge_timeout_still_polls() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("RUNNING", "SUCCESS", "NONE")).await;

        let ctx = context(&server, rx);
        let sb = wait_for_configured(&ctx, "acme", "sb1", Duration::MAX).await.unwrap();
        assert_eq!(sb.setup_status, "SUCCESS");
    }

    #[tokio::test]
    async fn test_stopped_after_stopping() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(false);
        mount_once(&server, sandbox("STOPPING", "SUCCESS", "RUNNING")).await;
        mount_once(&server, sandbox("STOPPED", "SUCCESS", "NONE")).await;

        let ctx = context(&server, rx);
        let sb = wait_for_stopped(&ctx, "acme", "sb1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(sb.status, "STOPPED");
    }
}
