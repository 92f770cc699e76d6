//! Renderer subprocess execution.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Recursion depth passed to both renderers.
pub const RECURSION_DEPTH: u32 = 5;

/// Where a render's stdout/stderr go.
#[derive(Debug, Clone)]
pub enum Capture {
    /// Redirect both streams to files, truncating existing content.
    Files { stdout: PathBuf, stderr: PathBuf },

    /// Drop both streams.
    Discard,
}

/// Explicit per-invocation policy: optional wall-clock limit and stream
/// capture. The candidate and the reference render under different policies,
/// built in one place by the orchestrator.
#[derive(Debug, Clone)]
pub struct RenderPolicy {
    pub timeout: Option<Duration>,
    pub capture: Capture,
}

impl RenderPolicy {
    /// Reference renders: no time limit, streams discarded.
    pub fn reference() -> Self {
        Self {
            timeout: None,
            capture: Capture::Discard,
        }
    }

    /// Candidate renders: enforced time limit, streams captured to files.
    pub fn candidate(timeout: Duration, stdout: PathBuf, stderr: PathBuf) -> Self {
        Self {
            timeout: Some(timeout),
            capture: Capture::Files { stdout, stderr },
        }
    }
}

/// Errors from one render invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("render timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to launch renderer {exe}: {source}")]
    Spawn {
        exe: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render one scene: `<exe> -r 5 <scene> <image>`.
///
/// Blocks until the child exits or the policy's timeout elapses. On timeout
/// the child is killed and [`RunnerError::Timeout`] is returned; any
/// partially written capture files remain on disk. The child's exit status is
/// returned as-is - a non-zero exit merely risks a missing or corrupt image,
/// which the comparison step detects.
pub async fn render(
    exe: &Path,
    scene: &Path,
    image: &Path,
    policy: &RenderPolicy,
) -> Result<ExitStatus, RunnerError> {
    let mut command = Command::new(exe);
    command
        .arg("-r")
        .arg(RECURSION_DEPTH.to_string())
        .arg(scene)
        .arg(image)
        .stdin(Stdio::null());

    match &policy.capture {
        Capture::Files { stdout, stderr } => {
            command.stdout(Stdio::from(std::fs::File::create(stdout)?));
            command.stderr(Stdio::from(std::fs::File::create(stderr)?));
        }
        Capture::Discard => {
            command.stdout(Stdio::null());
            command.stderr(Stdio::null());
        }
    }

    debug!(exe = %exe.display(), scene = %scene.display(), "spawning renderer");
    let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
        exe: exe.to_path_buf(),
        source,
    })?;

    let status = match policy.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    exe = %exe.display(),
                    scene = %scene.display(),
                    limit_secs = limit.as_secs(),
                    "render timed out, killing child"
                );
                child.kill().await.ok();
                return Err(RunnerError::Timeout(limit));
            }
        },
        None => child.wait().await?,
    };

    Ok(status)
}
