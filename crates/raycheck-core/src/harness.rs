//! Harness orchestration: config validation, cache check, per-scene loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::compare::{self, CompareError, Verdict};
use crate::layout::{self, OutputLayout};
use crate::runner::{self, RenderPolicy, RunnerError};
use crate::scene::{self, SceneFile};
use crate::signature::{self, FsSignatureStore, SignatureError};

/// Harness configuration, filled in from the CLI.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Candidate renderer under test.
    pub candidate_exe: PathBuf,

    /// Trusted reference renderer.
    pub reference_exe: PathBuf,

    /// Directory holding `.ray` scene files.
    pub scene_root: PathBuf,

    /// Output root for renders, the reference cache, and captured stdio.
    pub out_root: PathBuf,

    /// Wall-clock limit per candidate render.
    pub time_limit: Duration,

    /// Maximum allowed root-mean-square error.
    pub max_rms: f64,
}

/// Fatal harness errors. Scene-scoped failures never surface here; they are
/// recorded per scene and the run continues.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-scene result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Pass { rms: f64 },
    Warning { rms: f64 },
    Error { message: String },
}

/// One graded scene.
#[derive(Debug, Clone, Serialize)]
pub struct SceneReport {
    /// Scene path relative to the scene root, extension stripped.
    pub scene: String,

    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregate result of one harness run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-scene reports in processing order.
    pub reports: Vec<SceneReport>,

    /// Whether the reference cache was wiped this run.
    pub cache_invalidated: bool,
}

impl RunSummary {
    /// Number of scenes that passed.
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Pass { .. }))
    }

    /// Number of scenes over the RMS threshold.
    pub fn warned(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Warning { .. }))
    }

    /// Number of scenes that failed to render or decode.
    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Error { .. }))
    }

    /// Largest RMS value among the graded scenes.
    pub fn worst_rms(&self) -> Option<f64> {
        self.reports
            .iter()
            .filter_map(|report| match report.outcome {
                Outcome::Pass { rms } | Outcome::Warning { rms } => Some(rms),
                Outcome::Error { .. } => None,
            })
            .fold(None, |worst, rms| match worst {
                Some(w) if w >= rms => Some(w),
                _ => Some(rms),
            })
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Scene-scoped failure; converted to [`Outcome::Error`] by the loop.
#[derive(Debug, Error)]
enum SceneError {
    #[error(transparent)]
    Render(#[from] RunnerError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Harness orchestrator. Sequential: one scene rendered and compared at a
/// time, reference before candidate.
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Run the full harness and collect a [`RunSummary`].
    pub async fn run(&self) -> Result<RunSummary, HarnessError> {
        self.run_with(|_| {}).await
    }

    /// Run the full harness, invoking `observer` with each scene report as it
    /// is produced so callers can print progressively.
    ///
    /// Fatal configuration and signature errors abort before any scene runs;
    /// render timeouts and decode failures are scoped to their scene.
    pub async fn run_with<F>(&self, mut observer: F) -> Result<RunSummary, HarnessError>
    where
        F: FnMut(&SceneReport),
    {
        self.validate()?;

        let refcache = layout::refcache_dir(&self.config.out_root);
        fs::create_dir_all(&refcache)?;
        let store = FsSignatureStore::new(&refcache);
        let cache_invalidated =
            signature::validate_reference(&refcache, &self.config.reference_exe, &store)?;

        info!(
            scenes = %self.config.scene_root.display(),
            out = %self.config.out_root.display(),
            cache_invalidated,
            "starting harness run"
        );

        let mut summary = RunSummary {
            reports: Vec::new(),
            cache_invalidated,
        };

        for scene in scene::discover(&self.config.scene_root) {
            let report = self.check_scene(&scene).await;
            observer(&report);
            summary.reports.push(report);
        }

        info!(
            scenes = summary.reports.len(),
            passed = summary.passed(),
            warned = summary.warned(),
            errored = summary.errored(),
            "harness run finished"
        );

        Ok(summary)
    }

    /// Grade one scene. Never fails; failures become an error outcome.
    async fn check_scene(&self, scene: &SceneFile) -> SceneReport {
        let relbase = scene.relbase();
        let name = relbase.to_string_lossy().into_owned();

        let outcome = match self.render_and_compare(scene, &relbase).await {
            Ok(rms) => match compare::classify(rms, self.config.max_rms) {
                Verdict::Pass => Outcome::Pass { rms },
                Verdict::Warning => Outcome::Warning { rms },
            },
            Err(e) => {
                warn!(scene = %name, error = %e, "scene check failed");
                Outcome::Error {
                    message: e.to_string(),
                }
            }
        };

        SceneReport {
            scene: name,
            outcome,
        }
    }

    async fn render_and_compare(
        &self,
        scene: &SceneFile,
        relbase: &Path,
    ) -> Result<f64, SceneError> {
        let paths = OutputLayout::for_scene(&self.config.out_root, relbase);
        paths.ensure_parent_dirs()?;

        if !paths.reference_image.exists() {
            runner::render(
                &self.config.reference_exe,
                &scene.path,
                &paths.reference_image,
                &RenderPolicy::reference(),
            )
            .await?;
        }

        let candidate_policy = RenderPolicy::candidate(
            self.config.time_limit,
            paths.stdout_capture.clone(),
            paths.stderr_capture.clone(),
        );
        runner::render(
            &self.config.candidate_exe,
            &scene.path,
            &paths.candidate_image,
            &candidate_policy,
        )
        .await?;

        Ok(compare::compare(
            &paths.candidate_image,
            &paths.reference_image,
        )?)
    }

    /// Check that every configured path exists with the expected kind. The
    /// output root is created if absent; nothing else is touched on failure.
    fn validate(&self) -> Result<(), HarnessError> {
        fs::create_dir_all(&self.config.out_root)?;
        require_dir(&self.config.scene_root)?;
        require_dir(&self.config.out_root)?;
        require_file(&self.config.candidate_exe)?;
        require_file(&self.config.reference_exe)?;
        Ok(())
    }
}

fn require_dir(path: &Path) -> Result<(), HarnessError> {
    if !path.exists() {
        return Err(HarnessError::Config(format!(
            "{} does not exist",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(HarnessError::Config(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(())
}

fn require_file(path: &Path) -> Result<(), HarnessError> {
    if !path.exists() {
        return Err(HarnessError::Config(format!(
            "{} does not exist",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(HarnessError::Config(format!(
            "{} is not a file",
            path.display()
        )));
    }
    Ok(())
}
