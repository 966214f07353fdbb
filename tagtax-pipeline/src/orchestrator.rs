//! Pipeline orchestrator
//!
//! Runs a contiguous range of numbered stages strictly in order, each as
//! its own process. The first stage that exits non-zero ends the run with
//! that same exit status; outputs of the stages before it stay on disk.

use crate::stages::Stage;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid stage range {from}..{to}: expected 1 <= from <= to <= {last}")]
    InvalidRange { from: i64, to: i64, last: u8 },

    #[error("Failed to launch stage {stage}: {source}")]
    Launch {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

/// Inclusive range of stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRange {
    from: u8,
    to: u8,
}

impl StageRange {
    /// Validate a range; omitted bounds default to the full pipeline
    ///
    /// Any integer is accepted as input; out-of-range and negative bounds
    /// are reported as [`OrchestratorError::InvalidRange`].
    pub fn new(from: Option<i64>, to: Option<i64>) -> Result<Self, OrchestratorError> {
        let from = from.unwrap_or(1);
        let to = to.unwrap_or(i64::from(Stage::LAST));
        let invalid = || OrchestratorError::InvalidRange {
            from,
            to,
            last: Stage::LAST,
        };
        if from < 1 || from > to || to > i64::from(Stage::LAST) {
            return Err(invalid());
        }
        Ok(Self {
            from: u8::try_from(from).map_err(|_| invalid())?,
            to: u8::try_from(to).map_err(|_| invalid())?,
        })
    }

    pub fn full() -> Self {
        Self {
            from: 1,
            to: Stage::LAST,
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        (self.from..=self.to).filter_map(Stage::from_number).collect()
    }
}

/// Runs one stage to completion and reports its exit status
#[async_trait]
pub trait StageLauncher: Send + Sync {
    async fn launch(&self, stage: Stage) -> std::io::Result<i32>;
}

/// Launches stages as subcommands of a pipeline executable
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    program: PathBuf,
    root_folder: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl SubprocessLauncher {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            root_folder: None,
            config: None,
        }
    }

    /// Re-invoke the running executable
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_root_folder(mut self, root_folder: Option<PathBuf>) -> Self {
        self.root_folder = root_folder;
        self
    }

    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    fn args(&self, stage: Stage) -> Vec<std::ffi::OsString> {
        let mut args = Vec::new();
        if let Some(root) = &self.root_folder {
            args.push("--root-folder".into());
            args.push(root.clone().into_os_string());
        }
        if let Some(config) = &self.config {
            args.push("--config".into());
            args.push(config.clone().into_os_string());
        }
        args.push(stage.name().into());
        args
    }
}

#[async_trait]
impl StageLauncher for SubprocessLauncher {
    async fn launch(&self, stage: Stage) -> std::io::Result<i32> {
        let status = Command::new(&self.program)
            .args(self.args(stage))
            .kill_on_drop(true)
            .status()
            .await?;
        // Terminated by a signal: no code, report a generic failure
        Ok(status.code().unwrap_or(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { stages_run: usize },
    Failed { stage: Stage, exit_code: i32 },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed { .. } => 0,
            RunOutcome::Failed { exit_code, .. } => *exit_code,
        }
    }
}

pub struct PipelineOrchestrator<L> {
    launcher: L,
}

impl<L: StageLauncher> PipelineOrchestrator<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    pub async fn run(&self, range: StageRange) -> Result<RunOutcome, OrchestratorError> {
        let stages = range.stages();
        info!("Running {} stages ({} to {})", stages.len(), range.from, range.to);

        for (index, stage) in stages.iter().enumerate() {
            info!("Launching stage {} ({} of {})", stage, index + 1, stages.len());
            let exit_code = self
                .launcher
                .launch(*stage)
                .await
                .map_err(|source| OrchestratorError::Launch {
                    stage: *stage,
                    source,
                })?;

            if exit_code != 0 {
                error!("Stage {} failed with exit code {}; stopping", stage, exit_code);
                return Ok(RunOutcome::Failed {
                    stage: *stage,
                    exit_code,
                });
            }
            info!("Stage {} finished", stage);
        }

        info!("Pipeline run complete");
        Ok(RunOutcome::Completed {
            stages_run: stages.len(),
        })
    }
}
