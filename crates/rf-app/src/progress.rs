use rf_sim::ProgressEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProject,
    CheckingCache,
    LoadingCachedResult,
    CompilingCase,
    ResumingFromCheckpoint,
    Stepping,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingProject => "Loading project",
            RunStage::CheckingCache => "Checking cache",
            RunStage::LoadingCachedResult => "Loading cached result",
            RunStage::CompilingCase => "Compiling case",
            RunStage::ResumingFromCheckpoint => "Resuming from checkpoint",
            RunStage::Stepping => "Stepping",
            RunStage::SavingResults => "Saving results",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepProgress {
    pub step: usize,
    pub total_steps: usize,
    pub control_period: u32,
    pub elapsed_days: f64,
    pub fraction_complete: f64,
    pub iterations: usize,
    pub convergence_failures: usize,
}

impl From<&ProgressEvent> for StepProgress {
    fn from(event: &ProgressEvent) -> Self {
        Self {
            step: event.step_index,
            total_steps: event.total_steps,
            control_period: event.control_period_id.get(),
            elapsed_days: event.elapsed_simulated_days,
            fraction_complete: event.fraction_complete(),
            iterations: event.iteration_count,
            convergence_failures: event.convergence_failures,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub step: Option<StepProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            step: None,
        }
    }
}
