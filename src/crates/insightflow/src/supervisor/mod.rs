//! Workflow supervision
//!
//! The [`Supervisor`] drives one request through
//! `Analyzing -> Visualizing -> Narrating -> ReviewingQa -> Done`. The first
//! failing stage ends the run in `Failed`; nothing is retried at this level.

pub mod pipeline;
pub mod state;

pub use pipeline::{
    Supervisor, SupervisorConfig, WorkflowFailure, WorkflowResult, WorkflowStatus, DEFAULT_MAX_DATASET_ROWS,
    DEFAULT_WORKFLOW_TIMEOUT, QA_WARNING,
};
pub use state::{WorkflowRun, WorkflowStage};
