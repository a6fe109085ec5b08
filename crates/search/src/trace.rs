use crate::error::{Result, SearchError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    /// Completed, but with a fallback or an empty placeholder.
    Degraded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub name: String,
    pub component: String,
    pub operation: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<String>,
}

/// Per-request list of externally observable steps. Cloning shares the list.
#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace {
    steps: Arc<Mutex<Vec<TraceStep>>>,
}

impl ExecutionTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, step: TraceStep) {
        let mut steps = self.steps.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        steps.push(step);
    }

    pub fn record_step(
        &self,
        name: &str,
        component: &str,
        operation: &str,
        status: StepStatus,
        duration_ms: u64,
    ) {
        self.record(TraceStep {
            name: name.to_string(),
            component: component.to_string(),
            operation: operation.to_string(),
            status,
            duration_ms,
            input_summary: None,
            output_summary: None,
        });
    }

    #[must_use]
    pub fn steps(&self) -> Vec<TraceStep> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Timer for one step; recording is a no-op without a trace.
pub(crate) struct StepTimer<'a> {
    trace: Option<&'a ExecutionTrace>,
    name: &'static str,
    component: &'static str,
    operation: &'static str,
    input_summary: Option<String>,
    started: Instant,
}

impl<'a> StepTimer<'a> {
    pub(crate) fn start(
        trace: Option<&'a ExecutionTrace>,
        name: &'static str,
        component: &'static str,
        operation: &'static str,
    ) -> Self {
        Self {
            trace,
            name,
            component,
            operation,
            input_summary: None,
            started: Instant::now(),
        }
    }

    pub(crate) fn with_input(mut self, summary: impl Into<String>) -> Self {
        if self.trace.is_some() {
            self.input_summary = Some(summary.into());
        }
        self
    }

    pub(crate) fn finish(self, status: StepStatus, output_summary: Option<String>) {
        let Some(trace) = self.trace else {
            return;
        };
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        trace.record(TraceStep {
            name: self.name.to_string(),
            component: self.component.to_string(),
            operation: self.operation.to_string(),
            status,
            duration_ms,
            input_summary: self.input_summary,
            output_summary,
        });
    }
}

/// Cooperative cancellation shared between a caller and a running request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Request-scoped context threaded through every retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    trace: Option<ExecutionTrace>,
    cancel: CancelFlag,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn traced() -> Self {
        Self {
            trace: Some(ExecutionTrace::new()),
            cancel: CancelFlag::new(),
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: ExecutionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn trace(&self) -> Option<&ExecutionTrace> {
        self.trace.as_ref()
    }

    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(SearchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
