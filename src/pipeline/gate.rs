//! Per-file debounce and single-flight scheduling for analyses

use super::{AnalysisOutcome, AnalysisRequest, ErrorDetector, PipelineError, PipelineState, Trigger};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// A finished analysis as delivered to the host
#[derive(Debug, Clone)]
pub struct SettledAnalysis {
    pub run_id: Uuid,
    pub file_path: String,
    pub trigger: Trigger,
    pub outcome: AnalysisOutcome,
    pub completed_at: DateTime<Utc>,
}

struct GateEvent {
    trigger: Trigger,
    request: AnalysisRequest,
}

/// Host-side handle for feeding events into a running gate
#[derive(Clone)]
pub struct GateHandle {
    events: mpsc::UnboundedSender<GateEvent>,
    state: watch::Receiver<PipelineState>,
}

impl GateHandle {
    pub fn submit(&self, trigger: Trigger, request: AnalysisRequest) -> anyhow::Result<()> {
        self.events
            .send(GateEvent { trigger, request })
            .map_err(|_| anyhow::anyhow!("analysis gate has shut down"))
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }
}

#[derive(Default)]
struct Slot {
    /// Latest request not yet started; older ones are superseded
    pending: Option<GateEvent>,
    /// Quiet-period expiry; `None` with a pending request means ready to run
    deadline: Option<Instant>,
    in_flight: bool,
}

/// What the gate knows about a spawned analysis, so a task that ends without
/// returning can still be settled for its file
struct RunningTask {
    run_id: Uuid,
    file_path: String,
    trigger: Trigger,
}

impl Slot {
    fn ready(&self) -> bool {
        self.pending.is_some() && self.deadline.is_none() && !self.in_flight
    }

    fn is_idle(&self) -> bool {
        self.pending.is_none() && !self.in_flight
    }
}

/// Start the gate on the current runtime.
///
/// Code-change triggers restart a quiet-period timer for their file; manual
/// and save triggers start at once. At most one analysis per file runs at a
/// time. The gate stops once every handle is dropped and all queued work has
/// been delivered.
pub fn spawn_gate(
    detector: ErrorDetector,
    quiet_period: Duration,
) -> (GateHandle, mpsc::UnboundedReceiver<SettledAnalysis>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(PipelineState::Idle);

    let gate = Gate {
        detector,
        quiet_period,
        slots: HashMap::new(),
        tasks: JoinSet::new(),
        running: HashMap::new(),
        state: state_tx,
        outcomes: outcome_tx,
    };
    tokio::spawn(gate.run(event_rx));

    (
        GateHandle {
            events: event_tx,
            state: state_rx,
        },
        outcome_rx,
    )
}

struct Gate {
    detector: ErrorDetector,
    quiet_period: Duration,
    slots: HashMap<String, Slot>,
    tasks: JoinSet<SettledAnalysis>,
    running: HashMap<task::Id, RunningTask>,
    state: watch::Sender<PipelineState>,
    outcomes: mpsc::UnboundedSender<SettledAnalysis>,
}

impl Gate {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<GateEvent>) {
        let mut closed = false;

        loop {
            if closed && self.tasks.is_empty() && self.slots.values().all(Slot::is_idle) {
                break;
            }

            let next_deadline = self.slots.values().filter_map(|slot| slot.deadline).min();
            let timer = async move {
                match next_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                event = events.recv(), if !closed => match event {
                    Some(event) => self.accept(event),
                    None => closed = true,
                },
                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => match joined {
                    Ok((id, settled)) => {
                        self.running.remove(&id);
                        self.settle(settled);
                    }
                    Err(err) => self.settle_lost(err),
                },
                _ = timer => self.expire_timers(),
            }
        }
        debug!("analysis gate stopped");
    }

    fn accept(&mut self, event: GateEvent) {
        let file = event.request.file_path.clone();
        let slot = self.slots.entry(file.clone()).or_default();
        slot.deadline = if event.trigger.is_debounced() {
            Some(Instant::now() + self.quiet_period)
        } else {
            None
        };
        debug!(file = %file, trigger = ?event.trigger, in_flight = slot.in_flight, "trigger received");
        slot.pending = Some(event);

        if slot.ready() {
            self.launch(&file);
        }
        self.publish_state();
    }

    fn expire_timers(&mut self) {
        let now = Instant::now();
        let mut due = Vec::new();
        for (file, slot) in self.slots.iter_mut() {
            if slot.deadline.is_some_and(|deadline| deadline <= now) {
                slot.deadline = None;
                if slot.ready() {
                    due.push(file.clone());
                }
            }
        }
        for file in due {
            self.launch(&file);
        }
        self.publish_state();
    }

    fn settle(&mut self, settled: SettledAnalysis) {
        let file = settled.file_path.clone();
        if let Some(slot) = self.slots.get_mut(&file) {
            slot.in_flight = false;
        }
        if self.outcomes.send(settled).is_err() {
            debug!(file = %file, "outcome receiver dropped");
        }

        let ready = self.slots.get(&file).is_some_and(Slot::ready);
        if ready {
            self.launch(&file);
        } else if self.slots.get(&file).is_some_and(Slot::is_idle) {
            self.slots.remove(&file);
        }

        if self.slots.is_empty() {
            self.state.send_replace(PipelineState::Settled);
        } else {
            self.publish_state();
        }
    }

    /// Settle a task that was cancelled or panicked outside the analysis
    fn settle_lost(&mut self, err: JoinError) {
        let Some(lost) = self.running.remove(&err.id()) else {
            warn!(error = %err, "untracked analysis task ended without an outcome");
            return;
        };
        warn!(file = %lost.file_path, error = %err, "analysis task ended without an outcome");
        let detail = if err.is_cancelled() {
            "analysis task was cancelled".to_string()
        } else {
            err.to_string()
        };
        self.settle(SettledAnalysis {
            run_id: lost.run_id,
            file_path: lost.file_path,
            trigger: lost.trigger,
            outcome: AnalysisOutcome::Failed(PipelineError::Crashed(detail)),
            completed_at: Utc::now(),
        });
    }

    fn launch(&mut self, file: &str) {
        let Some(slot) = self.slots.get_mut(file) else {
            return;
        };
        let Some(GateEvent { trigger, request }) = slot.pending.take() else {
            return;
        };
        slot.in_flight = true;

        let detector = self.detector.clone();
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id, file = %request.file_path, ?trigger);
        let running = RunningTask {
            run_id,
            file_path: request.file_path.clone(),
            trigger,
        };
        let handle = self.tasks.spawn(
            async move {
                let outcome = match AssertUnwindSafe(detector.analyze(&request))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "unknown panic payload".to_string()
                        };
                        warn!(detail = %detail, "analysis panicked");
                        AnalysisOutcome::Failed(PipelineError::Crashed(detail))
                    }
                };
                SettledAnalysis {
                    run_id,
                    file_path: request.file_path,
                    trigger,
                    outcome,
                    completed_at: Utc::now(),
                }
            }
            .instrument(span),
        );
        self.running.insert(handle.id(), running);
    }

    fn publish_state(&self) {
        let state = if self.slots.values().any(|slot| slot.in_flight) {
            PipelineState::Analyzing
        } else if self.slots.values().any(|slot| slot.pending.is_some()) {
            PipelineState::Gathering
        } else {
            return;
        };
        self.state.send_replace(state);
    }
}
