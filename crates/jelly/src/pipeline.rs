//! Fork/join dispatch of the integrator.
//!
//! The simulation state is moved into a job on the rayon pool and sent
//! back over a channel when the kernel finishes. While a job is pending the
//! caller holds only the [`PendingIntegration`] handle, so the buffers
//! cannot be read or mutated until [`PendingIntegration::join`] returns them.
//! There is no cancellation: a dispatched job always runs to completion.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::error::JellyError;
use crate::integrator::{self, KernelParams};
use crate::state::SimulationState;

/// A dispatched integration that has not been joined yet.
#[derive(Debug)]
pub struct PendingIntegration {
    receiver: mpsc::Receiver<Box<SimulationState>>,
    dispatched_at: Instant,
    vertex_count: usize,
}

/// The state handed back by a completed job.
#[derive(Debug)]
pub struct FinishedIntegration {
    pub state: Box<SimulationState>,
    /// Wall time from dispatch to join
    pub elapsed: Duration,
}

/// Start integrating `state` on the rayon pool.
///
/// Called from a rayon worker, the kernel runs inline on that worker
/// instead: a worker blocked in [`PendingIntegration::join`] could be the
/// only thread able to run the job it waits on.
pub fn dispatch(
    state: Box<SimulationState>,
    params: KernelParams,
    batch_size: usize,
) -> PendingIntegration {
    let (sender, receiver) = mpsc::channel();
    let vertex_count = state.vertex_count();
    let dispatched_at = Instant::now();

    if rayon::current_thread_index().is_some() {
        run_job(state, &params, batch_size, &sender);
    } else {
        rayon::spawn(move || run_job(state, &params, batch_size, &sender));
    }

    PendingIntegration {
        receiver,
        dispatched_at,
        vertex_count,
    }
}

fn run_job(
    mut state: Box<SimulationState>,
    params: &KernelParams,
    batch_size: usize,
    sender: &mpsc::Sender<Box<SimulationState>>,
) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        integrator::integrate(&mut state, params, batch_size);
    }));
    match result {
        // The receiver may already be gone if the owner was dropped
        // without joining; the state is simply freed here then.
        Ok(()) => {
            let _ = sender.send(state);
        }
        Err(_) => {
            log::error!("Integration job panicked ({} vertices)", state.vertex_count());
        }
    }
}

impl PendingIntegration {
    /// Block until the job completes and take the state back.
    pub fn join(self) -> Result<FinishedIntegration, JellyError> {
        match self.receiver.recv() {
            Ok(state) => Ok(FinishedIntegration {
                state,
                elapsed: self.dispatched_at.elapsed(),
            }),
            Err(_) => {
                log::error!(
                    "Integration job disconnected before returning {} vertices",
                    self.vertex_count
                );
                Err(JellyError::JobLost)
            }
        }
    }
}
