// SPDX-License-Identifier: AGPL-3.0-only

//! Per-interface dispatch worker.
//!
//! Each device interface spawns one named worker thread fed through an
//! mpsc channel. The worker owns `Arc`s of the execution context and of
//! every queued task record, so it keeps draining its queue after the
//! interface, the catalog and all handles are gone; it exits once the last
//! sender is dropped and the queue is empty.

use crate::allocator::Reservation;
use crate::error::EngineError;
use crate::gpu::GpuDevice;
use crate::task::configurator::TaskConfiguration;
use crate::task::execute::run_task;
use crate::task::handle::TaskRecord;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Device resources a task runs against.
#[derive(Debug)]
pub(crate) struct ExecutionContext {
    /// Open wgpu device, `None` on the host device.
    pub gpu: Option<Arc<GpuDevice>>,
    pub pool: Arc<rayon::ThreadPool>,
    pub device_name: String,
    /// Largest single allocation the device accepts, bytes.
    pub max_buffer_size: u64,
}

/// A submitted task waiting for the worker.
pub(crate) struct Job {
    pub record: Arc<TaskRecord>,
    pub config: TaskConfiguration,
    /// Device memory held until the task is terminal.
    pub reservation: Reservation,
}

/// Spawn the dispatch worker for device `device_id`.
///
/// # Errors
///
/// [`EngineError::Scheduler`] if the OS refuses the thread.
pub(crate) fn spawn_worker(
    device_id: u32,
    ctx: Arc<ExecutionContext>,
) -> Result<mpsc::Sender<Job>, EngineError> {
    let (tx, rx) = mpsc::channel::<Job>();
    std::thread::Builder::new()
        .name(format!("epseon-dispatch-{device_id:x}"))
        .spawn(move || {
            for job in rx {
                run_job(&ctx, job);
            }
            debug!(device = %ctx.device_name, "dispatch worker drained, exiting");
        })
        .map_err(|e| EngineError::Scheduler(format!("spawn dispatch worker: {e}")))?;
    Ok(tx)
}

fn run_job(ctx: &ExecutionContext, job: Job) {
    let Job {
        record,
        config,
        reservation,
    } = job;
    record.set_running();
    info!(
        task = record.id(),
        device = %ctx.device_name,
        precision = %config.precision,
        curves = config.curve_count(),
        "task started"
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_task(ctx, &config, &record)))
        .unwrap_or_else(|_| {
            Err(EngineError::Scheduler(
                "task panicked on the dispatch worker".into(),
            ))
        });

    match &outcome {
        Ok(results) => info!(
            task = record.id(),
            levels = results.level_count(),
            wall_time_ms = results.wall_time_ms,
            "task completed"
        ),
        Err(e) => warn!(task = record.id(), error = %e, "task failed"),
    }
    // blocks go back before waiters can observe the terminal state
    drop(reservation);
    record.finish(outcome);
}
