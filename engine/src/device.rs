// SPDX-License-Identifier: AGPL-3.0-only

//! Device interfaces: execution resources bound to one catalog device.
//!
//! An interface owns everything a task needs on its device: the open wgpu
//! device (GPUs), a rayon pool, the block allocator and the dispatch worker.
//! It copies its descriptor out of the catalog and never borrows from it,
//! so the catalog can be dropped right after binding. Clones share the same
//! resources.

use crate::allocator::BlockAllocator;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gpu::GpuDevice;
use crate::precision::Precision;
use crate::task::configurator::{TaskConfiguration, TaskConfigurator};
use crate::task::handle::{TaskHandle, TaskRecord};
use crate::task::scheduler::{spawn_worker, ExecutionContext, Job};
use epseon_forge::dispatch::{profiles, route};
use epseon_forge::format::adaptive_size_u64;
use epseon_forge::substrate::Route;
use epseon_forge::{CatalogError, DeviceCatalog, DeviceDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tracing::info;

#[derive(Debug)]
struct Inner {
    descriptor: DeviceDescriptor,
    allocator: Arc<BlockAllocator>,
    context: Arc<ExecutionContext>,
    queue: mpsc::Sender<Job>,
    next_task: AtomicU64,
}

/// Execution resources bound to one device.
#[derive(Debug, Clone)]
pub struct DeviceInterface {
    inner: Arc<Inner>,
}

impl DeviceInterface {
    /// Bind to the device with `device_id`, default host pool size.
    ///
    /// # Errors
    ///
    /// [`CatalogError::DeviceNotFound`] for an unknown id, otherwise as
    /// [`Self::bind_with`].
    pub fn bind(catalog: &DeviceCatalog, device_id: u32) -> Result<Self, EngineError> {
        Self::bind_with(catalog, device_id, &EngineConfig::default())
    }

    /// Bind with explicit engine settings.
    ///
    /// # Errors
    ///
    /// [`EngineError::DeviceCreation`] if the wgpu device cannot be opened,
    /// [`EngineError::Scheduler`] if the pool or worker cannot start.
    pub fn bind_with(
        catalog: &DeviceCatalog,
        device_id: u32,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let descriptor = catalog.find(device_id)?.clone();
        let (gpu, threads) = match &descriptor.route {
            Route::Adapter { index, .. } => (
                Some(Arc::new(GpuDevice::open_blocking(
                    catalog.wgpu_backends(),
                    *index,
                )?)),
                config.host_threads,
            ),
            Route::Host { threads } => {
                let n = if config.host_threads == 0 {
                    *threads
                } else {
                    config.host_threads
                };
                (None, n)
            }
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("epseon-host-{i}"))
            .build()
            .map_err(|e| EngineError::Scheduler(format!("host pool: {e}")))?;

        let capacity = descriptor.largest_heap().unwrap_or(0);
        let context = Arc::new(ExecutionContext {
            gpu,
            pool: Arc::new(pool),
            device_name: descriptor.name.clone(),
            max_buffer_size: descriptor.limits.max_buffer_size,
        });
        let queue = spawn_worker(descriptor.id, Arc::clone(&context))?;
        info!(
            device = %descriptor.name,
            id = format_args!("{:#010x}", descriptor.id),
            kind = %descriptor.kind,
            memory = %adaptive_size_u64(capacity),
            "device bound"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                descriptor,
                allocator: BlockAllocator::new(capacity),
                context,
                queue,
                next_task: AtomicU64::new(1),
            }),
        })
    }

    /// Bind to the device capability routing picks for `precision`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NoMatchingDevice`] if no device can run it.
    pub fn bind_best(catalog: &DeviceCatalog, precision: Precision) -> Result<Self, EngineError> {
        let workload = match precision {
            Precision::Float32 => profiles::vibwa_f32(),
            Precision::Float64 => profiles::vibwa_f64(),
        };
        let decision = route(&workload, catalog.devices()).ok_or_else(|| {
            CatalogError::NoMatchingDevice(format!("no device offers {precision} compute"))
        })?;
        info!(
            device = %decision.device.name,
            reason = ?decision.reason,
            "routed {}",
            workload.name
        );
        Self::bind(catalog, decision.device.id)
    }

    /// Bind the device `EPSEON_DEVICE` (or `config.device_selector`) names.
    ///
    /// # Errors
    ///
    /// As [`DeviceCatalog::select`] and [`Self::bind_with`].
    pub fn bind_default(
        catalog: &DeviceCatalog,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let id = catalog.select(&config.device_selector)?.id;
        Self::bind_with(catalog, id, config)
    }

    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.inner.descriptor
    }

    #[must_use]
    pub fn allocator(&self) -> &Arc<BlockAllocator> {
        &self.inner.allocator
    }

    /// Whether tasks in `precision` run on the device itself rather than the
    /// host fallback.
    #[must_use]
    pub fn runs_natively(&self, precision: Precision) -> bool {
        self.inner
            .context
            .gpu
            .as_ref()
            .map_or(true, |gpu| gpu.supports(precision))
    }

    /// Fresh configurator for a precision token (`"float32"`, `"float64"`).
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPrecision`] for any other token.
    pub fn get_task_configurator(&self, precision: &str) -> Result<TaskConfigurator, EngineError> {
        Ok(TaskConfigurator::new(precision.parse()?))
    }

    /// Validate against the device, reserve memory and queue the task.
    /// Returns as soon as the task is queued.
    ///
    /// # Errors
    ///
    /// [`EngineError::IncompleteConfiguration`],
    /// [`EngineError::InvalidAlgorithmSpec`],
    /// [`EngineError::InvalidHardwareConfig`] or
    /// [`EngineError::OutOfDeviceMemory`]; [`EngineError::Scheduler`] if the
    /// worker is gone.
    pub fn submit_task(&self, configurator: &TaskConfigurator) -> Result<TaskHandle, EngineError> {
        let config = configurator.configuration()?;
        self.check_hardware(&config)?;
        let limits = &self.inner.descriptor.limits;
        let footprint = config.memory_requirements(limits)?.total();
        let reservation = self
            .inner
            .allocator
            .reserve(footprint, config.hardware.allocation_block_size)?;

        let id = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        let record = Arc::new(TaskRecord::new(
            id,
            self.inner.descriptor.name.clone(),
            config.precision,
            config.slot_count(),
        ));
        info!(
            task = id,
            device = %self.inner.descriptor.name,
            precision = %config.precision,
            slots = config.slot_count(),
            reserved = %adaptive_size_u64(reservation.bytes()),
            "task submitted"
        );
        self.inner
            .queue
            .send(Job {
                record: Arc::clone(&record),
                config,
                reservation,
            })
            .map_err(|_| EngineError::Scheduler("dispatch worker has exited".into()))?;
        Ok(TaskHandle::new(record))
    }

    fn check_hardware(&self, config: &TaskConfiguration) -> Result<(), EngineError> {
        let d = &self.inner.descriptor;
        let hw = &config.hardware;
        let max_group = d.limits.max_invocations.min(d.limits.max_work_group_size[0]);
        if hw.group_size > max_group {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "group_size {} exceeds the device limit of {max_group} invocations",
                hw.group_size
            )));
        }
        let [gx, gy, _] = d.limits.max_work_group_count;
        if u64::from(hw.dispatch_count) > u64::from(gx) * u64::from(gy) {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "dispatch_count {} exceeds the device work-group grid {gx}x{gy}",
                hw.dispatch_count
            )));
        }
        let largest = d.largest_heap().unwrap_or(0);
        if hw.allocation_block_size > largest {
            return Err(EngineError::InvalidHardwareConfig(format!(
                "allocation block of {} does not fit the largest heap ({})",
                adaptive_size_u64(hw.allocation_block_size),
                adaptive_size_u64(largest)
            )));
        }
        Ok(())
    }
}
