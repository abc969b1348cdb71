//! Background resource monitor.
//!
//! [`ResourceMonitor`] samples this process's resident memory and CPU usage
//! on a fixed interval from a dedicated thread and keeps the peaks, which
//! `main` logs once the run finishes. It is diagnostics only; nothing reads
//! the values while the run is in progress.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sysinfo::System;
use tracing::{debug, warn};

/// Default sampling period.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Peak usage observed over the monitor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    pub peak_memory_bytes: u64,
    pub peak_cpu_percent: f32,
    pub samples: u64,
}

impl ResourceUsage {
    /// Fold one sample into the running maxima.
    pub fn record(&mut self, memory_bytes: u64, cpu_percent: f32) {
        self.peak_memory_bytes = self.peak_memory_bytes.max(memory_bytes);
        self.peak_cpu_percent = self.peak_cpu_percent.max(cpu_percent);
        self.samples += 1;
    }

    pub fn peak_memory_mib(&self) -> f64 {
        self.peak_memory_bytes as f64 / (1u64 << 20) as f64
    }
}

impl fmt::Display for ResourceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Peak RAM usage: {:.2} MB, Peak CPU usage: {:.2}%",
            self.peak_memory_mib(),
            self.peak_cpu_percent
        )
    }
}

/// Handle to the sampling thread.
#[derive(Debug)]
pub struct ResourceMonitor {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<ResourceUsage>>,
}

impl ResourceMonitor {
    /// Spawn the sampling thread.
    ///
    /// If the thread cannot be spawned the monitor still works but reports
    /// no samples.
    pub fn start(interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("resource-monitor".to_string())
            .spawn(move || sample_until_stopped(&flag, interval));

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "Failed to spawn resource monitor thread");
                None
            }
        };
        Self { running, handle }
    }

    /// Stop sampling and return the peaks.
    pub fn stop(mut self) -> ResourceUsage {
        self.running.store(false, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!("Resource monitor thread panicked");
                ResourceUsage::default()
            }),
            None => ResourceUsage::default(),
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

fn sample_until_stopped(running: &AtomicBool, interval: Duration) -> ResourceUsage {
    let mut usage = ResourceUsage::default();
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            warn!(error = %e, "Cannot determine current pid; resource monitor idle");
            return usage;
        }
    };

    let mut system = System::new();
    while running.load(Ordering::Relaxed) {
        if system.refresh_process(pid) {
            if let Some(process) = system.process(pid) {
                usage.record(process.memory(), process.cpu_usage());
            }
        }
        thread::sleep(interval);
    }
    debug!(samples = usage.samples, "Resource monitor stopped");
    usage
}
