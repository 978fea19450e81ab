//! Core-pinned task spawning.
//!
//! The race loop owns the timing engine and its 100-race history, which
//! is far larger than the default main-task stack.  It therefore runs in
//! its own FreeRTOS task with an explicit stack, pinned to the APP core
//! so it never shares a CPU with the IDF system tasks.
//!
//! ESP-IDF implements `std::thread` via pthreads.  `esp_pthread_set_cfg()`
//! sets thread-local configuration for the *next* `pthread_create()` from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation.

use crate::error::{Error, Result};

/// CPU cores of the dual-core Xtensa parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): IDF system tasks.
    Pro = 0,
    /// Core 1 (APP_CPU): race loop.
    App = 1,
}

/// Spawn a task pinned to `core` with explicit priority and stack.
///
/// `name` must be nul-terminated (e.g. `"race\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    use esp_idf_svc::sys;

    // SAFETY: the config struct is fully initialised by the IDF default
    // constructor and `name` is a 'static nul-terminated string.
    unsafe {
        let mut cfg = sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr().cast();
        if sys::esp_pthread_set_cfg(&cfg) != sys::ESP_OK as i32 {
            return Err(Error::Init("esp_pthread_set_cfg failed"));
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .map_err(|_| Error::Init("task creation failed"))
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("task creation failed"))
}
