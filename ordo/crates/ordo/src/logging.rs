//! Raw Layer Logging and Tracing
//!
//! Structured event log for the operations worth auditing in a raw-memory
//! layer: buffer lifecycle, refused allocations, capability decisions and
//! layout registration. Per-access operations (loads, stores, CAS) are never
//! logged.
//!
//! Every recorded event is also forwarded to the `log` facade, so an
//! application that installs a `log` backend sees the same stream without
//! configuring anything here.
//!
//! Log Levels:
//! - WARN: Refused allocations, denied capabilities
//! - INFO: Granted capabilities, registered layouts
//! - DEBUG: Buffer allocate/resize/free

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for raw-layer events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    fn as_log(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Raw-layer event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawEvent {
    /// Buffer allocated
    BufferAllocated { address: usize, bytes: usize },

    /// Buffer resized, possibly moved
    BufferResized {
        old_address: usize,
        new_address: usize,
        bytes: usize,
    },

    /// Buffer released
    BufferFreed { address: usize },

    /// Allocation refused by the system or the configured ceiling
    AllocationFailure { requested: usize, reason: String },

    /// Capability handed to a trusted caller
    CapabilityGranted { caller: String, domain: String },

    /// Capability refused
    CapabilityDenied { caller: String, domain: String },

    /// Type layout registered with the offset resolver
    LayoutRegistered {
        type_name: String,
        fields: usize,
        size: usize,
    },
}

impl RawEvent {
    /// Level this event is recorded at
    pub fn level(&self) -> LogLevel {
        match self {
            RawEvent::AllocationFailure { .. } | RawEvent::CapabilityDenied { .. } => {
                LogLevel::Warn
            },
            RawEvent::CapabilityGranted { .. } | RawEvent::LayoutRegistered { .. } => {
                LogLevel::Info
            },
            RawEvent::BufferAllocated { .. }
            | RawEvent::BufferResized { .. }
            | RawEvent::BufferFreed { .. } => LogLevel::Debug,
        }
    }
}

impl std::fmt::Display for RawEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawEvent::BufferAllocated { address, bytes } => {
                write!(f, "[ordo] allocated {} bytes at {:#x}", bytes, address)
            },
            RawEvent::BufferResized {
                old_address,
                new_address,
                bytes,
            } => write!(
                f,
                "[ordo] resized {:#x} -> {:#x} ({} bytes)",
                old_address, new_address, bytes
            ),
            RawEvent::BufferFreed { address } => write!(f, "[ordo] freed {:#x}", address),
            RawEvent::AllocationFailure { requested, reason } => write!(
                f,
                "[ordo] allocation of {} bytes refused: {}",
                requested, reason
            ),
            RawEvent::CapabilityGranted { caller, domain } => {
                write!(f, "[ordo] capability granted to {} ({})", caller, domain)
            },
            RawEvent::CapabilityDenied { caller, domain } => {
                write!(f, "[ordo] capability denied to {} ({})", caller, domain)
            },
            RawEvent::LayoutRegistered {
                type_name,
                fields,
                size,
            } => write!(
                f,
                "[ordo] layout {} registered ({} fields, {} bytes)",
                type_name, fields, size
            ),
        }
    }
}

/// Event logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format for console output
    pub json: bool,

    /// Enable timestamps for console output
    pub timestamps: bool,

    /// Number of events kept in memory; oldest are dropped first
    pub capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: false,
            json: false,
            timestamps: true,
            capacity: 1024,
        }
    }
}

/// Event logger - centralized structured logging for raw-layer events
pub struct EventLogger {
    config: LoggerConfig,
    events: Mutex<VecDeque<(Instant, RawEvent)>>,
    enabled: AtomicBool,
}

impl EventLogger {
    /// Create new event logger
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record an event
    pub fn log(&self, event: RawEvent) {
        if !self.is_enabled() {
            return;
        }

        let level = event.level();
        if level > self.config.level {
            return;
        }

        log::log!(target: "ordo", level.as_log(), "{}", event);

        if self.config.console {
            self.output_console(&event);
        }

        if self.config.capacity == 0 {
            return;
        }

        let mut events = self.events.lock();
        if events.len() == self.config.capacity {
            events.pop_front();
        }
        events.push_back((Instant::now(), event));
    }

    fn output_console(&self, event: &RawEvent) {
        if self.config.timestamps {
            let now = chrono::Local::now();
            print!("[{}] ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        }

        if self.config.json {
            if let Ok(json) = serde_json::to_string(event) {
                println!("{}", json);
            }
        } else {
            println!("{}", event);
        }
    }

    /// Get all recorded events, oldest first
    pub fn get_events(&self) -> Vec<(Instant, RawEvent)> {
        self.events.lock().iter().cloned().collect()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<EventLogger> = Mutex::new(EventLogger::default());
}

/// Log an event to the global logger
pub fn log_event(event: RawEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Replace the global logger's configuration
pub fn configure_logger(config: LoggerConfig) {
    *GLOBAL_LOGGER.lock() = EventLogger::new(config);
}

/// Snapshot of the global logger's history
pub fn recorded_events() -> Vec<RawEvent> {
    GLOBAL_LOGGER
        .lock()
        .get_events()
        .into_iter()
        .map(|(_, e)| e)
        .collect()
}
