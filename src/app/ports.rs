//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (event sinks, storage, clocks, telemetry sinks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  The serial link has its own port,
//! [`Transport`](crate::protocol::Transport).
//!
//! All port errors are typed; callers handle every variant explicitly.

use crate::config::HeaterConfig;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / host layer)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, the
/// host's entity layer, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Telemetry sink port (driven adapter: domain → host entities)
// ───────────────────────────────────────────────────────────────

/// Receives individual telemetry values routed by
/// [`TelemetryRoutes`](super::routes::TelemetryRoutes).
pub trait TelemetrySink {
    fn publish(&mut self, sink: super::routes::SinkId, value: super::routes::FieldValue);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer / RTC → domain)
// ───────────────────────────────────────────────────────────────

/// Time sources used by the control loop.
pub trait ClockPort {
    /// Milliseconds since boot.  Never goes backwards.
    fn monotonic_ms(&self) -> u64;

    /// Local calendar day number (days since the epoch), or `None` when no
    /// wall clock is synchronised.
    fn local_day(&self) -> Option<u32>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the heater configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`HeaterConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<HeaterConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &HeaterConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (fuel counters and other blobs).
///
/// Keys are namespaced to prevent collisions between subsystems.  Writes
/// MUST be atomic: no partial writes on power loss.  The ESP-IDF NVS API
/// guarantees this natively; the in-memory simulation trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the main loop)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a periodic task is due.
///
/// The [`Scheduler`](crate::scheduler::Scheduler) knows nothing about the
/// service; the main loop implements this and runs the matching
/// [`AppService`](super::service::AppService) operation.
pub trait SchedulerDelegate {
    /// * `label` — the human-readable label of the schedule that fired.
    /// * `task`  — which part of the cycle is due.
    fn on_schedule_fired(&mut self, label: &str, task: PollTask);
}

/// Work items driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTask {
    /// Safety, fuel, controller, mode machine, command frame.
    Control,
    /// Telemetry event and fuel counter persistence.
    Publish,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored blob failed to decode.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("config not found"),
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}
