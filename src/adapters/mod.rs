// Adapters - External system implementations

pub mod libav;
pub mod memory;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use libav::LibavBackend;
pub use memory::MemoryBackend;
pub use toml_config::RemuxerConfig;
pub use tracing_log::{init_logging, LoggingSettings};
