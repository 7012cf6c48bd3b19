pub mod buffer;
pub mod config;
pub mod export;
pub mod manager;

pub use buffer::Buffer;
pub use config::EngineConfig;
pub use export::BufferExport;
pub use manager::{BufferManager, BufferStats};
