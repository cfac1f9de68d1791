pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::dispatch::{ChannelDispatcher, DeliveryWorker, HttpDispatcher, LoggingTransport};
pub use adapters::exception_log::FileExceptionLog;
pub use adapters::file_store::FileStore;
pub use adapters::memory::{DirectorySnapshot, InMemoryDirectory};
pub use config::TomlConfig;
pub use core::messenger::{GroupMessenger, SendGroupMessage};
pub use core::outcome::{SendFailure, SendOutcome};
pub use utils::error::{GroupTextError, Result};
