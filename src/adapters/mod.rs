// Adapters layer: concrete implementations of the domain ports (storage, dispatch, exception log).

pub mod dispatch;
pub mod exception_log;
pub mod file_store;
pub mod memory;
