pub mod builder;
pub mod messenger;
pub mod outcome;
pub mod resolver;
pub mod submitter;

pub use crate::domain::model::{GroupPreview, SendRequest};
pub use crate::domain::ports::{
    Dispatcher, ExceptionLog, GroupDirectory, OriginNumberProvider, SendRequestStore, SmsTransport,
};
pub use crate::utils::error::Result;
