#[macro_use]
extern crate log;

pub mod agent;
pub mod backend;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod protocols;
pub mod storage;
pub mod transport;

mod dispatcher;

pub use agent::*;
pub use dispatcher::Dispatcher;
pub use error::*;
