#[macro_use]
extern crate log;

pub mod errors;
pub mod in_memory_network;
pub mod logger;
pub mod mock_backend;
