#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod errors;
pub mod http_client;
