pub mod connection;
pub mod credential;
pub mod ledger;
pub mod proof;
