pub mod alert;
pub mod audit;
pub mod courier;
pub mod import;
pub mod order;
pub mod snapshot;
pub mod user;
