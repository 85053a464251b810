pub mod heartbeat;
pub mod imports;
pub mod risk;
