pub mod dedup;
pub mod map;
pub mod risk;
