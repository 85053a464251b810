pub mod alerts;
pub mod audit;
pub mod couriers;
pub mod imports;
pub mod orders;
pub mod snapshots;
pub mod users;
