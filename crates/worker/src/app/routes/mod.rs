pub mod deliveries;
pub mod system;
