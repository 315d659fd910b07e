pub mod mac;
pub mod segment;
