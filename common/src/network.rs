pub mod host;
pub mod interface;
pub mod mac;
pub mod ports;
pub mod range;
