pub mod configuration;
pub mod error_handling;
pub mod recording;
pub mod storage;
pub mod web_interface;
