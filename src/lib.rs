pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod recording;
pub mod retention;
pub mod statistics;
pub mod streaming;
pub mod web_interface;

pub use controller::{AppContext, Controller};
