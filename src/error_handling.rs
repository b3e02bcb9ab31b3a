//! Error types of every subsystem, with `From` conversions toward
//! [`types::ControllerError`].

pub mod types;
