//! Application wiring: builds the shared [`AppContext`] and drives the
//! connector and HTTP server through [`Controller`].

pub mod app_context;
pub mod controller_handler;
#[cfg(test)]
pub mod tests;

pub use app_context::AppContext;
pub use controller_handler::Controller;
