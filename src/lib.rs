pub mod app;
pub mod error;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

pub use error::{ConfigurationError, ExperimentError};

#[cfg(test)]
mod test;
