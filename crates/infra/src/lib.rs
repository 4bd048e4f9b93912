//! Infrastructure layer: config, queue publisher, remote clients, workers.

pub mod config;
pub mod external;
pub mod http;
pub mod queue;
pub mod shutdown;
pub mod workers;
