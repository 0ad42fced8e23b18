pub mod backup;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod hooks;
pub mod media;
pub mod notify;
pub mod queue;
pub mod scheduler;
pub mod services;
pub mod task;
pub mod types;
pub mod util;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;
