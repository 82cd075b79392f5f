//! Client command handling for the simulated endpoint

mod handler;

pub use handler::CommandHandler;
