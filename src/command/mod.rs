//! Operator command dispatch
//!
//! The dispatcher is the only writer of operator commands to the link.
//! Acknowledgments come back through the message router and are advisory.

mod dispatcher;

pub use dispatcher::{CommandDispatcher, DispatchError};
