mod catalog;
mod config;
mod connector;
mod errors;
mod filter;
mod monitor;
mod partition;
mod source;

pub use catalog::*;
pub use config::*;
pub use connector::*;
pub use errors::*;
pub use filter::*;
pub use monitor::*;
pub use partition::*;
pub use source::*;
