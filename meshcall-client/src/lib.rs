mod call;
mod config;
mod error;
mod media;
mod negotiation;
mod registry;
mod signaling;
mod transport;

pub use call::*;
pub use config::*;
pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use registry::*;
pub use signaling::*;
pub use transport::*;

pub use meshcall_core::*;
