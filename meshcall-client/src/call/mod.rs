mod call_command;
mod call_state;
mod handle;
mod session;

pub use call_command::{CallCommand, Reply};
pub use call_state::{CallState, CallStatus, LocalMediaState};
pub use handle::CallHandle;
pub use session::CallSession;
