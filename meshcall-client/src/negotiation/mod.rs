mod negotiator;
mod state;

pub use negotiator::{Negotiator, PeerUpdate};
pub use state::{Action, NegotiationInput, NegotiationState, Transition, is_polite, transition};
