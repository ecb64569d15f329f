//! Match session: the state machine, its async driver and the view it renders.

mod driver;
mod machine;
mod view;

pub use driver::SessionDriver;
pub use machine::{CryptoTask, MatchSession, MatchState, SessionError, SessionEvent};
pub use view::{Phase, SessionView};
