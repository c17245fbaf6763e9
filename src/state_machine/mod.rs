pub mod record;
mod state;

pub use record::{RecordTrack, RunReport};
pub use state::{Event, InvalidTransition, StateMachine};
