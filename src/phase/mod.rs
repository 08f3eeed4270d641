//! Interview phase state machine
//!
//! Sequences one interview session: fetch question → avatar speaks →
//! candidate records → transcript finalizes → candidate reviews/submits →
//! continue or end. All phase transitions are serialized through the
//! controller; deferred transitions (the speaking window, the settle delay)
//! carry the turn id they were scheduled under and are discarded if the
//! turn has moved on.

pub mod controller;
pub mod estimate;

pub use controller::{InterviewProfile, Phase, PhaseController, PhaseEvent, PhaseSnapshot};
pub use estimate::speaking_window;
