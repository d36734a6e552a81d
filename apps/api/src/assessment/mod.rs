// Assessment Flow: the fixed question bank and the per-attempt state machine.

pub mod flow;
pub mod questions;

pub use flow::AssessmentFlow;
