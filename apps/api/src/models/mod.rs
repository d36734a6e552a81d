// Shared data model: questions, answers, model-generated results, sessions.

pub mod answers;
pub mod career;
pub mod question;
pub mod user;

pub use answers::AnswerSet;
pub use career::{AssessmentResult, CareerPath};
pub use question::Question;
pub use user::Session;
