//! Per-attempt assessment state machine.
//!
//! ```text
//! Answering(i) --select--> Answering(i+1)         (i not last)
//! Answering(last) --submit--> Submitting --> Results | Error
//! Results | Error --reset--> Answering(0)
//! ```
//!
//! Submission is split into `begin_submit` / `finish_submit` so a caller holding
//! the flow behind a lock can release it while the gateway call is in flight.

use thiserror::Error;
use tracing::warn;

use crate::analysis::{AnalysisError, ANALYSIS_FAILED};
use crate::assessment::questions::QUESTIONS;
use crate::models::{AnswerSet, AssessmentResult, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Answering(usize),
    Submitting,
    Results,
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("'{0}' is not an option for this question")]
    UnknownOption(String),

    #[error("Please answer every question before submitting.")]
    Incomplete,

    #[error("Your responses are already being analyzed.")]
    SubmissionPending,

    #[error("Retake the assessment to change your answers.")]
    ResultsShown,
}

#[derive(Debug, Clone)]
pub struct AssessmentFlow {
    questions: &'static [Question],
    current: usize,
    answers: AnswerSet,
    submitting: bool,
    result: Option<AssessmentResult>,
    error: Option<String>,
}

impl Default for AssessmentFlow {
    fn default() -> Self {
        Self::new(QUESTIONS)
    }
}

impl AssessmentFlow {
    pub fn new(questions: &'static [Question]) -> Self {
        Self {
            questions,
            current: 0,
            answers: AnswerSet::new(),
            submitting: false,
            result: None,
            error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        if self.submitting {
            FlowState::Submitting
        } else if self.result.is_some() {
            FlowState::Results
        } else if self.error.is_some() {
            FlowState::Error
        } else {
            FlowState::Answering(self.current)
        }
    }

    pub fn current_question_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&'static Question> {
        self.questions.get(self.current)
    }

    /// 1-based position of the current question and the total count.
    pub fn progress(&self) -> (usize, usize) {
        (self.current_question_index() + 1, self.questions.len())
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn is_complete(&self) -> bool {
        self.questions.iter().all(|q| self.answers.contains(q.id))
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records `option` for the current question and advances unless this is
    /// the last question.
    pub fn select_answer(&mut self, option: &str) -> Result<(), FlowError> {
        if self.submitting {
            return Err(FlowError::SubmissionPending);
        }
        if self.result.is_some() {
            return Err(FlowError::ResultsShown);
        }
        let question = self
            .current_question()
            .filter(|q| q.offers(option))
            .ok_or_else(|| FlowError::UnknownOption(option.to_string()))?;

        self.answers.record(question.id, option);
        if !self.is_last_question() {
            self.current += 1;
        }
        Ok(())
    }

    /// Enters `Submitting` and hands back the answers to send.
    pub fn begin_submit(&mut self) -> Result<AnswerSet, FlowError> {
        if self.submitting {
            return Err(FlowError::SubmissionPending);
        }
        if self.result.is_some() {
            return Err(FlowError::ResultsShown);
        }
        if !self.is_complete() {
            return Err(FlowError::Incomplete);
        }
        self.submitting = true;
        self.error = None;
        Ok(self.answers.clone())
    }

    /// Applies the gateway outcome. Answers and index are never touched.
    pub fn finish_submit(&mut self, outcome: Result<AssessmentResult, AnalysisError>) {
        if !self.submitting {
            warn!("Assessment outcome arrived with no submission in flight; ignoring");
            return;
        }
        self.submitting = false;
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(e) => {
                warn!("Assessment submission failed: {e}");
                self.error = Some(ANALYSIS_FAILED.to_string());
            }
        }
    }

    /// Sends the full answer set to `gateway` and awaits the single reply.
    /// Only usable while holding the flow exclusively; the web layer shares
    /// flows behind a lock and uses the split form.
    #[cfg(test)]
    pub async fn submit(
        &mut self,
        gateway: &dyn crate::analysis::AnalysisGateway,
    ) -> Result<(), FlowError> {
        let answers = self.begin_submit()?;
        let outcome = gateway.analyze(&answers).await;
        self.finish_submit(outcome);
        Ok(())
    }

    /// Returns to `Answering(0)` with nothing recorded.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        if self.submitting {
            return Err(FlowError::SubmissionPending);
        }
        self.current = 0;
        self.answers = AnswerSet::new();
        self.result = None;
        self.error = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisGateway, HttpGateway};
    use crate::models::CareerPath;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingGateway {
        calls: Mutex<Vec<AnswerSet>>,
        fail: bool,
    }

    impl RecordingGateway {
        fn succeeding() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl AnalysisGateway for RecordingGateway {
        async fn analyze(&self, answers: &AnswerSet) -> Result<AssessmentResult, AnalysisError> {
            self.calls.lock().unwrap().push(answers.clone());
            if self.fail {
                return Err(AnalysisError::Status(500));
            }
            Ok(sample_result())
        }
    }

    fn sample_result() -> AssessmentResult {
        AssessmentResult {
            career_paths: vec![CareerPath {
                title: "Frontend Engineer".to_string(),
                skills: vec!["React".to_string()],
                market_insights: vec!["High demand".to_string()],
                learning_resources: vec!["MDN".to_string()],
                target_companies: vec!["Acme".to_string()],
            }],
        }
    }

    fn answer_all(flow: &mut AssessmentFlow) {
        for question in QUESTIONS {
            flow.select_answer(question.options[0]).unwrap();
        }
    }

    #[test]
    fn test_initial_state_is_answering_first_question() {
        let flow = AssessmentFlow::default();
        assert_eq!(flow.state(), FlowState::Answering(0));
        assert_eq!(flow.answers().len(), 0);
        assert_eq!(flow.progress(), (1, QUESTIONS.len()));
    }

    #[test]
    fn test_select_answer_records_and_advances() {
        let mut flow = AssessmentFlow::default();
        flow.select_answer("Securing systems and networks").unwrap();

        assert_eq!(flow.answers().get(1), Some("Securing systems and networks"));
        assert_eq!(flow.state(), FlowState::Answering(1));
    }

    #[test]
    fn test_select_answer_on_last_question_does_not_advance() {
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        let last = QUESTIONS.len() - 1;
        assert_eq!(flow.current_question_index(), last);

        flow.select_answer(QUESTIONS[last].options[2]).unwrap();
        assert_eq!(flow.current_question_index(), last);
        assert_eq!(flow.answers().get(QUESTIONS[last].id), Some(QUESTIONS[last].options[2]));
        assert_eq!(flow.answers().len(), QUESTIONS.len());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let mut flow = AssessmentFlow::default();
        let err = flow.select_answer("Writing COBOL").unwrap_err();
        assert_eq!(err, FlowError::UnknownOption("Writing COBOL".to_string()));
        assert_eq!(flow.answers().len(), 0);
        assert_eq!(flow.current_question_index(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_submit_makes_no_request() {
        let gateway = RecordingGateway::succeeding();
        let mut flow = AssessmentFlow::default();
        flow.select_answer(QUESTIONS[0].options[1]).unwrap();

        assert_eq!(flow.submit(&gateway).await, Err(FlowError::Incomplete));
        assert!(gateway.calls.lock().unwrap().is_empty());
        assert_eq!(flow.state(), FlowState::Answering(1));
    }

    #[tokio::test]
    async fn test_submit_sends_exactly_the_answered_questions_once() {
        let gateway = RecordingGateway::succeeding();
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);

        flow.submit(&gateway).await.unwrap();

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let sent: Vec<u32> = calls[0].iter().map(|(id, _)| id).collect();
        let expected: Vec<u32> = QUESTIONS.iter().map(|q| q.id).collect();
        assert_eq!(sent, expected);
        assert_eq!(flow.state(), FlowState::Results);
        assert_eq!(flow.result(), Some(&sample_result()));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_answers_and_index() {
        let gateway = RecordingGateway::failing();
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        let answers_before = flow.answers().clone();
        let index_before = flow.current_question_index();

        flow.submit(&gateway).await.unwrap();

        assert_eq!(flow.state(), FlowState::Error);
        assert_eq!(flow.error(), Some("Failed to analyze assessment"));
        assert_eq!(flow.answers(), &answers_before);
        assert_eq!(flow.current_question_index(), index_before);
        assert!(flow.result().is_none());
    }

    #[tokio::test]
    async fn test_gateway_http_500_shows_generic_error() {
        use axum::{http::StatusCode, routing::post, Json, Router};

        let app = Router::new().route(
            "/api/analyze-assessment",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Failed to analyze assessment" })),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let gateway = HttpGateway::new(&format!("http://{addr}"));
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        let answers_before = flow.answers().clone();

        flow.submit(&gateway).await.unwrap();

        assert_eq!(flow.error(), Some("Failed to analyze assessment"));
        assert_eq!(flow.answers(), &answers_before);
        assert_eq!(flow.current_question_index(), QUESTIONS.len() - 1);
    }

    #[test]
    fn test_second_begin_while_pending_is_rejected() {
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);

        flow.begin_submit().unwrap();
        assert_eq!(flow.state(), FlowState::Submitting);
        assert_eq!(flow.begin_submit(), Err(FlowError::SubmissionPending));
        assert_eq!(
            flow.select_answer(QUESTIONS[2].options[0]),
            Err(FlowError::SubmissionPending)
        );
        assert_eq!(flow.reset(), Err(FlowError::SubmissionPending));
    }

    #[test]
    fn test_begin_submit_clears_previous_error() {
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        flow.begin_submit().unwrap();
        flow.finish_submit(Err(AnalysisError::Status(502)));
        assert!(flow.error().is_some());

        flow.begin_submit().unwrap();
        assert!(flow.error().is_none());
    }

    #[tokio::test]
    async fn test_reset_after_results_returns_to_start() {
        let gateway = RecordingGateway::succeeding();
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        flow.submit(&gateway).await.unwrap();
        assert_eq!(flow.state(), FlowState::Results);

        flow.reset().unwrap();

        assert_eq!(flow.state(), FlowState::Answering(0));
        assert_eq!(flow.answers().len(), 0);
        assert!(flow.result().is_none());
        assert!(flow.error().is_none());
    }

    #[test]
    fn test_answers_are_locked_while_results_shown() {
        let mut flow = AssessmentFlow::default();
        answer_all(&mut flow);
        flow.begin_submit().unwrap();
        flow.finish_submit(Ok(sample_result()));

        assert_eq!(
            flow.select_answer(QUESTIONS[0].options[0]),
            Err(FlowError::ResultsShown)
        );
    }
}
