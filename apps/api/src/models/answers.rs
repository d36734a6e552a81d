use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Selected option text per question id.
///
/// Serialises as a JSON object with string keys (`{"1": "..."}`). Iteration is
/// ascending by question id, which is question order for the built-in bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<u32, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or overwrites) the answer for a question.
    pub fn record(&mut self, question_id: u32, answer: impl Into<String>) {
        self.0.insert(question_id, answer.into());
    }

    pub fn get(&self, question_id: u32) -> Option<&str> {
        self.0.get(&question_id).map(String::as_str)
    }

    pub fn contains(&self, question_id: u32) -> bool {
        self.0.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(id, answer)| (*id, answer.as_str()))
    }
}

impl FromIterator<(u32, String)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_with_string_keys() {
        let mut answers = AnswerSet::new();
        answers.record(2, "By analyzing data and patterns");
        answers.record(1, "Working with data and algorithms");

        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "1": "Working with data and algorithms",
                "2": "By analyzing data and patterns"
            })
        );
    }

    #[test]
    fn test_deserialises_string_keys_in_id_order() {
        let answers: AnswerSet =
            serde_json::from_str(r#"{"10": "c", "2": "b", "1": "a"}"#).unwrap();
        assert_eq!(answers.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![1, 2, 10]);
        assert_eq!(answers.get(10), Some("c"));
    }

    #[test]
    fn test_rejects_non_numeric_question_ids() {
        assert!(serde_json::from_str::<AnswerSet>(r#"{"first": "a"}"#).is_err());
    }

    #[test]
    fn test_record_overwrites_existing_answer() {
        let mut answers = AnswerSet::new();
        answers.record(1, "a");
        answers.record(1, "b");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(1), Some("b"));
    }
}
