// Analysis prompt templates.

use crate::models::AnswerSet;

pub const ANALYSIS_SYSTEM: &str =
    "You are a career guidance expert specializing in the IT industry in Riyadh.";

const ANALYSIS_PREAMBLE: &str = "\
As a career guidance expert, analyze the following responses from an IT graduate in Riyadh \
and suggest suitable career paths. Consider the local job market and industry trends.";

const ANALYSIS_REQUEST: &str = r#"Please provide:
1. Top 3 recommended career paths
2. Key skills to develop for each path
3. Relevant job market insights for Riyadh
4. Suggested learning resources
5. Potential companies to target

Format the response in JSON with exactly this structure:
{
  "careerPaths": [
    {
      "title": "string",
      "skills": ["string"],
      "marketInsights": ["string"],
      "learningResources": ["string"],
      "targetCompanies": ["string"]
    }
  ]
}"#;

/// Builds the user message. Deterministic: answers are listed in question order.
pub fn build_analysis_prompt(answers: &AnswerSet) -> String {
    let responses = answers
        .iter()
        .map(|(id, answer)| format!("Question {id}: {answer}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{ANALYSIS_PREAMBLE}\n\nResponses:\n{responses}\n\n{ANALYSIS_REQUEST}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_answers_in_question_order() {
        let mut answers = AnswerSet::new();
        answers.record(3, "Structured and organized");
        answers.record(1, "Securing systems and networks");
        answers.record(2, "By following structured methodologies");

        let prompt = build_analysis_prompt(&answers);
        let first = prompt.find("Question 1: Securing systems and networks").unwrap();
        let second = prompt.find("Question 2: By following structured methodologies").unwrap();
        let third = prompt.find("Question 3: Structured and organized").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let answers: AnswerSet = [(1, "a".to_string()), (2, "b".to_string())]
            .into_iter()
            .collect();
        assert_eq!(build_analysis_prompt(&answers), build_analysis_prompt(&answers));
    }

    #[test]
    fn test_prompt_requests_career_paths_schema() {
        let prompt = build_analysis_prompt(&AnswerSet::new());
        assert!(prompt.contains("\"careerPaths\""));
        assert!(prompt.contains("\"targetCompanies\""));
        assert!(prompt.contains("Riyadh"));
    }
}
