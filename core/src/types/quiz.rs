use serde::{Deserialize, Serialize};

use super::string_or_number;

/// Identity-proof questionnaire issued by `getQuiz`.
///
/// `quiz_id`, `transaction_id` and `response_unique_id` are correlation
/// keys; they must come back unchanged in [`QuizAnswers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_questions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(rename = "question", default)]
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Declared question count, falling back to the number of questions received.
    pub fn question_count(&self) -> usize {
        self.num_questions
            .as_deref()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(self.questions.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "nsquestionId", default, deserialize_with = "string_or_number")]
    pub question_id: Option<String>,
    #[serde(rename = "nssequenceId", default, deserialize_with = "string_or_number")]
    pub sequence_id: Option<String>,
    #[serde(rename = "nseq", default, deserialize_with = "string_or_number")]
    pub seq: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "choice", default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "nschoiceId", default, deserialize_with = "string_or_number")]
    pub choice_id: Option<String>,
    #[serde(rename = "nssequenceId", default, deserialize_with = "string_or_number")]
    pub sequence_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// One selected answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub choice_id: String,
}

impl Answer {
    pub fn new(question_id: &str, choice_id: &str) -> Self {
        Self {
            question_id: question_id.to_string(),
            choice_id: choice_id.to_string(),
        }
    }
}

/// Body for `verifyQuiz`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswers {
    pub access_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_unique_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl QuizAnswers {
    /// Start an answer sheet for `quiz`, copying its correlation fields.
    pub fn for_quiz(access_code: &str, quiz: &Quiz) -> Self {
        Self {
            access_code: access_code.to_string(),
            quiz_id: quiz.quiz_id.clone(),
            transaction_id: quiz.transaction_id.clone(),
            response_unique_id: quiz.response_unique_id.clone(),
            answers: Vec::with_capacity(quiz.questions.len()),
        }
    }

    pub fn answer(mut self, question_id: &str, choice_id: &str) -> Self {
        self.answers.push(Answer::new(question_id, choice_id));
        self
    }
}
