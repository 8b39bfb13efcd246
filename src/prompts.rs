//! Prompt templates sent to the generative service.
//!
//! Caller text is interpolated verbatim. Nothing here escapes or filters the
//! topic, level, question or answer, so a caller can steer the model with
//! crafted input.

/// Number of questions requested when the caller does not say.
pub const DEFAULT_FLASHCARD_COUNT: u32 = 15;

pub fn build_generation_prompt(topic: &str, level: &str, count: u32) -> String {
    format!(
        r#"You are an expert tutor.
The user wants to study the topic: "{topic}" at a {level} level.

Generate a list of [{count}] flashcards, with a list of questions

Only give me the questions and nothing else.
Format it as JSON like this:
[
"What is a web framework?",
"What is CSS for"
]"#
    )
}

pub fn build_evaluation_prompt(question: &str, answer: &str) -> String {
    format!(
        r#"You are an expert tutor.
For the question "{question}" this is my answer
"{answer}"

Now rate the answer with a rating between 0-5, and feedback

Only give me the JSON data and nothing else, return it in the following structure:
{{"rating": 0, "feedback": "The answer ..."}}"#
    )
}
