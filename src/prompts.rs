//! Prompt construction for the tutor persona and quiz generation

use crate::llm::ChatMessage;

/// The curriculum every tutoring and quiz interaction is scoped to
pub const CURRICULUM: &str = "IGCSE";

/// Priming exchange that establishes the tutor persona for `subject`.
///
/// A user-role rules message paired with a pre-filled model-role reply, so
/// the model enters the conversation already speaking as the tutor. The
/// caller's actual first question is submitted on top of this history.
pub fn tutor_priming(subject: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::user(format!(
            "Your identity: you are a highly specialized AI tutor for the {CURRICULUM} syllabus. \
             Your only focus is the {CURRICULUM} curriculum for the subject: {subject}.\n\
             \n\
             Your rules:\n\
             1. Every explanation, example, and answer must stay strictly within the {CURRICULUM} syllabus.\n\
             2. If a student asks something outside this scope, gently steer them back, for example: \
             \"That's an interesting question, but for the {CURRICULUM} syllabus we should focus on...\"\n\
             3. Use the terminology and examples found in {CURRICULUM} textbooks and exams.\n\
             4. Be patient, encouraging, and clear.\n\
             \n\
             Begin by introducing yourself as the student's personal {CURRICULUM} tutor for {subject}."
        )),
        ChatMessage::model(tutor_intro(subject)),
    ]
}

/// The model's canned opening line, pre-filled into the chat history
pub fn tutor_intro(subject: &str) -> String {
    format!(
        "Hello! I am your personal {CURRICULUM} tutor for {subject}. \
         I'm ready to help you with any questions you have about the syllabus. \
         What topic can I help you understand today?"
    )
}

/// One-shot prompt asking for a fixed-shape quiz on `subject`
pub fn quiz_prompt(subject: &str) -> String {
    format!(
        "You are an expert {CURRICULUM} exam creator. Your single task is to create a quiz.\n\
         \n\
         Instructions:\n\
         1. Create a 5-question multiple-choice quiz about the subject: \"{subject}\".\n\
         2. The questions, terminology, and concepts must strictly follow the {CURRICULUM} \
         syllabus. Do not include content from A-Levels, AP, or other curricula.\n\
         3. Give 4 options (A, B, C, D) for each question.\n\
         4. After all 5 questions, add a separate section titled \"🔑 Answer Key\".\n\
         5. In the answer key, list the correct answer for each question with a brief, \
         one-sentence explanation relevant to the {CURRICULUM} context.\n"
    )
}
