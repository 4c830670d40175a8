use itertools::Itertools;

use super::{Difficulty, ExerciseRequest};
use crate::retrieval::RetrievedChunk;

pub const DEFAULT_MENTOR_INSTRUCTION: &str = "You are a helpful assistant that answers questions \
     based on provided study material. Be accurate and cite the relevant parts of the content \
     when possible.";

pub const NOTES_INSTRUCTION: &str = "You are an expert educational content creator. Generate \
     well-structured, comprehensive notes that capture the most important information on the \
     topic. Focus on clarity, accuracy, and educational value.";

const MCQ_FORMAT: &str = "For each question, provide:
- The question text
- Four options labeled a), b), c), d)
At the end, include an 'Answer Key' section in the following format:
Answer Key:
1. b
2. c
...";

const NOTE_FORMAT: &str = r#"For each note section, provide:
- A clear, descriptive title
- A brief subtitle (optional)
- 3-5 key points (bullet points)
- A concise summary paragraph
- 2-4 important concepts/tags

Format the response as a JSON array where each note has this structure:
{
    "title": "Section Title",
    "subtitle": "Brief description (optional)",
    "keyPoints": ["Point 1", "Point 2", "Point 3"],
    "summary": "Brief summary paragraph",
    "importantConcepts": ["Concept 1", "Concept 2", "Concept 3"]
}"#;

/// Join retrieved chunk texts into a context block, nearest first
pub fn context_block(chunks: &[RetrievedChunk]) -> String {
    chunks.iter().map(|chunk| chunk.text.as_str()).join("\n\n")
}

pub fn grounded_question(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

pub fn exercise(request: &ExerciseRequest, context: Option<&str>) -> String {
    let kind = request.kind.describe();
    let details = if request.kind.is_multiple_choice() {
        MCQ_FORMAT
    } else {
        "For each question, provide the necessary details as per the exercise type."
    };

    match context {
        Some(context) => format!(
            "Based on the following study material, create {count} {kind} questions about: \
             {topic}.\n\n{details}\n\nStudy Material:\n{context}\n\n{footer}",
            count = request.count,
            topic = request.topic,
            footer = exercise_footer(request),
        ),
        None => format!(
            "Create {count} {kind} questions about: {topic}.\n\n{details}\n\n{footer}",
            count = request.count,
            topic = request.topic,
            footer = exercise_footer(request),
        ),
    }
}

fn exercise_footer(request: &ExerciseRequest) -> String {
    format!(
        "Topic: {}\nExercise Type: {}\nNumber of Questions: {}\nDifficulty Level: {}",
        request.topic,
        request.kind.describe(),
        request.count,
        request.difficulty
    )
}

pub fn notes(topic: &str, count: usize, difficulty: Difficulty, context: Option<&str>) -> String {
    let footer =
        format!("Topic: {topic}\nNumber of Notes: {count}\nDifficulty Level: {difficulty}");

    match context {
        Some(context) => format!(
            "Based on the following study material, create {count} important section notes \
             about: {topic}.\n\n{NOTE_FORMAT}\n\nStudy Material:\n{context}\n\n{footer}"
        ),
        None => format!(
            "Create {count} important section notes about: {topic}.\n\n{NOTE_FORMAT}\n\n{footer}"
        ),
    }
}
