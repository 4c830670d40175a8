use super::*;
use crate::embeddings::{ChunkingConfig, Embedder, EmbeddingVector};
use parking_lot::Mutex;

const VOCABULARY: [&str; 3] = ["photosynthesis", "mitochondria", "osmosis"];
const DOCUMENT: &str = "photosynthesis uses light energy mitochondria produce cellular energy \
                        osmosis moves water molecules";

/// Embeds text as keyword counts over a tiny vocabulary
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        Ok(texts
            .iter()
            .map(|text| {
                VOCABULARY
                    .iter()
                    .map(|keyword| text.split_whitespace().filter(|w| w == keyword).count() as f32)
                    .collect()
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingGenerator {
    reply: String,
    fail: bool,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingGenerator {
    fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    fn last_call(&self) -> (String, Option<String>) {
        self.calls
            .lock()
            .last()
            .cloned()
            .expect("generator should have been called")
    }
}

impl GenerationClient for RecordingGenerator {
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        self.calls
            .lock()
            .push((prompt.to_string(), system.map(str::to_string)));
        if self.fail {
            return Err(RagError::Generation("model unavailable".to_string()));
        }
        Ok(self.reply.clone())
    }
}

fn assistant_with(
    generator: RecordingGenerator,
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
) -> (StudyAssistant, Arc<RecordingGenerator>) {
    let chunking = ChunkingConfig {
        chunk_size: 4,
        overlap: 0,
    };
    let retriever = Arc::new(Retriever::new(Arc::new(KeywordEmbedder), chunking));
    let recorder = Arc::new(generator);
    let handle = Arc::clone(&recorder);

    (
        StudyAssistant::new(retriever, handle, retrieval, generation),
        recorder,
    )
}

fn assistant(reply: &str) -> (StudyAssistant, Arc<RecordingGenerator>) {
    assistant_with(
        RecordingGenerator::replying(reply),
        RetrievalConfig {
            ask_top_k: 1,
            exercise_top_k: 2,
            notes_top_k: 3,
        },
        GenerationConfig::default(),
    )
}

#[tokio::test]
async fn ask_without_document_is_ungrounded() {
    let (assistant, recorder) = assistant("Osmosis is the movement of water.");

    let answer = assistant
        .ask("what is osmosis")
        .await
        .expect("ask should succeed");

    assert!(!answer.grounded);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.text, "Osmosis is the movement of water.");
    assert_eq!(recorder.last_call(), ("what is osmosis".to_string(), None));
}

#[tokio::test]
async fn ask_with_document_uses_retrieved_context() {
    let (assistant, recorder) = assistant("Water crosses a membrane.");

    let report = assistant
        .upload(DOCUMENT.to_string())
        .await
        .expect("upload should succeed");
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.dimension, 3);

    let answer = assistant
        .ask("what is osmosis")
        .await
        .expect("ask should succeed");

    assert!(answer.grounded);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].index, 2);

    let (prompt, system) = recorder.last_call();
    assert_eq!(
        prompt,
        "Context:\nosmosis moves water molecules\n\nQuestion: what is osmosis"
    );
    assert_eq!(system.as_deref(), Some(prompts::DEFAULT_MENTOR_INSTRUCTION));
}

#[tokio::test]
async fn mentor_instruction_overrides_default() {
    let (assistant, recorder) = assistant_with(
        RecordingGenerator::replying("ok"),
        RetrievalConfig::default(),
        GenerationConfig {
            mentor_system_instruction: Some("You are a patient biology tutor.".to_string()),
            exercise_system_instruction: None,
        },
    );

    assistant.ask("hello").await.expect("ask should succeed");
    assert_eq!(
        recorder.last_call().1.as_deref(),
        Some("You are a patient biology tutor.")
    );

    assistant
        .upload(DOCUMENT.to_string())
        .await
        .expect("upload should succeed");
    assistant
        .ask("what is photosynthesis")
        .await
        .expect("ask should succeed");
    assert_eq!(
        recorder.last_call().1.as_deref(),
        Some("You are a patient biology tutor.")
    );
}

#[tokio::test]
async fn grounded_context_is_joined_nearest_first() {
    let (assistant, recorder) = assistant_with(
        RecordingGenerator::replying("[]"),
        RetrievalConfig {
            ask_top_k: 2,
            ..RetrievalConfig::default()
        },
        GenerationConfig::default(),
    );
    assistant
        .upload(DOCUMENT.to_string())
        .await
        .expect("upload should succeed");

    assistant
        .ask("mitochondria")
        .await
        .expect("ask should succeed");

    // Chunks 0 and 2 tie for second place; insertion order wins
    assert_eq!(
        recorder.last_call().0,
        "Context:\nmitochondria produce cellular energy\n\nphotosynthesis uses light \
         energy\n\nQuestion: mitochondria"
    );
}

#[tokio::test]
async fn mcq_exercise_requests_answer_key() {
    let reply = "```json\n[{\"question\": \"What moves water?\", \"answer\": \"b\"}]\n```";
    let (assistant, recorder) = assistant_with(
        RecordingGenerator::replying(reply),
        RetrievalConfig::default(),
        GenerationConfig {
            mentor_system_instruction: None,
            exercise_system_instruction: Some("Write exam questions.".to_string()),
        },
    );
    assistant
        .upload(DOCUMENT.to_string())
        .await
        .expect("upload should succeed");

    let exercise = assistant
        .exercise(ExerciseRequest::new("osmosis"))
        .await
        .expect("exercise should succeed");

    assert!(exercise.grounded);
    assert!(exercise.content.is_structured());

    let (prompt, system) = recorder.last_call();
    assert!(prompt.starts_with(
        "Based on the following study material, create 5 multiple-choice questions about: osmosis."
    ));
    assert!(prompt.contains("Four options labeled a), b), c), d)"));
    assert!(prompt.contains("Answer Key:"));
    assert!(prompt.contains("Study Material:\nosmosis moves water molecules"));
    assert!(prompt.ends_with("Difficulty Level: medium"));
    assert_eq!(system.as_deref(), Some("Write exam questions."));
}

#[tokio::test]
async fn other_exercise_kinds_without_document() {
    let (assistant, recorder) = assistant("1. True or false: cells divide.");

    let request = ExerciseRequest {
        topic: "cells".to_string(),
        kind: ExerciseKind::TrueFalse,
        count: 3,
        difficulty: Difficulty::Hard,
    };
    let exercise = assistant
        .exercise(request.clone())
        .await
        .expect("exercise should succeed");

    assert!(!exercise.grounded);
    assert_eq!(exercise.request, request);
    assert_eq!(
        exercise.content,
        ParsedResponse::PlainText("1. True or false: cells divide.".to_string())
    );

    let (prompt, system) = recorder.last_call();
    assert!(prompt.starts_with("Create 3 true/false questions about: cells."));
    assert!(!prompt.contains("Answer Key"));
    assert!(!prompt.contains("Study Material"));
    assert!(prompt.contains("Difficulty Level: hard"));
    assert_eq!(system, None);
}

#[tokio::test]
async fn notes_are_numbered_from_one() {
    let reply = r#"Here you go:
[
  {"title": "Light", "keyPoints": ["absorbed by chlorophyll"], "summary": "Plants use light.", "importantConcepts": ["chlorophyll"]},
  {"title": "Energy", "subtitle": "Storage", "keyPoints": [], "summary": "Stored as glucose.", "importantConcepts": []}
]"#;
    let (assistant, recorder) = assistant(reply);
    assistant
        .upload(DOCUMENT.to_string())
        .await
        .expect("upload should succeed");

    let notes = assistant
        .notes("photosynthesis", 2, Difficulty::Easy)
        .await
        .expect("notes should succeed");

    assert!(notes.grounded);
    let Notes::Structured(notes) = notes.notes else {
        panic!("expected structured notes");
    };
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id, 1);
    assert_eq!(notes[0].title, "Light");
    assert_eq!(notes[0].key_points, vec!["absorbed by chlorophyll"]);
    assert_eq!(notes[0].subtitle, None);
    assert_eq!(notes[1].id, 2);
    assert_eq!(notes[1].subtitle.as_deref(), Some("Storage"));

    let (prompt, system) = recorder.last_call();
    assert!(prompt.contains("\"importantConcepts\""));
    assert!(prompt.contains("Number of Notes: 2"));
    assert!(prompt.contains("Difficulty Level: easy"));
    assert_eq!(system.as_deref(), Some(prompts::NOTES_INSTRUCTION));
}

#[test]
fn single_note_object_is_wrapped() {
    let notes = Notes::parse(r#"{"id": 7, "title": "Osmosis", "summary": "Water moves."}"#);

    assert_eq!(
        notes,
        Notes::Structured(vec![Note {
            id: 1,
            title: "Osmosis".to_string(),
            subtitle: None,
            key_points: Vec::new(),
            summary: "Water moves.".to_string(),
            important_concepts: Vec::new(),
        }])
    );
}

#[test]
fn unparseable_notes_become_text() {
    assert_eq!(
        Notes::parse("**Osmosis** moves water across membranes."),
        Notes::Text("Osmosis moves water across membranes.".to_string())
    );

    // JSON, but not shaped like notes
    assert!(matches!(Notes::parse("[1, 2, 3]"), Notes::Text(_)));
    assert!(matches!(Notes::parse("[]"), Notes::Text(_)));
}

#[tokio::test]
async fn failed_upload_keeps_assistant_empty() {
    let (assistant, recorder) = assistant("fallback");

    let result = assistant.upload("   \n ".to_string()).await;
    assert!(matches!(result, Err(RagError::EmptyDocument)));

    let answer = assistant.ask("anything").await.expect("ask should succeed");
    assert!(!answer.grounded);
    assert_eq!(recorder.calls.lock().len(), 1);
}

#[tokio::test]
async fn upload_file_indexes_document_from_disk() {
    let (assistant, recorder) = assistant("answer");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("biology.txt");
    std::fs::write(&path, DOCUMENT).expect("Failed to write document");

    let report = assistant
        .upload_file(&path)
        .await
        .expect("upload should succeed");
    assert_eq!(report.chunk_count, 3);

    let answer = assistant.ask("osmosis").await.expect("ask should succeed");
    assert!(answer.grounded);
    assert_eq!(recorder.calls.lock().len(), 1);
}

#[tokio::test]
async fn missing_document_file_is_an_io_error() {
    let (assistant, _recorder) = assistant("fallback");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let result = assistant.upload_file(dir.path().join("missing.txt")).await;
    assert!(matches!(result, Err(RagError::Io(_))));

    let answer = assistant.ask("anything").await.expect("ask should succeed");
    assert!(!answer.grounded);
}

#[tokio::test]
async fn generation_errors_propagate() {
    let (assistant, _recorder) = assistant_with(
        RecordingGenerator {
            fail: true,
            ..RecordingGenerator::default()
        },
        RetrievalConfig::default(),
        GenerationConfig::default(),
    );

    let result = assistant.ask("what is osmosis").await;
    assert!(matches!(result, Err(RagError::Generation(_))));
}

#[test]
fn exercise_kind_names() {
    use clap::ValueEnum;

    let names: Vec<String> = ExerciseKind::value_variants()
        .iter()
        .filter_map(|kind| kind.to_possible_value())
        .map(|value| value.get_name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["mcq", "short-answer", "true-false", "fill-in-the-blank"]
    );

    assert!(ExerciseKind::Mcq.is_multiple_choice());
    assert!(!ExerciseKind::FillInTheBlank.is_multiple_choice());
    assert_eq!(
        serde_json::to_string(&ExerciseKind::ShortAnswer).expect("should serialize"),
        "\"short-answer\""
    );
    assert_eq!(Difficulty::default().to_string(), "medium");
}

#[test]
fn markdown_renders_to_html() {
    let html = render_html("# Osmosis\n\nWater moves **across** membranes.");
    assert_eq!(
        html,
        "<h1>Osmosis</h1>\n<p>Water moves <strong>across</strong> membranes.</p>\n"
    );

    let answer = Answer {
        text: "- one\n- two".to_string(),
        grounded: false,
        sources: Vec::new(),
    };
    assert_eq!(answer.to_html(), "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n");
}
