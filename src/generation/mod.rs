//! Study material generation on top of the retriever.
//!
//! [`StudyAssistant`] grounds every request in the chunks retrieved from the
//! active document. When nothing has been uploaded yet it falls back to
//! asking the model without context.

pub mod clean;
mod prompts;

#[cfg(test)]
mod tests;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{GenerationConfig, RetrievalConfig};
use crate::retrieval::{BuildReport, Retrieval, RetrievedChunk, Retriever};
use crate::{RagError, Result};

pub use clean::{ParsedResponse, clean};

/// A text generation model
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for `prompt`, optionally steered by a system
    /// instruction
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    #[default]
    Mcq,
    ShortAnswer,
    TrueFalse,
    FillInTheBlank,
}

impl ExerciseKind {
    #[inline]
    pub fn is_multiple_choice(self) -> bool {
        self == Self::Mcq
    }

    /// Human readable name used in prompts
    #[inline]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Mcq => "multiple-choice",
            Self::ShortAnswer => "short-answer",
            Self::TrueFalse => "true/false",
            Self::FillInTheBlank => "fill-in-the-blank",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRequest {
    pub topic: String,
    pub kind: ExerciseKind,
    pub count: usize,
    pub difficulty: Difficulty,
}

impl ExerciseRequest {
    /// Five medium multiple-choice questions on `topic`
    #[inline]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            kind: ExerciseKind::default(),
            count: 5,
            difficulty: Difficulty::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Whether the answer was generated from retrieved document context
    pub grounded: bool,
    /// Chunks the answer was grounded on, nearest first
    pub sources: Vec<RetrievedChunk>,
}

impl Answer {
    #[inline]
    pub fn to_html(&self) -> String {
        render_html(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub request: ExerciseRequest,
    pub grounded: bool,
    pub content: ParsedResponse,
}

/// One section of generated study notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub important_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notes {
    Structured(Vec<Note>),
    /// The model did not return usable JSON
    Text(String),
}

impl Notes {
    /// Parse a raw model response into numbered notes.
    ///
    /// A single JSON object is treated as a one-note array. Anything that
    /// does not deserialize into notes is kept as cleaned text.
    #[inline]
    pub fn parse(raw: &str) -> Self {
        let parsed = clean(raw);

        let notes = match &parsed {
            ParsedResponse::Structured(Value::Array(items)) => items
                .iter()
                .map(Note::deserialize)
                .collect::<std::result::Result<Vec<_>, _>>()
                .ok(),
            ParsedResponse::Structured(object @ Value::Object(_)) => {
                Note::deserialize(object).ok().map(|note| vec![note])
            }
            _ => None,
        };

        match notes {
            Some(mut notes) if !notes.is_empty() => {
                for (id, note) in (1..).zip(notes.iter_mut()) {
                    note.id = id;
                }
                Self::Structured(notes)
            }
            _ => {
                warn!("Could not parse notes as JSON, returning text");
                Self::Text(parsed.to_display_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyNotes {
    pub grounded: bool,
    pub notes: Notes,
}

/// Render markdown produced by the model as HTML
#[inline]
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Answers questions and generates study material from the active document
#[derive(Clone)]
pub struct StudyAssistant {
    retriever: Arc<Retriever>,
    generator: Arc<dyn GenerationClient>,
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
}

impl StudyAssistant {
    #[inline]
    pub fn new(
        retriever: Arc<Retriever>,
        generator: Arc<dyn GenerationClient>,
        retrieval: RetrievalConfig,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            retrieval,
            generation,
        }
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Index `text`, replacing the active document on success
    #[inline]
    pub async fn upload(&self, text: String) -> Result<BuildReport> {
        let retriever = Arc::clone(&self.retriever);
        run_blocking(move || retriever.build_index(&text)).await
    }

    /// Read a plain text document from disk and index it like [`Self::upload`]
    #[inline]
    pub async fn upload_file(&self, path: impl Into<PathBuf>) -> Result<BuildReport> {
        let retriever = Arc::clone(&self.retriever);
        let path = path.into();
        run_blocking(move || {
            let text = fs::read_to_string(&path)?;
            debug!("Read {} bytes from {}", text.len(), path.display());
            retriever.build_index(&text)
        })
        .await
    }

    #[inline]
    pub async fn ask(&self, question: impl Into<String>) -> Result<Answer> {
        let assistant = self.clone();
        let question = question.into();
        run_blocking(move || assistant.ask_blocking(&question)).await
    }

    #[inline]
    pub async fn exercise(&self, request: ExerciseRequest) -> Result<Exercise> {
        let assistant = self.clone();
        run_blocking(move || assistant.exercise_blocking(&request)).await
    }

    #[inline]
    pub async fn notes(
        &self,
        topic: impl Into<String>,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<StudyNotes> {
        let assistant = self.clone();
        let topic = topic.into();
        run_blocking(move || assistant.notes_blocking(&topic, count, difficulty)).await
    }

    /// Answer `question`, grounded in the active document when there is one
    #[inline]
    pub fn ask_blocking(&self, question: &str) -> Result<Answer> {
        let mentor = self.generation.mentor_system_instruction.as_deref();

        match self.context_for(question, self.retrieval.ask_top_k)? {
            Some(sources) => {
                let prompt =
                    prompts::grounded_question(&prompts::context_block(&sources), question);
                let system = mentor.unwrap_or(prompts::DEFAULT_MENTOR_INSTRUCTION);
                let text = self.generator.generate(&prompt, Some(system))?;

                Ok(Answer {
                    text,
                    grounded: true,
                    sources,
                })
            }
            None => {
                let text = self.generator.generate(question, mentor)?;

                Ok(Answer {
                    text,
                    grounded: false,
                    sources: Vec::new(),
                })
            }
        }
    }

    #[inline]
    pub fn exercise_blocking(&self, request: &ExerciseRequest) -> Result<Exercise> {
        let sources = self.context_for(&request.topic, self.retrieval.exercise_top_k)?;
        let context = sources.as_deref().map(prompts::context_block);
        let prompt = prompts::exercise(request, context.as_deref());

        debug!(
            "Generating {} {:?} exercises on {:?}",
            request.count, request.kind, request.topic
        );
        let raw = self.generator.generate(
            &prompt,
            self.generation.exercise_system_instruction.as_deref(),
        )?;

        Ok(Exercise {
            request: request.clone(),
            grounded: sources.is_some(),
            content: clean(&raw),
        })
    }

    #[inline]
    pub fn notes_blocking(
        &self,
        topic: &str,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<StudyNotes> {
        let sources = self.context_for(topic, self.retrieval.notes_top_k)?;
        let context = sources.as_deref().map(prompts::context_block);
        let prompt = prompts::notes(topic, count, difficulty, context.as_deref());

        let raw = self
            .generator
            .generate(&prompt, Some(prompts::NOTES_INSTRUCTION))?;

        Ok(StudyNotes {
            grounded: sources.is_some(),
            notes: Notes::parse(&raw),
        })
    }

    /// Retrieved chunks for `query`, or `None` when generation has to run
    /// without document context
    fn context_for(&self, query: &str, k: usize) -> Result<Option<Vec<RetrievedChunk>>> {
        match self.retriever.retrieve(query, k)? {
            Retrieval::Chunks(chunks) if !chunks.is_empty() => {
                info!("Grounding request in {} retrieved chunks", chunks.len());
                Ok(Some(chunks))
            }
            Retrieval::Chunks(_) | Retrieval::NoIndex => {
                info!("No document context available, generating without grounding");
                Ok(None)
            }
        }
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RagError::Other(anyhow::anyhow!("Blocking task failed: {e}")))?
}
