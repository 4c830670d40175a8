use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::generation::{
    Difficulty, ExerciseRequest, Notes, ParsedResponse, StudyAssistant, StudyNotes,
};
use crate::ollama::OllamaClient;
use crate::retrieval::{Retrieval, Retriever};

/// Build an assistant backed by the configured Ollama server.
///
/// A single client serves both embeddings and generation.
#[inline]
pub fn build_assistant(config: &Config) -> Result<StudyAssistant> {
    let client = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?,
    );
    let embedder = Arc::clone(&client);
    let retriever = Arc::new(Retriever::new(embedder, config.chunking));

    Ok(StudyAssistant::new(
        retriever,
        client,
        config.retrieval,
        config.generation.clone(),
    ))
}

/// Read a plain text document and make it the active index
#[inline]
pub async fn upload_document(assistant: &StudyAssistant, path: &Path) -> Result<()> {
    info!("Indexing document {}", path.display());
    let report = assistant
        .upload_file(path)
        .await
        .with_context(|| format!("Failed to index document: {}", path.display()))?;

    eprintln!(
        "{} {} ({} chunks, {} dimensions)",
        style("✓ Indexed").green(),
        path.display(),
        report.chunk_count,
        report.dimension
    );

    Ok(())
}

async fn prepare_assistant(document: Option<&Path>) -> Result<StudyAssistant> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let assistant = build_assistant(&config)?;

    match document {
        Some(path) => upload_document(&assistant, path).await?,
        None => warn!("No document given, answers will not be grounded in study material"),
    }

    Ok(assistant)
}

/// Print the chunks of `document` nearest to `query`
#[inline]
pub async fn retrieve_chunks(query: &str, document: &Path, top_k: Option<usize>) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let assistant = build_assistant(&config)?;
    upload_document(&assistant, document).await?;

    let k = top_k.unwrap_or(config.retrieval.ask_top_k);
    let retrieval = assistant
        .retriever()
        .retrieve(query, k)
        .context("Retrieval failed")?;

    let Retrieval::Chunks(chunks) = retrieval else {
        println!("No document is indexed.");
        return Ok(());
    };

    if chunks.is_empty() {
        println!("No chunks retrieved.");
        return Ok(());
    }

    println!("Top {} chunks for \"{}\":", chunks.len(), query);
    println!();
    for (rank, chunk) in chunks.iter().enumerate() {
        println!(
            "{} chunk {} {}",
            style(format!("{}.", rank + 1)).bold(),
            chunk.index,
            style(format!("(distance {:.4})", chunk.distance)).dim()
        );
        println!("   {}", chunk.text);
        println!();
    }

    Ok(())
}

#[inline]
pub async fn ask_question(question: &str, document: Option<&Path>, html: bool) -> Result<()> {
    let assistant = prepare_assistant(document).await?;

    let answer = assistant
        .ask(question)
        .await
        .context("Failed to answer question")?;

    if html {
        print!("{}", answer.to_html());
    } else {
        println!("{}", answer.text);
    }

    if answer.grounded {
        let sources: Vec<String> = answer
            .sources
            .iter()
            .map(|chunk| chunk.index.to_string())
            .collect();
        eprintln!();
        eprintln!(
            "{}",
            style(format!("Grounded in chunks: {}", sources.join(", "))).dim()
        );
    }

    Ok(())
}

#[inline]
pub async fn generate_exercise(request: ExerciseRequest, document: Option<&Path>) -> Result<()> {
    let assistant = prepare_assistant(document).await?;

    let exercise = assistant
        .exercise(request)
        .await
        .context("Failed to generate exercise")?;

    match &exercise.content {
        ParsedResponse::Structured(_) => println!("{}", exercise.content.to_display_string()),
        ParsedResponse::PlainText(text) => println!("{text}"),
    }

    Ok(())
}

#[inline]
pub async fn generate_notes(
    topic: &str,
    count: usize,
    difficulty: Difficulty,
    document: Option<&Path>,
) -> Result<()> {
    let assistant = prepare_assistant(document).await?;

    let StudyNotes { notes, .. } = assistant
        .notes(topic, count, difficulty)
        .await
        .context("Failed to generate notes")?;

    match notes {
        Notes::Structured(notes) => {
            for note in notes {
                println!("{}", style(format!("{}. {}", note.id, note.title)).bold().cyan());
                if let Some(subtitle) = &note.subtitle {
                    println!("   {}", style(subtitle).italic());
                }
                for point in &note.key_points {
                    println!("   • {point}");
                }
                if !note.summary.is_empty() {
                    println!("   {}", note.summary);
                }
                if !note.important_concepts.is_empty() {
                    println!(
                        "   {} {}",
                        style("Concepts:").dim(),
                        note.important_concepts.join(", ")
                    );
                }
                println!();
            }
        }
        Notes::Text(text) => println!("{text}"),
    }

    Ok(())
}

/// Show server health and the configured models
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    println!("📊 Study RAG Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match config.ollama_url() {
        Ok(url) => println!("   URL: {url}"),
        Err(e) => println!("   ❌ Invalid URL - {e}"),
    }
    println!("   📋 Embedding Model: {}", config.ollama.embedding_model);
    println!("   💬 Generation Model: {}", config.ollama.generation_model);
    println!("   🔢 Batch Size: {}", config.ollama.batch_size);

    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => println!("   ✅ Ollama: Connected, models available"),
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {e:#}"),
        },
        Err(e) => println!("   ❌ Ollama: Failed to create client - {e:#}"),
    }

    println!();
    println!("✂️  Chunking:");
    println!(
        "   {} words per chunk, {} words overlap",
        config.chunking.chunk_size, config.chunking.overlap
    );

    println!();
    println!("🔍 Retrieval:");
    println!(
        "   ask: {}, exercises: {}, notes: {}",
        config.retrieval.ask_top_k, config.retrieval.exercise_top_k, config.retrieval.notes_top_k
    );

    Ok(())
}
