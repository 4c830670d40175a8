use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use study_rag::commands::{
    ask_question, generate_exercise, generate_notes, retrieve_chunks, show_status,
};
use study_rag::config::{run_interactive_config, show_config};
use study_rag::generation::{Difficulty, ExerciseKind, ExerciseRequest};

#[derive(Parser)]
#[command(name = "study-rag")]
#[command(about = "Ask questions and generate study material grounded in your own documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Check the Ollama server and show the configured models
    Status,
    /// Show the document chunks most relevant to a query
    Retrieve {
        query: String,
        /// Plain text document to index
        #[arg(long)]
        document: PathBuf,
        /// Number of chunks to return (defaults to the configured ask_top_k)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=100))]
        k: Option<u16>,
    },
    /// Ask a question, grounded in a document when one is given
    Ask {
        question: String,
        /// Plain text document to index before answering
        #[arg(long)]
        document: Option<PathBuf>,
        /// Render the answer as HTML
        #[arg(long)]
        html: bool,
    },
    /// Generate practice exercises on a topic
    Exercise {
        topic: String,
        #[arg(long)]
        document: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ExerciseKind::Mcq)]
        kind: ExerciseKind,
        /// Number of questions
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=50))]
        count: u16,
        #[arg(long, value_enum, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,
    },
    /// Generate structured study notes on a topic
    Notes {
        topic: String,
        #[arg(long)]
        document: Option<PathBuf>,
        /// Number of note sections
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..=50))]
        count: u16,
        #[arg(long, value_enum, default_value_t = Difficulty::Medium)]
        difficulty: Difficulty,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Status => {
            show_status()?;
        }
        Commands::Retrieve { query, document, k } => {
            retrieve_chunks(&query, &document, k.map(usize::from)).await?;
        }
        Commands::Ask {
            question,
            document,
            html,
        } => {
            ask_question(&question, document.as_deref(), html).await?;
        }
        Commands::Exercise {
            topic,
            document,
            kind,
            count,
            difficulty,
        } => {
            let request = ExerciseRequest {
                topic,
                kind,
                count: usize::from(count),
                difficulty,
            };
            generate_exercise(request, document.as_deref()).await?;
        }
        Commands::Notes {
            topic,
            document,
            count,
            difficulty,
        } => {
            generate_notes(&topic, usize::from(count), difficulty, document.as_deref()).await?;
        }
    }

    Ok(())
}
