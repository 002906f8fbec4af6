use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use assist_cli::ProjectDir;
use clap::{Parser, Subcommand};
use webide_assist::logging::init_tracing;
use webide_assist::providers::{self, DEFAULT_PROVIDER_ID};
use webide_assist::{
    ActionScope, AssistConfig, AssistController, BufferId, Completed, RecordingTranscript,
    TranscriptEntry,
};

#[derive(Parser)]
#[command(author, version, about = "Drive AI edits on an index.html / styles.css / script.js project")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding the three files
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// JSON config file; environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model id to use instead of the configured one
    #[arg(long)]
    model: Option<String>,

    /// Print the request record as JSON after a successful run
    #[arg(long)]
    record: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question about the project without changing files
    Chat { message: String },
    /// Apply an instruction to one file or all three
    Agent {
        instruction: String,
        /// all, html, css, or js
        #[arg(long, default_value = "all")]
        scope: ActionScope,
    },
    /// Rewrite one file with an improved version
    Enhance {
        /// html, css, or js
        buffer: BufferId,
    },
    /// List available models
    Models,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = AssistConfig::load(cli.config.as_deref())?;
    let mut session = config.session()?;
    if let Some(model) = &cli.model {
        session.models_mut().select(model)?;
    }

    if session.credential().is_some() && !session.credential_looks_valid() {
        tracing::warn!("credential does not look like an OpenRouter key; sending it anyway");
    }

    let project = ProjectDir::new(&cli.project);
    let buffers = Arc::new(project.load()?);
    let transcript = Arc::new(RecordingTranscript::new());
    let provider = providers::provider_for_id(DEFAULT_PROVIDER_ID, &config)?;
    let controller = AssistController::new(provider, buffers.clone(), session)
        .with_transcript(transcript.clone());

    let record = match cli.command {
        Commands::Models => {
            let session = controller.session();
            for model in session.models().models() {
                let marker = if model.id == session.current_model().id { "*" } else { " " };
                println!("{marker} {:<45} {}", model.id, model.display_name);
            }
            return Ok(());
        }
        Commands::Chat { message } => {
            let result = controller.run_chat(&message).await;
            for entry in transcript.entries() {
                if let TranscriptEntry::Assistant(reply) = entry {
                    println!("{reply}");
                }
            }
            report(result)?.record
        }
        Commands::Agent { instruction, scope } => {
            let completed = report(controller.run_agent(&instruction, scope).await)?;
            project.save(buffers.as_ref(), &completed.value)?;
            if completed.value.is_empty() {
                println!("No files changed.");
            }
            for buffer in &completed.value {
                println!("updated {}", project.path_for(*buffer).display());
            }
            completed.record
        }
        Commands::Enhance { buffer } => {
            let result = controller.run_enhance(buffer).await;
            // Partial output from a failed stream stays in the buffer and is saved too.
            project.save_enhanced(buffers.as_ref(), buffer, &result)?;
            let completed = report(result)?;
            println!("enhanced {}", project.path_for(buffer).display());
            completed.record
        }
    };

    if cli.record {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn report<T>(
    result: Result<Completed<T>, webide_assist::AssistError>,
) -> Result<Completed<T>, Box<dyn Error>> {
    result.map_err(|error| {
        let failure = error.failure();
        eprintln!("{failure}");
        Box::new(error) as Box<dyn Error>
    })
}
