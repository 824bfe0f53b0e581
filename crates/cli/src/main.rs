//! Labboard CLI
//!
//! Terminal front end for the Labboard research backend: streams a
//! research run live into the terminal and manages saved reports.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use labboard_core::api::{ApiClient, RegenerateRequest, ResearchRequest, TranslateRequest};
use labboard_core::config::LabConfig;
use labboard_core::session::{
    CharacterRole, ChatMessage, MessageKind, SessionCallbacks, StreamSessionManager,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Labboard - Virtual Lab research client")]
struct Args {
    /// Backend base URL (overrides LABBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a research run and print the lab's discussion live
    Run {
        /// Research topic
        topic: String,
        /// Free-text constraints for the pipeline
        #[arg(short, long, default_value = "")]
        constraints: String,
        /// Write the final report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List saved reports
    Reports,
    /// Print one saved report
    Show { filename: String },
    /// Delete a saved report
    Delete { filename: String },
    /// Regenerate one section of a saved report
    Regenerate {
        filename: String,
        /// Section title to rewrite
        #[arg(short, long)]
        section: String,
        /// Feedback steering the rewrite
        #[arg(short, long)]
        feedback: String,
    },
    /// Translate a saved report to English
    Translate { filename: String },
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = match &args.api_url {
        Some(url) => LabConfig::with_base_url(url.clone()),
        None => LabConfig::from_env(),
    };
    let api = ApiClient::new(&config);

    match args.command {
        Command::Run {
            topic,
            constraints,
            output,
        } => run(api, topic, constraints, output).await,
        Command::Reports => reports(api).await,
        Command::Show { filename } => show(api, &filename).await,
        Command::Delete { filename } => delete(api, &filename).await,
        Command::Regenerate {
            filename,
            section,
            feedback,
        } => regenerate(api, &filename, section, feedback).await,
        Command::Translate { filename } => translate(api, &filename).await,
        Command::Health => health(api).await,
    }
}

async fn run(
    api: ApiClient,
    topic: String,
    constraints: String,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("🧬 Topic: {topic}");
    if !constraints.is_empty() {
        println!("   Constraints: {constraints}");
    }

    let mut manager = StreamSessionManager::new(api);
    let mut state = manager.subscribe();
    let callbacks = SessionCallbacks::new()
        .on_complete(|_, filename| {
            if let Some(filename) = filename {
                println!("\n💾 Report saved on the backend as {filename}");
            }
        })
        .on_error(|error| {
            println!("\n❌ {error}");
        });
    manager.start(
        ResearchRequest::new(topic).with_constraints(constraints),
        callbacks,
    )?;

    let mut last_printed = 0;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                for message in snapshot.chat_log.iter() {
                    if message.id > last_printed {
                        print_message(message);
                        last_printed = message.id;
                    }
                }
                if !snapshot.is_streaming {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                manager.cancel();
                println!("\n🛑 Cancelled");
                return Ok(());
            }
        }
    }

    let final_state = manager.snapshot();
    if let Some(error) = &final_state.error {
        bail!("research run failed: {error}");
    }
    match final_state.final_report {
        Some(report) => match output {
            Some(path) => {
                tokio::fs::write(&path, &report)
                    .await
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                println!("📄 Report written to {}", path.display());
            }
            None => println!("\n{report}"),
        },
        None => println!("⚠️  The stream ended without a final report."),
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let icon = match message.kind {
        MessageKind::Phase => "📍",
        MessageKind::Decision => "⚖️ ",
        MessageKind::System => "•",
        MessageKind::Agent => match message.role {
            CharacterRole::Pi => "👔",
            CharacterRole::Critic => "🔍",
            CharacterRole::Specialist => "🔬",
        },
    };
    println!("{icon} [{}] {}", message.name, message.message);
    if let Some(scores) = &message.scores {
        let mut entries: Vec<_> = scores.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (rubric, score) in entries {
            println!("      {rubric}: {score}");
        }
    }
}

async fn reports(api: ApiClient) -> Result<()> {
    let reports = api.list_reports().await?;
    if reports.is_empty() {
        println!("No saved reports yet. Run a research session first.");
        return Ok(());
    }
    println!("{:<48} {:>10}  CREATED", "FILENAME", "SIZE");
    for report in reports {
        let created = report
            .created
            .map(|c| c.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<48} {:>10}  {created}",
            report.filename,
            format_size(report.size)
        );
    }
    Ok(())
}

async fn show(api: ApiClient, filename: &str) -> Result<()> {
    let report = api.get_report(filename).await?;
    println!("{}", report.content);
    Ok(())
}

async fn delete(api: ApiClient, filename: &str) -> Result<()> {
    api.delete_report(filename).await?;
    println!("🗑️  Deleted {filename}");
    Ok(())
}

async fn regenerate(
    api: ApiClient,
    filename: &str,
    section: String,
    feedback: String,
) -> Result<()> {
    let report = api.get_report(filename).await?;
    let response = api
        .regenerate_section(&RegenerateRequest {
            section,
            feedback,
            current_report: report.content,
        })
        .await?;
    println!("✏️  {} ({})", response.message, response.section);
    println!("\n{}", response.updated_report);
    Ok(())
}

async fn translate(api: ApiClient, filename: &str) -> Result<()> {
    let report = api.get_report(filename).await?;
    let response = api
        .translate_report(&TranslateRequest {
            content: report.content,
        })
        .await?;
    if let Some(message) = response.message {
        println!("🌐 {message}");
    }
    println!("{}", response.translated);
    Ok(())
}

async fn health(api: ApiClient) -> Result<()> {
    let status = api.health().await?;
    println!("✅ Backend at {} is {}", api.base_url(), status.status);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}
