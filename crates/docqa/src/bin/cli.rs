//! docqa command line: ingest documents, ask questions and rate the sources
//!
//! Run with: cargo run -p docqa --features cli --bin docqa -- ask "..."

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use docqa::server::RagServer;
use docqa::types::{QueryResponse, QueryStatus};
use docqa::{DocQaService, FeedbackCollector, RagConfig, Rating};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents and teach it which sources are wrong")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy files into the document store and rebuild the index
    Ingest {
        /// Files to add; with none, the existing store is re-indexed
        files: Vec<PathBuf>,
    },
    /// Ask a question, then rate each source
    Ask {
        /// The question
        question: String,

        /// Number of sources to retrieve
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the answer without asking for ratings
        #[arg(long, default_value_t = false)]
        no_rate: bool,
    },
    /// Attach accepted feedback queries to their documents in the index
    Reinforce,
    /// Inspect the feedback log
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommand,
    },
    /// Run the HTTP server
    Serve,
}

#[derive(Subcommand)]
enum FeedbackCommand {
    /// Totals and conflicting verdicts
    Stats,
    /// Ratings that point at documents no longer in the index
    Orphans,
    /// Every rating as it was submitted
    Events,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var("DOCQA_CONFIG").ok().map(PathBuf::from));
    let config = RagConfig::load(config_path.as_deref())?;

    if let Commands::Serve = cli.command {
        return serve(config).await;
    }

    let service = DocQaService::from_config(config)?;

    // Ingest rebuilds on its own; loading the index first would only build it twice
    if let Commands::Ingest { files } = cli.command {
        return ingest(&service, files).await;
    }

    let spinner = spinner("Loading index...");
    let built = service.start().await;
    spinner.finish_and_clear();
    if let Some(summary) = built? {
        println!(
            "Built index: {} documents, {} chunks",
            summary.documents, summary.chunks
        );
    }

    match cli.command {
        Commands::Ask {
            question,
            top_k,
            no_rate,
        } => ask(&service, &question, top_k, no_rate).await?,
        Commands::Reinforce => {
            let spinner = spinner("Embedding accepted feedback...");
            let summary = service.reinforce().await;
            spinner.finish_and_clear();
            let summary = summary?;
            println!(
                "Reinforced {} source(s) from {} queries ({} skipped) in {}ms",
                summary.reinforcements, summary.queries, summary.skipped, summary.duration_ms
            );
        }
        Commands::Feedback { command } => match command {
            FeedbackCommand::Stats => {
                let stats = service.feedback_stats();
                println!("Feedback log: {}", service.feedback_location());
                println!("  queries:   {}", stats.queries);
                println!("  accepted:  {}", stats.accepted);
                println!("  rejected:  {}", stats.rejected);
                println!("  conflicts: {}", stats.conflicts);
            }
            FeedbackCommand::Orphans => {
                let orphans = service.orphaned_feedback().await?;
                if orphans.is_empty() {
                    println!("No orphaned feedback.");
                }
                for orphan in orphans {
                    let verdict = if orphan.rejected { "rejected" } else { "accepted" };
                    println!("{:?} -> {} ({})", orphan.query, orphan.id, verdict);
                }
            }
            FeedbackCommand::Events => {
                for event in service.feedback_events().await? {
                    let page = event.page.map(|p| format!(" p.{}", p)).unwrap_or_default();
                    let verdict = match event.verdict {
                        Rating::Accepted => "yes",
                        Rating::Rejected => "no",
                        Rating::Unrated => "-",
                    };
                    println!(
                        "{} {:<3} {}{} {:?}",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        verdict,
                        event.document_id,
                        page,
                        event.query
                    );
                }
            }
        },
        Commands::Serve | Commands::Ingest { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(config: RagConfig) -> Result<()> {
    let server = RagServer::new(config).await?;
    println!("Serving on http://{}", server.address());
    server.start().await?;
    Ok(())
}

async fn ingest(service: &DocQaService, files: Vec<PathBuf>) -> Result<()> {
    let summary = if files.is_empty() {
        let spinner = spinner("Rebuilding index...");
        let summary = service.reingest().await;
        spinner.finish_and_clear();
        summary?
    } else {
        let mut uploads = Vec::with_capacity(files.len());
        for path in &files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .with_context(|| format!("{} has no file name", path.display()))?;
            let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            uploads.push((name, data));
        }

        let spinner = spinner("Storing files and rebuilding index...");
        let response = service.upload(uploads).await;
        spinner.finish_and_clear();
        let response = response?;
        for file in &response.files {
            println!("Stored {} ({} bytes)", file.filename, file.size);
        }
        response.reingest
    };

    println!(
        "Indexed {} documents into {} chunks ({} skipped) in {}ms",
        summary.documents, summary.chunks, summary.skipped, summary.duration_ms
    );
    for (name, reason) in &summary.failed {
        println!("  failed: {}: {}", name, reason);
    }
    if !summary.orphans.is_empty() {
        println!(
            "{} feedback rating(s) refer to chunks that no longer exist",
            summary.orphans.len()
        );
    }
    Ok(())
}

async fn ask(
    service: &DocQaService,
    question: &str,
    top_k: Option<usize>,
    no_rate: bool,
) -> Result<()> {
    let spinner = spinner("Thinking...");
    let response = service.ask(question, top_k).await;
    spinner.finish_and_clear();
    let response = response?;

    print_response(&response);

    if no_rate || response.sources.is_empty() {
        return Ok(());
    }

    let mut collector = FeedbackCollector::for_sources(question, &response.sources);
    let term = Term::stdout();
    for (n, source) in response.sources.iter().enumerate() {
        let rating = prompt_rating(&term, n + 1)?;
        collector.rate(&source.id, rating)?;
    }

    let outcome = service.submit(collector).await?;
    println!(
        "Saved feedback: {} accepted, {} rejected",
        outcome.newly_accepted, outcome.newly_rejected
    );
    if !outcome.conflicts.is_empty() {
        println!("{} source(s) now carry both verdicts", outcome.conflicts.len());
    }
    Ok(())
}

fn print_response(response: &QueryResponse) {
    let heading = Style::new().bold();
    let dim = Style::new().dim();
    let warn = Style::new().yellow();

    for warning in &response.warnings {
        println!("{}", warn.apply_to(warning));
    }

    match response.status {
        QueryStatus::NoResults => {
            println!("No matching documents found.");
            return;
        }
        QueryStatus::NoRelevantDocuments => {
            println!(
                "All {} matching document(s) were marked not relevant for this question.",
                response.suppressed
            );
            return;
        }
        QueryStatus::Answered => {}
    }

    println!("{}", heading.apply_to("Answer"));
    match (&response.answer, &response.answer_error) {
        (Some(answer), _) => println!("{}\n", answer),
        (None, Some(error)) => println!("{}\n", warn.apply_to(format!("No answer: {}", error))),
        (None, None) => println!(),
    }

    println!("{}", heading.apply_to("Sources"));
    for (n, source) in response.sources.iter().enumerate() {
        let page = source
            .page
            .map(|p| format!(", page {}", p))
            .unwrap_or_default();
        let cited = if response.cited.contains(&source.id) { " (cited)" } else { "" };
        println!(
            "[{}] {}{} {}{}",
            n + 1,
            source.source,
            page,
            dim.apply_to(format!("similarity {:.3}", source.similarity)),
            cited
        );
        println!("    {}", dim.apply_to(preview(&source.content, 200)));
    }
    if response.suppressed > 0 {
        println!(
            "{}",
            dim.apply_to(format!("{} source(s) hidden by earlier feedback", response.suppressed))
        );
    }
    println!();
}

fn prompt_rating(term: &Term, n: usize) -> Result<Rating> {
    loop {
        term.write_str(&format!("Is source [{}] relevant? [y/n/Enter to skip] ", n))?;
        let line = term.read_line()?;
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(Rating::Accepted),
            "n" | "no" => return Ok(Rating::Rejected),
            "" => return Ok(Rating::Unrated),
            _ => term.write_line("Please answer y, n, or press Enter")?,
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
