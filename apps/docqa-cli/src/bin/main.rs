use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use docqa_core::config::{AppConfig, Config};
use docqa_rag::eval::{default_cases, load_cases};
use docqa_rag::{answer::render_error, AnswerGenerator, ChatLog, Services};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about a folder of PDFs, fully offline", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration environment (dev, prod, test); defaults to RUST_ENV
    #[arg(long, global = true, env = "RUST_ENV")]
    config_env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk and index every PDF in a directory
    Ingest {
        /// PDF directory (defaults to data.pdf_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Clear the collection before ingesting
        #[arg(long)]
        reset: bool,
    },

    /// Answer one question
    Ask {
        question: String,

        /// Also print the retrieved chunks
        #[arg(short, long)]
        sources: bool,

        /// Do not record the interaction in the chat log
        #[arg(long)]
        no_log: bool,
    },

    /// Answer questions read line by line from stdin
    Chat {
        #[arg(long)]
        no_log: bool,
    },

    /// Score answers against expected answers
    Eval {
        /// JSON file of {question, expected} cases (defaults to the built-in set)
        #[arg(short, long)]
        cases: Option<PathBuf>,

        /// Write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Browse or clear the chat log
    #[command(subcommand)]
    History(HistoryCommands),

    /// Show index location and entry count
    Status,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List interactions, newest first
    List,
    /// Print one interaction
    Show { file: PathBuf },
    /// Delete every log file
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    docqa_core::logging::init("info,lance=warn,lancedb=warn");
    let cli = Cli::parse();
    let config = Config::load_for_env(cli.config_env.as_deref())?;
    let settings = config.settings()?;
    tracing::debug!(env = config.env_name(), "configuration loaded");

    match cli.command {
        Commands::Ingest { dir, reset } => ingest(settings, dir, reset).await,
        Commands::Ask { question, sources, no_log } => ask(settings, &question, sources, no_log).await,
        Commands::Chat { no_log } => chat(settings, no_log).await,
        Commands::Eval { cases, output } => eval(settings, cases, output).await,
        Commands::History(cmd) => history(&settings, cmd),
        Commands::Status => status(&settings).await,
    }
}

async fn ingest(settings: AppConfig, dir: Option<PathBuf>, reset: bool) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.data.pdf_dir.clone());
    let services = Services::open(settings).await?;
    if reset {
        services.index().reset().await?;
    }
    let report = services.ingestor()?.with_progress(true).ingest_dir(&dir).await?;
    println!("Ingested {} documents into {} chunks from {}", report.documents, report.chunks, dir.display());
    for name in &report.empty {
        println!("  no text: {name}");
    }
    for failure in &report.failures {
        println!("  failed:  {} ({})", failure.document, failure.reason);
    }
    println!("Index now holds {} chunks", services.index().count().await?);
    Ok(())
}

async fn ask(settings: AppConfig, question: &str, show_sources: bool, no_log: bool) -> Result<()> {
    let log = if no_log { None } else { Some(ChatLog::open(&settings.history.dir)?) };
    let services = Services::open(settings).await?;
    let answers = services.load_answer_generator().await?;
    let text = match answers.answer(question).await {
        Ok(answer) => {
            println!("{}", answer.text);
            if show_sources {
                for (i, chunk) in answer.sources.iter().enumerate() {
                    println!("\n[{}] {} (distance {:.4})\n{}", i + 1, chunk.source, chunk.distance, chunk.text);
                }
            }
            answer.text
        }
        Err(e) => {
            let text = render_error(&e);
            println!("{text}");
            text
        }
    };
    if let Some(log) = log {
        log.save(question, &text)?;
    }
    Ok(())
}

async fn chat(settings: AppConfig, no_log: bool) -> Result<()> {
    let log = if no_log { None } else { Some(ChatLog::open(&settings.history.dir)?) };
    let services = Services::open(settings).await?;
    let answers: AnswerGenerator = services.load_answer_generator().await?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        let text = answers.generate_answer(question).await;
        stdout.write_all(format!("{text}\n").as_bytes()).await?;
        if let Some(log) = &log {
            if let Err(e) = log.save(question, &text) {
                tracing::warn!(error = %e, "could not save chat log");
            }
        }
    }
    Ok(())
}

async fn eval(settings: AppConfig, cases: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let cases = match cases.or_else(|| settings.evaluation.cases_file.clone()) {
        Some(path) => load_cases(&path)?,
        None => default_cases(),
    };
    let services = Services::open(settings).await?;
    let answers = Arc::new(services.load_answer_generator().await?);
    let report = services.evaluator(answers).run(&cases).await?;

    for row in &report.rows {
        let mark = if row.pass { "PASS" } else { "FAIL" };
        println!("{mark} {:.2}  {}", row.similarity, row.question);
        println!("      expected: {}", row.expected);
        println!("      answer:   {}", row.answer);
    }
    println!(
        "\n{}/{} passed at threshold {:.2} (mean similarity {:.2})",
        report.passed,
        report.total(),
        report.threshold,
        report.mean_similarity
    );
    if let Some(path) = output {
        report.write_json(&path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn history(settings: &AppConfig, cmd: HistoryCommands) -> Result<()> {
    let log = ChatLog::open(&settings.history.dir)?;
    match cmd {
        HistoryCommands::List => {
            for path in log.list()? {
                let entry = log.load(&path)?;
                let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                println!("{name}  {}  {}", entry.timestamp, entry.question);
            }
        }
        HistoryCommands::Show { file } => {
            let entry = log.load(&file)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        HistoryCommands::Clear => {
            let removed = log.clear()?;
            println!("Removed {removed} log files from {}", log.dir().display());
        }
    }
    Ok(())
}

async fn status(settings: &AppConfig) -> Result<()> {
    let index = docqa_vector::open_index(&settings.index, settings.embedding.dimension).await?;
    println!("Index path:  {}", settings.index.path.display());
    println!("Collection:  {}", settings.index.collection);
    println!("Chunks:      {}", index.count().await?);
    Ok(())
}
