use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use griha_rag::{RagConfig, RagEngine, RagError, Result};

#[derive(Parser)]
#[command(name = "griha", about = "Question answering over a buy-vs-rent property analysis", version)]
struct Cli {
    /// Path to a JSON config file. Defaults apply when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the analysis CSV path from the config.
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Route FILTER questions through the SQL compiler.
    #[arg(long, global = true)]
    sql: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question and exit.
    Ask { query: Vec<String> },
    /// Interactive question loop.
    Repl,
    /// Print table statistics and knowledge index size.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };
    if let Some(csv) = cli.csv {
        config.table.csv_path = csv;
    }
    if cli.sql {
        config.retrieval.use_sql_compiler = true;
    }

    // The key lives only in the environment, never in the config file.
    let api_key = std::env::var("GRIHA_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok();

    let engine = RagEngine::new(config, api_key)?;

    match cli.command {
        Command::Ask { query } => {
            let query = query.join(" ");
            if query.trim().is_empty() {
                return Err(RagError::Config("empty query".to_string()));
            }
            let response = engine.answer(&query).await?;
            println!("{}", response.answer);
        }
        Command::Repl => {
            print_banner(&engine)?;
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            loop {
                write!(stdout, "griha> ")?;
                stdout.flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if query == "exit" || query == "quit" {
                    break;
                }
                match engine.answer(query).await {
                    Ok(response) => {
                        println!("[{}]", response.intent);
                        println!("{}\n", response.answer);
                    }
                    Err(e) => eprintln!("error: {e}\n"),
                }
            }
        }
        Command::Stats => print_banner(&engine)?,
    }

    Ok(())
}

fn print_banner(engine: &RagEngine) -> Result<()> {
    let stats = engine.stats()?;
    println!("Properties analyzed: {}", stats.total);
    if let Some(avg) = stats.avg_price {
        println!("Average price: {:.0}", avg);
    }
    if let Some(avg) = stats.avg_area {
        println!("Average area: {:.0} sqft", avg);
    }
    println!("Knowledge entries: {}", engine.knowledge_len());
    println!(
        "Generation: {}",
        if engine.is_online() { "online" } else { "offline (no API key)" }
    );
    Ok(())
}
