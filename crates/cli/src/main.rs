//! PromptForge CLI — the main entry point.
//!
//! Commands:
//! - `compile`   — Clarify an idea into a final prompt, then refine it
//! - `assemble`  — Print the layered instruction text for a scenario
//! - `classify`  — Guess the scenario for an idea
//! - `index`     — Segment, embed and store a document
//! - `search`    — Query the stored segments
//! - `config`    — Print or validate configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promptforge",
    about = "PromptForge — turn vague ideas into structured, reusable prompts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clarify an idea through questions and compile a final prompt
    Compile {
        /// The initial idea (asked for interactively when omitted)
        idea: Option<String>,

        /// Final prompt layout: standard, langgpt, costar, structured
        #[arg(short, long)]
        framework: Option<String>,

        /// Turn at which a final prompt is forced
        #[arg(long)]
        max_turns: Option<u32>,

        /// Scenario id (overrides config)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Persona id
        #[arg(short, long)]
        persona: Option<String>,

        /// Pick scenario, persona and template from the idea's keywords
        #[arg(long)]
        auto: bool,

        /// Use the stored corpus for reference material
        #[arg(long)]
        retrieval: bool,
    },

    /// Print the assembled instruction text
    Assemble {
        #[arg(short, long)]
        scenario: Option<String>,

        #[arg(short, long)]
        persona: Option<String>,

        #[arg(short, long)]
        template: Option<String>,

        /// Verbosity level 1-10
        #[arg(long)]
        verbosity: Option<u8>,

        /// Extra instructions appended after the verbosity layer
        #[arg(long)]
        custom: Option<String>,

        /// Only print the first lines of each static layer
        #[arg(long)]
        skeleton: bool,

        /// List available scenarios, personas, templates and skills
        #[arg(long)]
        list: bool,
    },

    /// Guess the best scenario for an idea
    Classify {
        idea: String,
    },

    /// Add a document to the retrieval corpus
    Index {
        file: PathBuf,

        /// Remove every stored segment first
        #[arg(long)]
        clear: bool,
    },

    /// Search the retrieval corpus
    Search {
        query: String,

        /// Number of hits
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only segments whose `source` metadata equals this value
        #[arg(long)]
        source: Option<String>,
    },

    /// Print the default configuration, or validate the current one
    Config {
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            idea,
            framework,
            max_turns,
            scenario,
            persona,
            auto,
            retrieval,
        } => {
            commands::compile::run(commands::compile::CompileArgs {
                idea,
                framework,
                max_turns,
                scenario,
                persona,
                auto,
                retrieval,
            })
            .await?
        }
        Commands::Assemble {
            scenario,
            persona,
            template,
            verbosity,
            custom,
            skeleton,
            list,
        } => commands::assemble::run(commands::assemble::AssembleArgs {
            scenario,
            persona,
            template,
            verbosity,
            custom,
            skeleton,
            list,
        })?,
        Commands::Classify { idea } => commands::classify::run(&idea)?,
        Commands::Index { file, clear } => commands::index::run(&file, clear).await?,
        Commands::Search {
            query,
            limit,
            source,
        } => commands::index::search(&query, limit, source).await?,
        Commands::Config { validate } => {
            if validate {
                commands::config_cmd::validate()?
            } else {
                commands::config_cmd::show()
            }
        }
    }

    Ok(())
}
