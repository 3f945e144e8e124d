//! soulmirror - personality questionnaire runner
//!
//! **Usage:**
//! ```bash
//! soulmirror list
//! soulmirror questions <id>
//! soulmirror take <id> [--export <file>] [--svg <file>]
//! soulmirror analyze <id> --answers <file> [--format text|json] [--svg <file>]
//! soulmirror validate [--definitions <file>]
//! ```
//!
//! Global options: `--config <file>`, `--seed <n>`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use soulmirror_common::chart::RadarGeometry;
use soulmirror_common::config::TomlConfig;
use soulmirror_common::session::{SessionState, TestSession};
use soulmirror_common::{AnalysisResult, AnswerSet, DefinitionRegistry, Engine};
use soulmirror_cli::{render_radar_svg, CliFormatter, ReportExport};
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "soulmirror", version)]
#[command(about = "Take personality questionnaires and generate archetype reports")]
struct Cli {
    /// Config file (overrides SOULMIRROR_CONFIG and the platform default)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed quote selection and chart jitter for reproducible reports
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available questionnaires
    List,

    /// Print the questions of a questionnaire
    Questions { id: String },

    /// Answer a questionnaire interactively
    Take {
        id: String,

        /// Save the report as JSON
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Save the radar chart as SVG
        #[arg(long, value_name = "FILE")]
        svg: Option<PathBuf>,
    },

    /// Generate a report from a JSON answer file ({"1": 3, "2": 5, ...})
    Analyze {
        id: String,

        #[arg(long, value_name = "FILE")]
        answers: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Save the radar chart as SVG
        #[arg(long, value_name = "FILE")]
        svg: Option<PathBuf>,
    },

    /// Check a definitions file and summarize the registry
    Validate {
        #[arg(long, value_name = "FILE")]
        definitions: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) =
        TomlConfig::resolve_with_source(cli.config.as_deref()).context("Failed to load config")?;
    init_tracing(&config)?;

    info!("Starting soulmirror v{}", env!("CARGO_PKG_VERSION"));
    // logged only now that the subscriber exists
    source.report();

    match cli.command {
        Command::Validate { definitions } => {
            let path = definitions.or_else(|| config.definitions.clone());
            validate(path.as_deref())
        }
        Command::List => {
            let engine = build_engine(&config, cli.seed)?;
            print!("{}", CliFormatter::format_catalog(engine.registry().catalog()));
            Ok(())
        }
        Command::Questions { id } => {
            let engine = build_engine(&config, cli.seed)?;
            warn_if_uncatalogued(&engine, &id);
            for question in engine.generate_questions(&id) {
                println!("{:>3}. {}", question.id, question.text);
            }
            Ok(())
        }
        Command::Take { id, export, svg } => {
            let engine = build_engine(&config, cli.seed)?;
            warn_if_uncatalogued(&engine, &id);
            take(&engine, &config, &id, export.as_deref(), svg.as_deref()).await
        }
        Command::Analyze {
            id,
            answers,
            format,
            svg,
        } => {
            let engine = build_engine(&config, cli.seed)?;
            warn_if_uncatalogued(&engine, &id);
            analyze(&engine, &id, &answers, format, svg.as_deref())
        }
    }
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.logging.file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn load_registry(definitions: Option<&Path>) -> Result<DefinitionRegistry> {
    match definitions {
        Some(path) => DefinitionRegistry::load(path)
            .with_context(|| format!("Failed to load definitions from {}", path.display())),
        None => DefinitionRegistry::builtin().context("Built-in definitions are invalid"),
    }
}

fn build_engine(config: &TomlConfig, seed: Option<u64>) -> Result<Engine> {
    let registry = load_registry(config.definitions.as_deref())?;
    let quote_policy = config.report.quote_policy(seed)?;
    let jitter = config.report.jitter_policy(seed);
    debug!(?quote_policy, ?jitter, "Report policies");

    Ok(Engine::new(Arc::new(registry))
        .with_quote_policy(quote_policy)
        .with_jitter(jitter))
}

fn analyze(
    engine: &Engine,
    id: &str,
    answers: &Path,
    format: OutputFormat,
    svg: Option<&Path>,
) -> Result<()> {
    let content = std::fs::read_to_string(answers)
        .with_context(|| format!("Failed to read {}", answers.display()))?;
    let answer_set: AnswerSet = serde_json::from_str(&content)
        .with_context(|| format!("Invalid answer file {}", answers.display()))?;

    let result = engine
        .synthesize_report(&answer_set, id)
        .with_context(|| format!("Failed to analyze answers for '{}'", id))?;
    match format {
        OutputFormat::Text => print!("{}", CliFormatter::format_report(&result)),
        OutputFormat::Json => {
            let export = ReportExport::new(id, title(engine, id), answer_set, result.clone());
            println!("{}", export.to_json()?);
        }
    }
    if let Some(path) = svg {
        write_svg(&result, path)?;
    }
    Ok(())
}

async fn take(
    engine: &Engine,
    config: &TomlConfig,
    id: &str,
    export: Option<&Path>,
    svg: Option<&Path>,
) -> Result<()> {
    let mut session = TestSession::new(id);
    session.start(engine)?;
    info!(session_id = %session.id(), questionnaire_id = id, "Interactive session");

    if let Some(entry) = engine.registry().test_config(id) {
        println!("{} {}\n{}", entry.icon, entry.title, entry.description);
    }
    println!("输入 1-5 作答，r 重新开始，q 退出。");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while session.state() == &SessionState::InProgress {
        let Some(question) = session.current_question() else {
            break;
        };
        print!(
            "{}{}\n> ",
            CliFormatter::format_question(question, session.progress().total),
            CliFormatter::format_progress(&session.progress())
        );
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            bail!("Input closed before the questionnaire was finished");
        };
        let line = line?;
        match line.trim() {
            "q" => {
                println!("已退出。");
                return Ok(());
            }
            "r" => {
                session.restart(engine)?;
                println!("已重新开始。");
            }
            input => match input.parse::<u8>() {
                Ok(value) => {
                    if let Err(e) = session.answer_current(value) {
                        println!("{}", e);
                    }
                }
                Err(_) => println!("请输入 1 到 5 之间的数字。"),
            },
        }
    }

    println!("\n正在分析你的潜意识……");
    tokio::time::sleep(config.report.analyzing_delay()).await;

    let result = session.analyze(engine)?.clone();
    print!("{}", CliFormatter::format_report(&result));

    if let Some(path) = export {
        let report = ReportExport::new(id, title(engine, id), session.answers().clone(), result.clone());
        report
            .export_json(path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        println!("\n✓ Report exported to: {}", path.display());
    }
    if let Some(path) = svg {
        write_svg(&result, path)?;
    }
    Ok(())
}

fn validate(definitions: Option<&Path>) -> Result<()> {
    let registry = load_registry(definitions)?;

    println!("Definitions:");
    for id in registry.definition_ids() {
        let definition = registry.definition(id)?;
        println!(
            "  {:20} {} ({} quotes)",
            id,
            definition.dimensions().join(" / "),
            definition.quotes().len()
        );
    }

    println!("Catalog:");
    for entry in registry.catalog() {
        let source = if registry.has_own_definition(&entry.id) {
            "own definition"
        } else {
            "default definition"
        };
        println!(
            "  {:20} {} questions, {}",
            entry.id,
            registry.bank(&entry.id).len(),
            source
        );
    }

    println!("✓ Registry is valid");
    Ok(())
}

fn title<'a>(engine: &'a Engine, id: &str) -> Option<&'a str> {
    engine.registry().test_config(id).map(|t| t.title.as_str())
}

fn warn_if_uncatalogued(engine: &Engine, id: &str) {
    if engine.registry().test_config(id).is_none() {
        warn!(questionnaire_id = id, "Questionnaire is not in the catalog; using default definition");
    }
}

fn write_svg(result: &AnalysisResult, path: &Path) -> Result<()> {
    let svg = render_radar_svg(&result.radar_chart, &RadarGeometry::default());
    std::fs::write(path, svg)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;
    println!("✓ Radar chart written to: {}", path.display());
    Ok(())
}
