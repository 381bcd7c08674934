//! Evaluation Harness CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use answer_oracle::AnswerOracle;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eval_harness::{
    agents::create_agent,
    analysis::{answer_key, merge_runs, reevaluate, refresh_standard_answers, summarize},
    config::Config,
    dataset::{load_qa_pairs, parse_indices, select_indices},
    evaluation::{extract_answer, EvaluationLog},
    reporting::{print_console_report, print_flipped, print_reevaluation_report, JsonSummary},
    runner::{ConsoleProgress, Executor, ExecutorConfig},
};

#[derive(Parser)]
#[command(name = "eval-harness")]
#[command(about = "Evaluate data-query agents against standard answers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one standard answer with one agent answer
    Compare {
        /// Standard answer
        standard: String,

        /// Agent answer; a full response is reduced to its answer first
        actual: String,
    },

    /// Ask the agent every question and log the verdicts
    Run {
        /// Question/answer file (text or JSON)
        #[arg(short, long)]
        answers: PathBuf,

        /// 1-based question selection, e.g. 1,2,5-9 (default: all)
        #[arg(short, long)]
        indices: Option<String>,

        /// Agent type recorded in the log (default: agent.name from config)
        #[arg(long)]
        agent_type: Option<String>,

        /// Number of questions in flight at once
        #[arg(long)]
        parallel: Option<usize>,

        /// Evaluation log to append to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-judge a log with the current oracle
    Reevaluate {
        /// Evaluation log to read
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the re-judged log (default: rewrite input after a backup)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace stale standard answers in a log and re-judge those records
    RefreshAnswers {
        /// Evaluation log to update in place
        #[arg(short, long)]
        input: PathBuf,

        /// Current question/answer file
        #[arg(short, long)]
        answers: PathBuf,

        /// Only touch records of this agent type
        #[arg(long)]
        agent_type: Option<String>,
    },

    /// Merge a separately numbered log into another
    Merge {
        /// Log whose ids are kept
        #[arg(long)]
        base: PathBuf,

        /// Log whose ids are shifted
        #[arg(long)]
        extra: PathBuf,

        /// Added to every id of the extra log
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Merged log path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize an evaluation log
    Report {
        /// Evaluation log to read (default: output.log_file from config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also write a JSON summary to this path
        #[arg(long)]
        json: Option<PathBuf>,

        /// Failed questions to list per agent
        #[arg(long, default_value = "10")]
        failures: usize,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/eval.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("eval_harness=debug,answer_oracle=debug,info")
    } else {
        EnvFilter::new("eval_harness=info,answer_oracle=warn,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Compare { standard, actual } => {
            let config = Config::load(config_path)?;
            compare_answers(&config, &standard, &actual);
        }

        Commands::Run {
            answers,
            indices,
            agent_type,
            parallel,
            output,
        } => {
            let mut config = Config::load(config_path)?;
            if let Some(name) = agent_type {
                config.agent.name = name;
            }
            if let Some(parallel) = parallel {
                config.runner.parallel_requests = parallel;
            }
            if let Some(output) = output {
                config.output.log_file = output.display().to_string();
            }
            run_evaluation(&config, &answers, indices.as_deref()).await?;
        }

        Commands::Reevaluate { input, output } => {
            let config = Config::load(config_path)?;
            reevaluate_log(&config, &input, output.as_deref())?;
        }

        Commands::RefreshAnswers {
            input,
            answers,
            agent_type,
        } => {
            let config = Config::load(config_path)?;
            refresh_answers(&config, &input, &answers, agent_type.as_deref())?;
        }

        Commands::Merge {
            base,
            extra,
            offset,
            output,
        } => {
            merge_logs(&base, &extra, offset, &output)?;
        }

        Commands::Report {
            input,
            json,
            failures,
        } => {
            let config = Config::load(config_path)?;
            let input = input.unwrap_or_else(|| PathBuf::from(&config.output.log_file));
            generate_report(&input, json.as_deref(), failures)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn compare_answers(config: &Config, standard: &str, actual: &str) {
    let oracle = AnswerOracle::new(config.oracle.clone());
    let answer = extract_answer(actual);
    let result = oracle.compare(standard, &answer);

    println!("Standard: {}", standard);
    println!("Actual:   {}", answer);
    if let Some(shape) = result.shape {
        println!("Shape:    {}", shape);
    }
    println!("Verdict:  {}", if result.matched { "MATCH" } else { "MISMATCH" });
    println!("Reason:   {}", result.reason);
}

async fn run_evaluation(
    config: &Config,
    answers: &Path,
    indices: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let started_at = Utc::now();
    let run_id = started_at.format("%Y%m%d-%H%M%S").to_string();

    println!("=== Answer Evaluation ===");
    println!("Run ID: {}", run_id);
    println!("Agent:  {} ({:?})", config.agent.name, config.agent.kind);
    println!();

    let mut pairs = load_qa_pairs(answers)?;
    if let Some(indices) = indices {
        pairs = select_indices(&pairs, &parse_indices(indices)?);
    }

    if pairs.is_empty() {
        eprintln!("Error: No questions to run");
        std::process::exit(1);
    }
    println!("Questions: {}", pairs.len());
    println!();

    let agent = create_agent(&config.agent)?;
    let log = EvaluationLog::new(&config.output.log_file);
    let history = log.read_existing()?;

    let executor_config = ExecutorConfig {
        save_full_response: config.output.save_full_response,
        ..ExecutorConfig::from(&config.runner)
    };
    let executor = Executor::new(agent, AnswerOracle::new(config.oracle.clone()), executor_config)
        .with_progress(Arc::new(ConsoleProgress));

    println!("Running evaluation...");
    let records = executor.execute(&pairs, &history).await;
    log.append_all(&records)?;

    let elapsed = Utc::now() - started_at;
    println!(
        "\nAppended {} records to {} in {}s",
        records.len(),
        log.path().display(),
        elapsed.num_seconds()
    );

    let summary = summarize(&records);
    print_console_report(&summary, 10);

    let summary_path = PathBuf::from(&config.output.output_dir)
        .join(&run_id)
        .join("summary.json");
    JsonSummary::from_summary(&run_id, &summary, log.path().display().to_string())
        .write_to_file(&summary_path)?;
    println!("Summary written to: {}", summary_path.display());

    Ok(())
}

fn reevaluate_log(
    config: &Config,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = EvaluationLog::new(input);
    let records = source.read_all()?;
    let oracle = AnswerOracle::new(config.oracle.clone());

    let summary = reevaluate(records, &oracle);
    print_reevaluation_report(&summary);

    let target = match output {
        Some(path) => EvaluationLog::new(path),
        None => {
            source.backup()?;
            source
        }
    };
    target.rewrite(&summary.records)?;
    println!("Re-evaluated log written to: {}", target.path().display());
    Ok(())
}

fn refresh_answers(
    config: &Config,
    input: &Path,
    answers: &Path,
    agent_type: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = EvaluationLog::new(input);
    let mut records = log.read_all()?;
    let key = answer_key(&load_qa_pairs(answers)?);
    let oracle = AnswerOracle::new(config.oracle.clone());

    let summary = refresh_standard_answers(&mut records, &key, agent_type, &oracle);
    println!("Matched questions: {}", summary.matched);
    println!("Updated answers:   {}", summary.updated);
    println!("Flipped verdicts:  {}", summary.flipped.len());
    print_flipped(&summary.flipped);

    if summary.updated == 0 {
        println!("\nNothing to update");
        return Ok(());
    }

    log.backup()?;
    log.rewrite(&records)?;
    println!("\nUpdated log written to: {}", log.path().display());
    Ok(())
}

fn merge_logs(
    base: &Path,
    extra: &Path,
    offset: usize,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = EvaluationLog::new(base).read_all()?;
    let extra = EvaluationLog::new(extra).read_all()?;
    let (base_len, extra_len) = (base.len(), extra.len());

    let merged = merge_runs(base, extra, offset);
    EvaluationLog::new(output).rewrite(&merged)?;

    println!(
        "Merged {} + {} records into {}",
        base_len,
        extra_len,
        output.display()
    );
    Ok(())
}

fn generate_report(
    input: &Path,
    json: Option<&Path>,
    failures: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = EvaluationLog::new(input).read_all()?;
    if records.is_empty() {
        println!("No records in {}", input.display());
        return Ok(());
    }

    let summary = summarize(&records);
    print_console_report(&summary, failures);

    if let Some(path) = json {
        let run_id = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        JsonSummary::from_summary(run_id, &summary, input.display().to_string()).write_to_file(path)?;
        println!("Summary written to: {}", path.display());
    }
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
