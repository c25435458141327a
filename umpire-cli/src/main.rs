//! Umpire CLI - netlist validation and prompt rendering from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use umpire::analyzer::rules::rule_ids;
use umpire::{
    build_correction_prompt, build_generation_prompt, load_goals_from_file,
    load_library_from_file, parse_goal_assignment, CheckOptions, Diagnostic, Evaluation, Goals,
    RoleVocabulary, Severity, Umpire, UmpireError,
};

#[derive(Parser)]
#[command(name = "umpire")]
#[command(about = "Netlist validation for generated analog circuits", long_about = None)]
#[command(version)]
struct Cli {
    /// Show more detail and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a netlist file (raw JSON or generator output with a ```json block)
    Check {
        /// Path to the netlist file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Also write the feedback document to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Exit with error code if problems found at this severity or higher
        #[arg(long, value_enum)]
        fail_on: Option<FailOnSeverity>,

        /// Only run these rules (comma separated ids, e.g. C1,K1)
        #[arg(long, value_delimiter = ',')]
        rules: Vec<String>,

        /// Warnings also reject the netlist
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        goals: GoalArgs,

        #[command(flatten)]
        library: LibraryArgs,
    },

    /// List the block types of the active library
    Library {
        #[command(flatten)]
        library: LibraryArgs,
    },

    /// List available validation rules
    Rules,

    /// Render prompts for the generator
    Prompt {
        #[command(subcommand)]
        action: PromptCommand,
    },
}

#[derive(Subcommand)]
enum PromptCommand {
    /// Initial generation prompt for a user specification
    Generate {
        /// File holding the user's circuit specification
        #[arg(long, value_name = "FILE")]
        specs: PathBuf,

        #[command(flatten)]
        library: LibraryArgs,
    },

    /// Check a previous generator output and render the correction prompt
    Correct {
        /// File holding the previous generator output
        #[arg(value_name = "PREVIOUS_OUTPUT")]
        previous_output: PathBuf,

        #[command(flatten)]
        goals: GoalArgs,

        #[command(flatten)]
        library: LibraryArgs,
    },
}

#[derive(Args)]
struct LibraryArgs {
    /// Component library JSON file (defaults to the built-in analog blocks)
    #[arg(long, value_name = "FILE")]
    library: Option<PathBuf>,
}

#[derive(Args)]
struct GoalArgs {
    /// Design goal as key=value (repeatable), e.g. inputType=differential
    #[arg(long = "goal", value_name = "KEY=VALUE")]
    goal: Vec<String>,

    /// JSON file with design goals
    #[arg(long = "goals", value_name = "FILE")]
    goals_file: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// The Markdown feedback document
    Markdown,
    /// JSON output for CI/CD
    Json,
}

#[derive(Clone, ValueEnum)]
enum FailOnSeverity {
    /// Fatal and error diagnostics (and warnings with --strict)
    Error,
    /// Any diagnostic
    Warning,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check {
            file,
            format,
            output,
            fail_on,
            rules,
            strict,
            goals,
            library,
        } => {
            let options = CheckOptions {
                rules,
                strict_mode: strict,
            };
            handle_check(&file, format, output.as_deref(), fail_on, options, &goals, &library)
        }
        Commands::Library { library } => handle_library(&library, cli.verbose),
        Commands::Rules => handle_rules(cli.verbose),
        Commands::Prompt { action } => match action {
            PromptCommand::Generate { specs, library } => handle_generate(&specs, &library),
            PromptCommand::Correct {
                previous_output,
                goals,
                library,
            } => handle_correct(&previous_output, &goals, &library),
        },
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_umpire(args: &LibraryArgs) -> Result<Umpire, UmpireError> {
    match &args.library {
        Some(path) => {
            let library = load_library_from_file(path, &RoleVocabulary::default())?;
            Ok(Umpire::new(library))
        }
        None => Umpire::with_builtin_library(),
    }
}

fn load_goals(args: &GoalArgs) -> Result<Goals, UmpireError> {
    let mut goals = match &args.goals_file {
        Some(path) => load_goals_from_file(path)?,
        None => Goals::new(),
    };
    for assignment in &args.goal {
        let (key, value) = parse_goal_assignment(assignment)?;
        goals.insert(key, value);
    }
    Ok(goals)
}

fn read_input(path: &Path) -> Result<String, UmpireError> {
    Ok(std::fs::read_to_string(path)?)
}

fn handle_check(
    file: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    fail_on: Option<FailOnSeverity>,
    options: CheckOptions,
    goal_args: &GoalArgs,
    library_args: &LibraryArgs,
) -> i32 {
    let prepared = load_umpire(library_args).and_then(|umpire| {
        let goals = load_goals(goal_args)?;
        let text = read_input(file)?;
        Ok((umpire.with_options(options)?, goals, text))
    });
    let (umpire, goals, text) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let evaluation = umpire.evaluate_text(&text, &goals);
    tracing::debug!(
        "{}: {} fatal, {} error, {} warning",
        file.display(),
        evaluation.stats.fatal,
        evaluation.stats.error,
        evaluation.stats.warning
    );

    if let Some(path) = output {
        if let Err(e) = std::fs::write(path, &evaluation.feedback.document) {
            eprintln!("Error: Failed to write {}: {}", path.display(), e);
            return 1;
        }
    }

    let printed = match format {
        OutputFormat::Human => {
            output_human(file, &umpire, &evaluation);
            Ok(())
        }
        OutputFormat::Markdown => {
            print!("{}", evaluation.feedback.document);
            Ok(())
        }
        OutputFormat::Json => output_json(file, &evaluation),
    };
    if let Err(e) = printed {
        eprintln!("Error: {}", e);
        return 1;
    }

    match fail_on {
        Some(severity) if should_fail(&evaluation, &severity) => 1,
        _ => 0,
    }
}

fn should_fail(evaluation: &Evaluation, severity: &FailOnSeverity) -> bool {
    match severity {
        FailOnSeverity::Error => !evaluation.accepted,
        FailOnSeverity::Warning => !evaluation.stats.is_clean(),
    }
}

fn output_human(file: &Path, umpire: &Umpire, evaluation: &Evaluation) {
    println!("\nFile: {}", file.display());
    println!("{}", "─".repeat(60));

    if evaluation.stats.is_clean() {
        println!("  No problems found");
        println!("\n  Result: PASS");
        return;
    }

    for level in [Severity::Fatal, Severity::Error, Severity::Warning] {
        let at_level: Vec<&Diagnostic> = evaluation
            .diagnostics
            .iter()
            .filter(|d| d.level == level)
            .collect();
        if at_level.is_empty() {
            continue;
        }
        println!("\n  {}:", level);
        for diagnostic in at_level {
            let explanation = umpire.explain(diagnostic);
            println!("    - [{}] {}: {}", diagnostic.rule_id, explanation.title, explanation.problem);
            println!("      Location: {}", explanation.location);
            println!("      Fix: {}", explanation.fix);
        }
    }

    println!("\n  Summary:");
    println!("    Fatal:   {}", evaluation.stats.fatal);
    println!("    Error:   {}", evaluation.stats.error);
    println!("    Warning: {}", evaluation.stats.warning);
    println!(
        "\n  Result: {}",
        if evaluation.accepted { "ACCEPTED" } else { "REJECTED" }
    );
}

fn output_json(file: &Path, evaluation: &Evaluation) -> Result<(), serde_json::Error> {
    let output = serde_json::json!({
        "file": file.display().to_string(),
        "passed": evaluation.passed(),
        "accepted": evaluation.accepted,
        "stats": evaluation.stats,
        "diagnostics": evaluation.diagnostics,
        "feedback": evaluation.feedback.document,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn handle_library(args: &LibraryArgs, verbose: bool) -> i32 {
    let umpire = match load_umpire(args) {
        Ok(umpire) => umpire,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!("Available block types:\n");
    for (block_type, spec) in umpire.library().iter() {
        let roles: Vec<&str> = spec.roles.iter().map(String::as_str).collect();
        println!(
            "  {:<22} {:<5} {}",
            block_type,
            spec.device_type.to_string(),
            roles.join(", ")
        );
        if verbose {
            if !spec.description.is_empty() {
                println!("      {}", spec.description);
            }
            for (terminal, kind) in &spec.terminals {
                println!("      {:<12} {}", terminal, kind);
            }
            println!();
        }
    }
    0
}

fn handle_rules(verbose: bool) -> i32 {
    let umpire = match Umpire::with_builtin_library() {
        Ok(umpire) => umpire,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!("Available validation rules:\n");
    for rule in umpire.rules() {
        if verbose {
            println!("  {:<6} {}", rule.id(), rule.name());
            println!("         {}", rule.description());
            println!("         Category: {}\n", rule.category());
        } else {
            println!("  {:<6} {}", rule.id(), rule.name());
        }
    }

    if verbose {
        println!("Sanity checks (always run first, FATAL):\n");
        let checks = [
            (rule_ids::UNPARSEABLE, "No JSON netlist could be extracted"),
            (rule_ids::NOT_A_LIST, "Netlist is not a non-empty array"),
            (rule_ids::NOT_A_RECORD, "An entry is not an object"),
            (rule_ids::MALFORMED_RECORD, "A record lacks id, block_type or connections"),
            (rule_ids::UNKNOWN_BLOCK, "A block type is not in the library"),
            (rule_ids::DUPLICATE_ID, "Two components share an id"),
        ];
        for (id, description) in checks {
            println!("  {:<6} {}", id, description);
        }
    }
    0
}

fn handle_generate(specs: &Path, args: &LibraryArgs) -> i32 {
    let rendered = load_umpire(args).and_then(|umpire| {
        let specs = read_input(specs)?;
        Ok(build_generation_prompt(umpire.library(), &specs)?)
    });
    match rendered {
        Ok(prompt) => {
            println!("{}", prompt);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_correct(previous_output: &Path, goal_args: &GoalArgs, library_args: &LibraryArgs) -> i32 {
    let rendered = load_umpire(library_args).and_then(|umpire| {
        let goals = load_goals(goal_args)?;
        let previous = read_input(previous_output)?;
        let evaluation = umpire.evaluate_text(&previous, &goals);
        if evaluation.passed() {
            tracing::info!("Previous output passed; nothing to correct");
            return Ok(evaluation.feedback.document);
        }
        Ok(build_correction_prompt(
            umpire.library(),
            &previous,
            &evaluation.feedback,
        )?)
    });
    match rendered {
        Ok(text) => {
            println!("{}", text.trim_end());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
