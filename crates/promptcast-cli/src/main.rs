use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use promptcast_cli::cli_args::{Cli, Command, ListArgs, RunArgs, ValidateArgs};
use promptcast_core::{
    ConfigError, LlmResponse, RunError, RunOptions, list_prompts,
    logging::{LoggingDestination, init_logging},
    run_prompt, validate_prompt,
};

/// One exit code per error domain so schedulers can tell failures apart.
const EXIT_CONFIG: u8 = 2;
const EXIT_LLM: u8 = 3;
const EXIT_DELIVERY: u8 = 4;

struct Failure {
    message: String,
    code: u8,
}

impl From<RunError> for Failure {
    fn from(err: RunError) -> Self {
        let code = match &err {
            RunError::Config(_) => EXIT_CONFIG,
            RunError::Llm(_) => EXIT_LLM,
            RunError::DeliveryFailed { .. } => EXIT_DELIVERY,
        };
        Failure {
            message: err.to_string(),
            code,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(err) = init_logging(logging_destination()) {
        eprintln!("Warning: failed to initialize logging: {err}");
    }

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("Error: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}

fn logging_destination() -> LoggingDestination {
    match std::env::var("PROMPTCAST_LOG_FILE").ok().as_deref() {
        Some("1") | Some("true") => LoggingDestination::FileAndStderr,
        _ => LoggingDestination::StderrOnly,
    }
}

fn dispatch(cli: Cli) -> Result<(), Failure> {
    match cli.command {
        Command::Run(args) => run(args),
        Command::List(args) => list(args),
        Command::Validate(args) => validate(args),
    }
}

fn run(args: RunArgs) -> Result<(), Failure> {
    let options = RunOptions {
        profile: args.profile,
        prompts_dir: args.prompts_dir,
        skip_delivery: args.no_delivery,
        ..RunOptions::default()
    };

    if args.dry_run {
        let spec = validate_prompt(&args.prompt, &options).map_err(config_failure)?;
        println!(
            "OK: '{}' is valid ({} via {})",
            spec.name, spec.llm.model, spec.llm.provider
        );
        return Ok(());
    }

    let outcome = match run_prompt(&args.prompt, &options) {
        Ok(outcome) => outcome,
        Err(RunError::Config(err)) => return Err(config_failure(err)),
        Err(RunError::DeliveryFailed { response, error }) => {
            // The completion still happened; surface it before failing.
            emit_response(&response, args.output.as_deref())?;
            return Err(Failure {
                message: error.to_string(),
                code: EXIT_DELIVERY,
            });
        }
        Err(err) => return Err(Failure::from(err)),
    };

    emit_response(&outcome.response, args.output.as_deref())?;

    if let Some(delivery) = &outcome.delivery {
        eprintln!("Delivered to {} recipient(s)", delivery.recipients_count);
    }
    Ok(())
}

fn list(args: ListArgs) -> Result<(), Failure> {
    let prompts = list_prompts(args.prompts_dir.as_deref());
    if prompts.is_empty() {
        println!("No prompt configurations found.");
    } else {
        for name in prompts {
            println!("{name}");
        }
    }
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<(), Failure> {
    let options = RunOptions {
        profile: args.profile,
        prompts_dir: args.prompts_dir,
        ..RunOptions::default()
    };
    let spec = validate_prompt(&args.prompt, &options).map_err(config_failure)?;

    println!("OK: '{}' is valid", spec.name);
    println!("  model: {} (provider {})", spec.llm.model, spec.llm.provider);
    if spec.delivery.recipients.is_empty() {
        println!("  delivery: none configured");
    } else {
        println!(
            "  delivery: {} via {}",
            spec.delivery.recipients.join(", "),
            spec.delivery.provider
        );
    }
    Ok(())
}

fn emit_response(response: &LlmResponse, output: Option<&Path>) -> Result<(), Failure> {
    match output {
        Some(path) => fs::write(path, &response.content).map_err(|err| Failure {
            message: format!("failed to write {}: {err}", path.display()),
            code: 1,
        })?,
        None => {
            println!("{}", response.content);
            if !response.web_search_results.is_empty() {
                println!("\nSources:");
                for result in &response.web_search_results {
                    println!("- {} <{}>", result.title, result.url);
                }
            }
        }
    }
    Ok(())
}

/// Configuration failures get a "did you mean" hint when a close prompt name
/// exists in the searched directory.
fn config_failure(err: ConfigError) -> Failure {
    let mut message = err.to_string();
    if let ConfigError::NotFoundInDir { name, dir } = &err {
        if let Some(suggestion) = closest_prompt(name, dir) {
            message.push_str(&format!("; did you mean '{suggestion}'?"));
        }
    }
    Failure {
        message,
        code: EXIT_CONFIG,
    }
}

fn closest_prompt(name: &str, dir: &Path) -> Option<String> {
    let wanted = name.to_lowercase();
    list_prompts(Some(dir))
        .into_iter()
        .map(|candidate| {
            let score = strsim::jaro_winkler(&wanted, &candidate.to_lowercase());
            (candidate, score)
        })
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}
