use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use gitpilot::{Assistant, Config, GitVersion, OperationResult, Repository};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let request: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if request.trim().is_empty() {
        eprintln!("Usage: gitpilot <natural language request>");
        eprintln!("Example: gitpilot show me what changed since yesterday");
        return ExitCode::FAILURE;
    }

    if let Err(e) = GitVersion::validate() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let repo = match Repository::discover() {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let assistant = match Assistant::new(repo, config) {
        Ok(assistant) => assistant,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = assistant.process_request(&request).await;

    if result.requires_confirmation {
        report(&result);
        return confirm_and_run(&assistant, &result).await;
    }

    report(&result);
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn confirm_and_run(assistant: &Assistant, proposal: &OperationResult) -> ExitCode {
    let Some(command) = proposal.generated_command.as_deref() else {
        return ExitCode::FAILURE;
    };

    println!();
    println!("  {command}");
    println!();
    print!("This command is classified {} risk. Run it? [y/N] ", proposal.risk);
    if io::stdout().flush().is_err() {
        return ExitCode::FAILURE;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return ExitCode::FAILURE;
    }

    if !matches!(answer.trim(), "y" | "Y" | "yes") {
        println!("Aborted. Nothing was executed.");
        return ExitCode::SUCCESS;
    }

    let result = assistant.confirm_execution(command, proposal.risk).await;
    report(&result);
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report(result: &OperationResult) {
    if let Some(error) = &result.error {
        eprintln!("Error: {error}");
        return;
    }

    if !result.reply.is_empty() {
        println!("{}", result.reply);
    }

    if let Some(command) = &result.generated_command {
        if result.requires_confirmation {
            println!("Proposed command (not executed): {command}");
            if !result.explanation.is_empty() {
                println!("  {}", result.explanation);
            }
            if !result.alternatives.is_empty() {
                println!("Alternatives:");
                for alt in &result.alternatives {
                    println!("  - {alt}");
                }
            }
        } else if result.execution.executed {
            println!("$ {command}");
            if !result.execution.stdout.is_empty() {
                print!("{}", result.execution.stdout);
            }
            if !result.execution.stderr.is_empty() {
                eprint!("{}", result.execution.stderr);
            }
        }
    }

    if let Some(info) = &result.repository_info {
        let branch = info.branch.as_deref().unwrap_or("(detached)");
        println!("[{branch}: {}]", info.status_summary);
    }
}
