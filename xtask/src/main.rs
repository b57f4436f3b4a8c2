use std::fs;
use std::path::PathBuf;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use fnproc_lambda::adapters::api_gateway::PLATFORM_ID;
use fnproc_lambda::adapters::default_adapter_factory;
use fnproc_lambda::config::{EntryConfig, PLATFORM_ENV, PROCESSOR_ENV};
use fnproc_lambda::handlers::http::{handle_http_event, ProcessorRuntime};
use fnproc_lambda::processors::builtin_registry;
use fnproc_lambda::telemetry::init_tracing;
use serde_json::{json, Value};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the serverless processor workspace",
    long_about = "A unified CLI for invoking processors locally and running\n\
                  CI checks in the serverless processor workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one invocation through the runtime entry point in-process
    InvokeLocal {
        /// Registered processor name
        #[arg(long, env = PROCESSOR_ENV)]
        processor: String,
        /// Platform identifier the event is shaped for
        #[arg(long, env = PLATFORM_ENV, default_value = PLATFORM_ID)]
        platform: String,
        /// JSON file holding the native event; an empty GET is used if omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// List processors bundled into the Lambda binary
    Processors,
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Workspace tests
    Test,
    /// Lint + test
    Check,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

// ── local invocation ───────────────────────────────────────────────

fn read_event(path: Option<&PathBuf>) -> Value {
    let Some(path) = path else {
        return json!({ "httpMethod": "GET", "path": "/" });
    };
    let text = fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()));
    serde_json::from_str(&text)
        .unwrap_or_else(|error| panic!("{} is not valid JSON: {error}", path.display()))
}

fn invoke_local(processor: String, platform: String, event: Option<PathBuf>) {
    init_tracing();

    let event = read_event(event.as_ref());
    let runtime = ProcessorRuntime::new(
        EntryConfig {
            processor_name: processor,
            platform,
        },
        default_adapter_factory().expect("failed to register platform adapters"),
        builtin_registry().expect("failed to register processors"),
    );
    let native_context = json!({ "request_id": "local-invocation" });

    let tokio_runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let response =
        tokio_runtime.block_on(handle_http_event(&runtime, &native_context, event));

    println!(
        "{}",
        serde_json::to_string_pretty(&response).expect("response should serialize")
    );
    if response.status_code >= 500 {
        exit(1);
    }
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    for package in ["fnproc_core", "fnproc_lambda", "fnproc_services"] {
        step(&format!("Test {package}"));
        run_cargo(&["test", "-p", package]);
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::InvokeLocal {
            processor,
            platform,
            event,
        } => invoke_local(processor, platform, event),
        Commands::Processors => {
            let registry = builtin_registry().expect("failed to register processors");
            for name in registry.names() {
                println!("{name}");
            }
        }
        Commands::Ci { job } => match job {
            CiJob::Lint => ci_lint(),
            CiJob::Test => ci_test(),
            CiJob::Check => {
                ci_lint();
                ci_test();
            }
        },
    }
}
