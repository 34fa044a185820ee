// fieldflow: field-level value tracking for a C subset

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fieldflow::config::DEFAULT_DATA_DIR;
use fieldflow::parser::parser::Parser;
use fieldflow::state::StateOwner;
use fieldflow::{Engine, FunctionReport, ProjectConfig};

#[derive(clap::Parser, Debug)]
#[command(name = "fieldflow", version, about)]
struct Args {
    /// C source file to analyze
    file: PathBuf,

    /// Project name; enables `<DATA_DIR>/<PROJECT>.clears_argument`
    #[arg(long)]
    project: Option<String>,

    /// Directory holding per-project directive files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Only analyze the named function
    #[arg(long)]
    function: Option<String>,

    /// Also list every path written by each function
    #[arg(long)]
    show_modified: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    info!("parsing {}", args.file.display());
    let program = Parser::new(&source)
        .and_then(|mut parser| parser.parse_program())
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    let config = ProjectConfig::new(args.project.clone(), args.data_dir.clone());
    let mut engine = Engine::new(program, &config);
    info!("found {} top-level declarations", engine.program().nodes.len());

    let reports = match &args.function {
        Some(name) => {
            let report = engine
                .analyze_function(name)
                .with_context(|| format!("no function named '{}'", name))?;
            vec![report]
        }
        None => engine.analyze(),
    };

    for report in &reports {
        print_report(report, args.show_modified);
    }

    Ok(())
}

fn print_report(report: &FunctionReport, show_modified: bool) {
    println!("{} (line {}):", report.name, report.location.line);

    for sm in report.states.iter().filter(|sm| sm.owner == StateOwner::Extra) {
        println!("  {} = {}", sm.path, sm.value);
    }

    if show_modified {
        for sm in report.states.iter().filter(|sm| sm.owner == StateOwner::Modified) {
            println!("  modified: {}", sm.path);
        }
    }

    for err in &report.errors {
        println!("  error: {}", err);
    }
}
