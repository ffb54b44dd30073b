//! DW-009: CLI — single-document and batch runs.

use crate::core::config;
use crate::core::error::WeaveError;
use crate::core::executor::{self, RunConfig};
use crate::core::scanner::Scanner;
use crate::core::types::{DocumentReport, WeaveConfig};
use crate::runtime::js::JsEvaluator;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Document to process (default: every matching document under the content root)
    pub path: Option<PathBuf>,

    /// Content root searched in batch mode
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// File name matched in batch mode
    #[arg(long)]
    pub file_name: Option<String>,

    /// Fence tag marking executable fragments
    #[arg(long = "lang")]
    pub language: Option<String>,

    /// Path to docweave.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Loop iteration budget per document environment
    #[arg(long)]
    pub loop_limit: Option<u64>,

    /// Execute without writing; fail if any document would change
    #[arg(long)]
    pub check: bool,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

/// Dispatch a CLI run.
pub fn dispatch(args: RunArgs) -> Result<(), String> {
    let config = resolve_config(&args).map_err(|e| e.to_string())?;
    let scanner = Scanner::new(&config.language)
        .map_err(|e| format!("invalid language tag '{}': {}", config.language, e))?;
    let evaluator = JsEvaluator::new(config.loop_limit);
    let cfg = RunConfig {
        scanner: &scanner,
        evaluator: &evaluator,
        write: !args.check,
    };

    match args.path {
        Some(ref path) => cmd_single(&cfg, &config, path, &args),
        None => cmd_batch(&cfg, &config, &args),
    }
}

/// Merge config file values with CLI overrides, then validate.
fn resolve_config(args: &RunArgs) -> Result<WeaveConfig, WeaveError> {
    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(ref root) = args.root {
        config.content_root.clone_from(root);
    }
    if let Some(ref name) = args.file_name {
        config.file_name.clone_from(name);
    }
    if let Some(ref language) = args.language {
        config.language.clone_from(language);
    }
    if args.loop_limit.is_some() {
        config.loop_limit = args.loop_limit;
    }
    config::ensure_valid(&config)?;
    Ok(config)
}

fn cmd_single(
    cfg: &RunConfig<'_, JsEvaluator>,
    config: &WeaveConfig,
    path: &Path,
    args: &RunArgs,
) -> Result<(), String> {
    if !path.exists() {
        return Err(WeaveError::Discovery {
            path: path.to_path_buf(),
        }
        .to_string());
    }

    let report = match executor::process_document(cfg, path) {
        Ok(report) => report,
        Err(e) if args.check => return Err(e.to_string()),
        Err(e) => {
            eprintln!("  ERROR: {}: {}", path.display(), e);
            return Ok(());
        }
    };
    if args.json {
        print_json(std::slice::from_ref(&report))?;
    } else {
        print_report(&report, &config.language, args.check);
    }

    if args.check && report.changed {
        return Err(format!("{} is out of date", path.display()));
    }
    Ok(())
}

fn cmd_batch(
    cfg: &RunConfig<'_, JsEvaluator>,
    config: &WeaveConfig,
    args: &RunArgs,
) -> Result<(), String> {
    if !args.json {
        println!(
            "Searching for {} files with {} code blocks...",
            config.file_name, config.language
        );
    }
    let paths = executor::discover(&config.content_root, &config.file_name, cfg.scanner)
        .map_err(|e| e.to_string())?;

    if paths.is_empty() {
        if args.json {
            print_json(&[])?;
        } else {
            println!(
                "No {} files with {} code blocks found.",
                config.file_name, config.language
            );
        }
        return Ok(());
    }

    if !args.json {
        println!("Found {} files to process:", paths.len());
        println!();
    }

    let mut reports = Vec::new();
    let summary = executor::run_batch(cfg, &paths, |path, outcome| match outcome {
        Ok(report) => {
            if !args.json {
                print_report(report, &config.language, args.check);
                println!();
            }
            reports.push(report.clone());
        }
        Err(e) => {
            eprintln!("  ERROR: {}: {}", path.display(), e);
        }
    });

    if args.json {
        print_json(&reports)?;
    } else {
        println!("Preprocessing complete.");
    }

    if summary.failed > 0 {
        eprintln!("  {} document(s) failed; see errors above", summary.failed);
    }
    if args.check {
        if summary.failed > 0 {
            return Err(format!("{} document(s) could not be checked", summary.failed));
        }
        if summary.changed > 0 {
            return Err(format!("{} document(s) out of date", summary.changed));
        }
    }
    Ok(())
}

/// Display one document report to stdout.
fn print_report(report: &DocumentReport, language: &str, check: bool) {
    let name = report
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| report.path.display().to_string());
    println!("Processing: {} ({})", name, report.path.display());

    if report.fragments == 0 {
        println!("  No {} code blocks found", language);
    } else {
        println!("  Found {} {} code blocks", report.fragments, language);
        println!("  Executed: {}/{} blocks", report.executed, report.fragments);
        println!("  Output blocks added: {}", report.with_stdout);
        println!("  Figure references added: {}", report.with_figures);
        if report.faults() > 0 {
            println!("  Faulted: {} (see inline [Execution Error] blocks)", report.faults());
        }
    }

    let status = match (report.changed, check) {
        (false, _) => "up to date",
        (true, false) => "rewritten",
        (true, true) => "would change",
    };
    println!("  Status: {}", status);
}

fn print_json(reports: &[DocumentReport]) -> Result<(), String> {
    let json = serde_json::to_string_pretty(reports).map_err(|e| format!("serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}
