//! wildid: 野生动物识别命令行工具
//!
//! Usage:
//!   wildid validate <config.yaml>                         Check an engine config
//!   wildid providers <config.yaml>                        List the provider lineup
//!   wildid classify <config.yaml> <image>... [--json] [--concurrency <n>]

use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wildlife_id::{EngineConfig, ImagePayload};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "validate" => cmd_validate(&args[2..]).await,
        "providers" => cmd_providers(&args[2..]).await,
        "classify" => cmd_classify(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("wildid {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"wildid: wildlife species identification

USAGE:
    wildid <COMMAND> [OPTIONS]

COMMANDS:
    validate <config>                          Validate an engine config file
    providers <config>                         Show providers in priority order
    classify <config> <image>... [OPTIONS]     Classify one or more images
    version                                    Show version information
    help                                       Show this help message

CLASSIFY OPTIONS:
    --json                 Print results as JSON
    --concurrency <n>      Images classified at the same time (default 4)

ENVIRONMENT:
    RUST_LOG                      Log filter (e.g. wildlife_id=debug)
    WILDID_COOLDOWN_SECS          Exclusion window after a provider failure
    WILDID_PROVIDER_TIMEOUT_MS    Per-provider call timeout
    WILDID_MAX_IMAGE_BYTES        Largest accepted image"#
    );
}

fn config_arg(args: &[String]) -> anyhow::Result<PathBuf> {
    match args.first() {
        Some(p) if !p.starts_with("--") => Ok(PathBuf::from(p)),
        _ => bail!("missing <config> argument"),
    }
}

async fn load(args: &[String]) -> anyhow::Result<EngineConfig> {
    let path = config_arg(args)?;
    EngineConfig::from_path(&path)
        .await
        .with_context(|| format!("loading {}", path.display()))
}

async fn cmd_validate(args: &[String]) -> anyhow::Result<()> {
    let cfg = load(args).await?;
    let local = cfg.local_descriptors().len();
    println!(
        "✓ {} provider(s) configured ({} remote, {} local)",
        cfg.providers.len(),
        cfg.providers.len() - local,
        local
    );
    Ok(())
}

async fn cmd_providers(args: &[String]) -> anyhow::Result<()> {
    let cfg = load(args).await?;
    let mut providers = cfg.providers.clone();
    providers.sort_by_key(|p| p.priority);
    println!("{:<4} {:<24} {:<12} {:>8} {:>7}", "PRI", "NAME", "KIND", "MIN_CONF", "WEIGHT");
    for p in providers {
        println!(
            "{:<4} {:<24} {:<12} {:>8.2} {:>7.2}",
            p.priority, p.name, p.kind, p.min_confidence, p.weight
        );
    }
    Ok(())
}

async fn cmd_classify(args: &[String]) -> anyhow::Result<()> {
    let cfg = load(args).await?;

    let mut json = false;
    let mut concurrency = None;
    let mut paths = Vec::new();
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--concurrency" => {
                let n = rest.next().context("--concurrency needs a value")?;
                concurrency = Some(n.parse::<usize>().context("--concurrency must be a number")?);
            }
            other => paths.push(PathBuf::from(other)),
        }
    }
    if paths.is_empty() {
        bail!("no images given");
    }

    let classifier = cfg.into_builder()?.build()?;
    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        let image = ImagePayload::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        images.push(image);
    }

    let results = classifier.classify_batch(&images, concurrency).await;

    if json {
        let rows: Vec<serde_json::Value> = paths
            .iter()
            .zip(&results)
            .map(|(path, r)| match r {
                Ok(c) => serde_json::json!({ "file": path.display().to_string(), "result": c }),
                Err(e) => serde_json::json!({ "file": path.display().to_string(), "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (path, r) in paths.iter().zip(&results) {
        match r {
            Ok(c) => {
                let flag = if c.is_fallback() {
                    " [fallback]"
                } else if c.is_low_confidence() {
                    " [low confidence]"
                } else {
                    ""
                };
                println!(
                    "{}: {} ({:.2}) scientific={} source={}{}",
                    path.display(),
                    c.label,
                    c.confidence,
                    c.scientific_name.as_deref().unwrap_or("-"),
                    c.source,
                    flag
                );
            }
            Err(e) => println!("{}: error: {}", path.display(), e),
        }
    }
    Ok(())
}
