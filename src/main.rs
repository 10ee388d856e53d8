mod cli;

use reframe::conversion::{inspect_source, ConversionBatch, ConversionEngine, ConversionRequest};

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use futures::StreamExt;
use rf_av::{FallbackProber, ToolRegistry};
use rf_core::config::Config;
use rf_core::{MediaDimensions, RatioTag};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reframe=debug,rf_av=debug,rf_core=debug".to_string()
        } else {
            "reframe=info,rf_av=info,rf_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());

    match cli.command {
        Commands::Convert {
            files,
            to,
            out,
            remove_sources,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(config, files, to, out, remove_sources))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&config, &file, json))
        }
        Commands::Dims { width, height, to } => show_dims(width, height, to),
        Commands::CheckTools => check_tools(&config),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::List { dir } => {
            list_outputs(&dir.unwrap_or_else(|| config.conversion.output_dir.clone()))
        }
        Commands::Version => {
            println!("reframe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert(
    mut config: Config,
    files: Vec<PathBuf>,
    to: Vec<RatioTag>,
    out: Option<PathBuf>,
    remove_sources: bool,
) -> Result<()> {
    // Inputs named on the command line are the user's own files.
    config.conversion.remove_sources = remove_sources;

    let tools = ToolRegistry::discover(&config.tools);
    let engine = ConversionEngine::from_config(&config, &tools)?;

    let mut requests = Vec::new();
    for file in files {
        if !rf_core::is_video_path(&file) {
            tracing::warn!("Skipping {}: not a recognized video file", file.display());
            continue;
        }

        let display_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string_lossy().into_owned());

        match engine.inspect(&file).await {
            Ok(info) => {
                tracing::info!(
                    "{display_name}: {} ({})",
                    info.dimensions,
                    info.ratio.label()
                );
                let request = if to.is_empty() {
                    ConversionRequest::for_other_ratios(&file, display_name, info.dimensions)
                } else {
                    ConversionRequest::new(&file, display_name, to.iter().copied())
                        .with_dimensions(info.dimensions)
                };
                requests.push(request);
            }
            Err(e) => tracing::warn!("Skipping {}: {e}", file.display()),
        }
    }

    if requests.is_empty() {
        bail!("no files to process");
    }

    let destination = out.unwrap_or_else(|| config.conversion.output_dir.clone());
    let job_id = engine.submit(ConversionBatch::new(requests, &destination))?;
    println!("Job {job_id} -> {}", destination.display());

    let mut updates = Box::pin(engine.watch(job_id, config.conversion.poll_interval()));
    let mut last_item = None;
    let mut last = None;
    while let Some(progress) = updates.next().await {
        if progress.current_item.is_some() && progress.current_item != last_item {
            println!(
                "[{}/{}] {:>3.0}% {}",
                progress.completed_units + 1,
                progress.total_units,
                progress.fraction() * 100.0,
                progress.current_item.as_deref().unwrap_or_default()
            );
            last_item = progress.current_item.clone();
        }
        last = Some(progress);
    }

    let progress = last.with_context(|| format!("job {job_id} is no longer tracked"))?;

    println!();
    for result in &progress.results {
        println!("✓ {} ({})", result.output_name, result.ratio);
    }
    for error in &progress.errors {
        println!("✗ {} → {}: {}", error.source_name, error.ratio.label(), error.message);
    }

    if progress.failed() > 0 {
        bail!(
            "{} of {} conversions failed",
            progress.failed(),
            progress.total_units
        );
    }

    println!("All {} conversions succeeded", progress.succeeded());
    Ok(())
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let prober = FallbackProber::from_registry(&tools, config.conversion.probe_timeout());
    let info = inspect_source(&prober, file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File: {}", file.display());
        println!("Size: {}", info.dimensions);
        if let Some(secs) = info.duration_secs {
            let secs = secs as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }
        println!("Ratio: {} ({})", info.ratio, info.ratio.label());
        for target in info.targets {
            let (w, h) = info.dimensions.target(target)?;
            println!("  -> {} ({}): {}x{}", target, target.label(), w, h);
        }
    }

    Ok(())
}

fn show_dims(width: u32, height: u32, to: Option<RatioTag>) -> Result<()> {
    let dims = MediaDimensions::new(width, height)?;
    let ratio = dims.ratio_tag();
    println!("Source: {} ({} {})", dims, ratio, ratio.label());

    let targets = match to {
        Some(tag) => vec![tag],
        None => rf_core::other_ratios(ratio).to_vec(),
    };
    for target in targets {
        let (w, h) = dims.target(target)?;
        println!("  -> {} ({}): {}x{}", target, target.label(), w, h);
    }

    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to convert videos.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let conv = &config.conversion;
    println!("  Output dir: {}", conv.output_dir.display());
    println!("  Encoder: {} crf={} preset={}", conv.video_codec, conv.crf, conv.preset);
    println!("  Blur sigma: {}", conv.blur_sigma);
    println!("  Remove sources (engine default): {}", conv.remove_sources);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    Ok(())
}

fn list_outputs(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        println!("No output directory at {}", dir.display());
        return Ok(());
    }

    let mut entries: Vec<(String, u64)> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| rf_core::is_video_path(&entry.path()))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file()
                .then(|| (entry.file_name().to_string_lossy().into_owned(), meta.len()))
        })
        .collect();
    entries.sort();

    if entries.is_empty() {
        println!("No videos in {}", dir.display());
        return Ok(());
    }

    for (name, size) in &entries {
        println!("{:>10.1} MB  {}", *size as f64 / (1024.0 * 1024.0), name);
    }
    println!("\n{} file(s) in {}", entries.len(), dir.display());

    Ok(())
}
