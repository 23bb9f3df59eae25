//! Converge CLI entrypoint.
//!
//! This is the main entrypoint for the converge command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use compute_converge::cli::{Cli, Commands, LogFormat, OutputFormat, OutputFormatter};
use compute_converge::cloud::CloudSdk;
use compute_converge::config::{
    find_manifest_file, ConfigValidator, Credentials, Manifest, ManifestParser,
};
use compute_converge::error::Result;
use compute_converge::reconciler::ManifestRunner;

use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            emit(&formatter.format_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Writes command output to stdout.
#[allow(clippy::print_stdout)]
fn emit(output: &str) {
    print!("{output}");
}

/// Main async entry point. Returns whether the command succeeded.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<bool> {
    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.manifest.as_ref(), warnings, formatter),
        Commands::Apply { yes } => {
            let manifest = load_manifest(cli.manifest.as_ref())?;
            let sdk = create_sdk(&cli, &manifest)?;
            cmd_apply(&sdk, &manifest, yes, cli.output, formatter).await
        }
        Commands::Image {
            ref family,
            ref folder_id,
        } => {
            let manifest = load_manifest_or_default(cli.manifest.as_ref())?;
            let sdk = create_sdk(&cli, &manifest)?;
            let image = sdk.images().latest_by_family(folder_id, family).await?;
            emit(&formatter.format_image(&image));
            Ok(true)
        }
        Commands::Subnets { ref folder_id } => {
            let manifest = load_manifest_or_default(cli.manifest.as_ref())?;
            let sdk = create_sdk(&cli, &manifest)?;
            let subnets = sdk.subnets().list(folder_id).await?;
            emit(&formatter.format_subnets(&subnets));
            Ok(true)
        }
    }
}

/// Validate the manifest.
fn cmd_validate(
    manifest_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let manifest = load_manifest(manifest_path)?;
    let result = ConfigValidator::new().validate(&manifest)?;
    emit(&formatter.format_validation(&manifest, &result, show_warnings));
    Ok(result.is_valid())
}

/// Converge every resource of the manifest.
async fn cmd_apply(
    sdk: &CloudSdk,
    manifest: &Manifest,
    auto_approve: bool,
    output: OutputFormat,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let result = ConfigValidator::new().validate(manifest)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    if manifest.has_deletions() && !auto_approve {
        if output == OutputFormat::Json {
            return Err(compute_converge::error::ConvergeError::internal(
                "manifest deletes resources; pass --yes to confirm in json mode",
            ));
        }
        if !confirm("The manifest deletes resources. Continue? [y/N]: ")? {
            eprintln!("Apply cancelled.");
            return Ok(true);
        }
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting pending operation waits");
            let _ = cancel_tx.send(true);
        }
    });

    let disks = sdk.disks();
    let instances = sdk.instances();
    let operations = sdk.operations();

    info!("Converging {} resources", manifest.resource_count());
    let report = ManifestRunner::new(&disks, &instances, &operations)
        .with_wait_policy(manifest.settings.wait.policy())
        .with_cancellation(cancel_rx)
        .apply(manifest)
        .await;

    emit(&formatter.format_apply(&report));
    Ok(report.is_success())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Asks a yes/no question on the terminal.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Resolves the manifest path.
fn resolve_manifest_path(manifest_path: Option<&PathBuf>) -> Result<PathBuf> {
    manifest_path.map_or_else(|| find_manifest_file("."), |path| Ok(path.clone()))
}

/// Loads the manifest, its `.env` file and environment overrides.
fn load_manifest(manifest_path: Option<&PathBuf>) -> Result<Manifest> {
    let manifest_file = resolve_manifest_path(manifest_path)?;
    debug!("Loading manifest from: {}", manifest_file.display());

    let parser = ManifestParser::new()
        .with_base_path(manifest_file.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;
    parser.load_with_env(&manifest_file)
}

/// Loads the manifest when one is around, for its endpoints and retry settings.
fn load_manifest_or_default(manifest_path: Option<&PathBuf>) -> Result<Manifest> {
    if manifest_path.is_some() {
        return load_manifest(manifest_path);
    }
    find_manifest_file(".").map_or_else(
        |_| {
            ManifestParser::new().load_dotenv()?;
            Ok(Manifest::default())
        },
        |path| load_manifest(Some(&path)),
    )
}

/// Builds the cloud SDK from the CLI credentials and manifest settings.
fn create_sdk(cli: &Cli, manifest: &Manifest) -> Result<CloudSdk> {
    let credentials = Credentials::resolve(
        cli.iam_token.clone(),
        cli.oauth_token.clone(),
        cli.service_account_key.as_deref(),
    )?;
    debug!("Using {} credentials", credentials.kind());

    CloudSdk::new(
        credentials,
        &manifest.settings.endpoints,
        manifest.settings.retry.policy(),
    )
}
