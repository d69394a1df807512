use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use termcolor::{ColorChoice, StandardStream};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod diff;
mod fetch;
mod redact;
mod snapshot;
mod status;

#[derive(Parser)]
#[command(
    name = "confdiff",
    about = "Snapshot fleet config files over SSH and diff them against a prior capture"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture config files from every component host into a snapshot tree
    Capture {
        /// YAML file mapping components to host addresses
        addresses_file: PathBuf,
        /// YAML file mapping components to remote config file paths
        files_file: PathBuf,
        /// Directory to store the captured files in
        out_dir: PathBuf,
        /// Prior snapshot to diff against once the capture finishes
        #[arg(long)]
        compare_dir: Option<PathBuf>,
        /// Regenerate the addresses file from live orchestrator status first
        #[arg(long)]
        regen_addresses: bool,
        /// Regenerate the addresses file from saved plain-text status output
        #[arg(long, conflicts_with = "regen_addresses")]
        regen_from_file: Option<PathBuf>,
        /// Username for SSH to component hosts
        #[arg(short, long, default_value = "ubuntu")]
        username: String,
        /// Keep passwords in the captured files
        #[arg(long)]
        include_passwords: bool,
        /// Store the snapshot in a git repository, one commit per capture
        #[arg(long)]
        git: bool,
        /// Diff style: normal, context or unified
        #[arg(short, long, default_value = "normal")]
        mode: String,
        /// Overwrite an existing snapshot directory without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Compare two snapshot trees from previous runs
    Diff {
        old_dir: PathBuf,
        new_dir: PathBuf,
        /// Diff style: normal, context or unified
        #[arg(short, long, default_value = "normal")]
        mode: String,
    },
    /// Generate the component address map from orchestrator status
    Resolve {
        /// Where to write the YAML address map
        addresses_file: PathBuf,
        /// Parse saved plain-text status output instead of querying live
        #[arg(long)]
        from_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Capture {
            addresses_file,
            files_file,
            out_dir,
            compare_dir,
            regen_addresses,
            regen_from_file,
            username,
            include_passwords,
            git,
            mode,
            yes,
        } => {
            capture(CaptureArgs {
                addresses_file,
                files_file,
                out_dir,
                compare_dir,
                regen_addresses,
                regen_from_file,
                username,
                include_passwords,
                git,
                mode: diff::DiffMode::from_flag(&mode),
                yes,
            })
            .await?;
        }
        Commands::Diff { old_dir, new_dir, mode } => {
            let mut stdout = StandardStream::stdout(ColorChoice::Auto);
            diff::diff_trees(
                &old_dir,
                &new_dir,
                diff::DiffMode::from_flag(&mode),
                &mut stdout,
            )?;
        }
        Commands::Resolve {
            addresses_file,
            from_file,
        } => {
            let map = match from_file {
                Some(path) => {
                    let text = fs::read_to_string(&path).with_context(|| {
                        format!("Failed to read status output from {}", path.display())
                    })?;
                    status::parse_status_text(&text)
                }
                None => {
                    info!("getting live status");
                    status::parse_status(&status::live_status().await?)
                }
            };
            config::write_address_map(&addresses_file, &map)?;
            info!(
                components = map.len(),
                "wrote component address map to {}",
                addresses_file.display()
            );
        }
    }
    Ok(())
}

struct CaptureArgs {
    addresses_file: PathBuf,
    files_file: PathBuf,
    out_dir: PathBuf,
    compare_dir: Option<PathBuf>,
    regen_addresses: bool,
    regen_from_file: Option<PathBuf>,
    username: String,
    include_passwords: bool,
    git: bool,
    mode: diff::DiffMode,
    yes: bool,
}

async fn capture(args: CaptureArgs) -> Result<()> {
    // A live status is fetched once and reused for both the address map and
    // the deployed-versions file stored with the snapshot. Without
    // --regen-addresses an unreachable orchestrator only costs the versions
    // file, not the capture.
    info!("getting live status");
    let live = match status::live_status().await {
        Ok(current) => Some(current),
        Err(err) if args.regen_addresses => {
            return Err(err.context("Failed to get live status for the address map"));
        }
        Err(err) => {
            warn!("live status unavailable, skipping the deployed-versions file: {err:#}");
            None
        }
    };
    if args.regen_addresses {
        if let Some(current) = &live {
            info!("generating component address map from live status");
            config::write_address_map(&args.addresses_file, &status::parse_status(current))?;
        }
    } else if let Some(path) = &args.regen_from_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read status output from {}", path.display()))?;
        config::write_address_map(&args.addresses_file, &status::parse_status_text(&text))?;
    }

    let (addresses, files) = config::load(&args.addresses_file, &args.files_file)?;

    let repo = if args.git {
        Some(snapshot::git::ensure_repo(&args.out_dir)?)
    } else {
        if !snapshot::prepare_dir(&args.out_dir, &confirmer(args.yes))? {
            bail!("capture cancelled: output directory left untouched");
        }
        None
    };

    if let Some(current) = &live {
        snapshot::write_versions(&args.out_dir, current)?;
    }
    snapshot::write_snapshot(
        &args.out_dir,
        &addresses,
        &files,
        &args.username,
        args.include_passwords,
        &fetch::SshFetcher,
    )
    .await?;
    if let Some(repo) = &repo {
        snapshot::git::commit_all(repo);
    }

    if let Some(compare_dir) = &args.compare_dir {
        let mut stdout = StandardStream::stdout(ColorChoice::Auto);
        diff::diff_trees(compare_dir, &args.out_dir, args.mode, &mut stdout)?;
    }
    Ok(())
}

/// Interactive destructive-overwrite confirmation, or an always-yes stub
/// when `--yes` was given.
fn confirmer(assume_yes: bool) -> Box<dyn Fn(&str) -> Result<bool>> {
    if assume_yes {
        Box::new(|_prompt| Ok(true))
    } else {
        Box::new(|prompt| {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .context("Failed to read confirmation")
        })
    }
}
