use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ecspack::bundle;
use ecspack::config::{Mount, RuntimeConfig};
use ecspack::constants::{ARCHITECTURES, DEFAULT_SHSTACK};
use ecspack::ecsfile;
use ecspack::export::{pack_image, ImageReference, PackRequest};
use ecspack::logging;

#[derive(Parser)]
#[command(name = "ecspack", version, about = "SylixOS ECS image tool")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pack a bundle directory into an image tarball
    Pack {
        /// Container runtime bundle directory
        bundle: PathBuf,
        /// Image name and tag, defaults to '<bundle>:latest'
        #[arg(short = 't', long = "tag")]
        reference: Option<String>,
        /// Output tarball path, defaults to '<bundle>.<arch>.tar'
        tarball: Option<PathBuf>,
    },
    /// Build a bundle from an Ecsfile, then pack it
    Build {
        /// Ecsfile path
        #[arg(short = 'f', long = "file", default_value = "Ecsfile")]
        file: PathBuf,
        /// Image name and tag
        #[arg(short = 't', long = "tag")]
        reference: String,
    },
    /// Scaffold an empty bundle directory
    Create {
        /// Directory to create the bundle in
        bundle: PathBuf,
        /// Target CPU architecture
        #[arg(long, default_value = "noarch")]
        arch: String,
        /// Start parameters (process.args), space separated
        #[arg(long)]
        entry_args: Option<String>,
        /// Mount the container host's JSRE into the bundle
        #[arg(long)]
        mount_jsre: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init_logging(cli.log_json) {
        eprintln!("ecspack: failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ecspack: {err:#}; operation aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Pack {
            bundle,
            reference,
            tarball,
        } => {
            let outcome = pack_image(&PackRequest {
                bundle,
                tarball,
                reference,
            })?;
            println!(
                "✅ Image {} written to {}",
                outcome.reference,
                outcome.tarball.display()
            );
            Ok(())
        }

        Command::Build { file, reference } => {
            // validate the reference before the bundle is scaffolded
            let reference = ImageReference::parse(&reference)?;
            let content = fs::read_to_string(&file)
                .with_context(|| format!("failed to read Ecsfile {}", file.display()))?;
            let basedir = file.parent().filter(|p| !p.as_os_str().is_empty());
            let output = ecsfile::process(
                &content,
                basedir.unwrap_or(Path::new(".")),
                &RuntimeConfig::template("noarch"),
            )?;

            let bundle_dir = PathBuf::from(&reference.name);
            let built = bundle::scaffold(&bundle_dir, &output.config, DEFAULT_SHSTACK)?;
            bundle::copy_into_rootfs(&built, &output.copies)?;

            let outcome = pack_image(&PackRequest {
                bundle: bundle_dir,
                tarball: None,
                reference: Some(reference.to_string()),
            })?;
            println!(
                "✅ Image {} written to {}",
                outcome.reference,
                outcome.tarball.display()
            );
            Ok(())
        }

        Command::Create {
            bundle,
            arch,
            entry_args,
            mount_jsre,
        } => {
            if !ARCHITECTURES.contains(&arch.as_str()) {
                bail!(
                    "unsupported architecture '{arch}', expected one of: {}",
                    ARCHITECTURES.join(", ")
                );
            }
            if bundle.exists() {
                bail!("directory '{}' already exists", bundle.display());
            }

            let mut config = RuntimeConfig::template(&arch);
            if mount_jsre {
                for path in ["/lib", "/bin/javascript"] {
                    config.mounts.push(Mount {
                        destination: path.to_string(),
                        source: path.to_string(),
                        options: vec!["rx".to_string()],
                    });
                }
            }
            if let Some(args) = entry_args {
                config.process.args = args.split_whitespace().map(str::to_string).collect();
            }

            let created = bundle::scaffold(&bundle, &config, DEFAULT_SHSTACK)?;
            println!("✅ Bundle created at {}", created.path.display());
            Ok(())
        }
    }
}
