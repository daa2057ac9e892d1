pub mod parser;

pub use parser::{parse, Directive};

use std::path::{Path, PathBuf};

use crate::config::{Mount, RuntimeConfig};
use crate::constants::LICENSE_MOUNT_PATH;
use crate::error::PackError;

/// One `ADD`/`COPY` instruction, source already resolved against the
/// Ecsfile's base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Result of processing an Ecsfile against a configuration template.
#[derive(Debug)]
pub struct EcsfileOutput {
    pub config: RuntimeConfig,
    pub copies: Vec<CopyFile>,
}

/// Fold the Ecsfile's directives over a configuration template.
///
/// The template is never touched: each directive application takes the
/// accumulated configuration by value and returns the next one, so two
/// builds from the same template cannot alias each other. The default
/// license mount is appended when no directive already mounted it.
pub fn process(
    content: &str,
    basedir: &Path,
    template: &RuntimeConfig,
) -> Result<EcsfileOutput, PackError> {
    let directives = parser::parse(content)?;

    let copies = directives
        .iter()
        .filter_map(|directive| match directive {
            Directive::Copy { from, to } => Some(CopyFile {
                from: basedir.join(from),
                to: PathBuf::from(to),
            }),
            _ => None,
        })
        .collect();

    let mut config = directives
        .iter()
        .fold(template.clone(), apply);

    if !config
        .mounts
        .iter()
        .any(|m| m.destination == LICENSE_MOUNT_PATH)
    {
        config.mounts.push(Mount {
            destination: LICENSE_MOUNT_PATH.to_string(),
            source: LICENSE_MOUNT_PATH.to_string(),
            options: vec!["rx".to_string()],
        });
    }

    Ok(EcsfileOutput { config, copies })
}

fn apply(mut config: RuntimeConfig, directive: &Directive) -> RuntimeConfig {
    match directive {
        Directive::Arch(arch) => config.platform.arch = arch.clone(),
        Directive::Mount {
            destination,
            source,
            options,
        } => config.mounts.push(Mount {
            destination: destination.clone(),
            source: source.clone(),
            options: options.clone(),
        }),
        Directive::Env(expr) => config.process.env.push(expr.clone()),
        Directive::Cmd(args) => config.process.args = args.clone(),
        Directive::Workdir(path) => config.process.cwd = path.clone(),
        Directive::Copy { .. } => {}
    }
    config
}
