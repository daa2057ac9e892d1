use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RuntimeConfig;
use crate::constants::BUNDLE_DIRS;
use crate::ecsfile::CopyFile;
use crate::error::PackError;

/// A validated container runtime bundle: `rootfs/` plus `config.json`.
/// Read-only input to packing; nothing here ever mutates it.
#[derive(Debug)]
pub struct Bundle {
    pub path: PathBuf,
    pub rootfs: PathBuf,
    pub config: RuntimeConfig,
}

impl Bundle {
    pub fn open(path: &Path) -> Result<Self, PackError> {
        if !path.is_dir() {
            return Err(PackError::InvalidBundle {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        let rootfs = path.join("rootfs");
        if !rootfs.is_dir() {
            return Err(PackError::InvalidBundle {
                path: path.to_path_buf(),
                reason: "missing rootfs/ directory".to_string(),
            });
        }

        let config_path = path.join("config.json");
        let raw = fs::read(&config_path).map_err(|err| PackError::InvalidBundle {
            path: path.to_path_buf(),
            reason: format!("cannot read config.json: {err}"),
        })?;
        let config = serde_json::from_slice(&raw).map_err(|source| PackError::InvalidConfig {
            path: config_path,
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            rootfs,
            config,
        })
    }

    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Create a bundle directory: rootfs with the standard SylixOS directory
/// set, the serialized runtime configuration and a startup script.
/// Existing directories are reused so a rebuild can refresh a bundle in
/// place; `config.json` and `startup.sh` are overwritten.
pub fn scaffold(path: &Path, config: &RuntimeConfig, shstack: u32) -> Result<Bundle> {
    let rootfs = path.join("rootfs");
    fs::create_dir_all(&rootfs)
        .with_context(|| format!("failed to create {}", rootfs.display()))?;
    for dir in BUNDLE_DIRS {
        let dir_path = rootfs.join(dir);
        fs::create_dir_all(&dir_path)
            .with_context(|| format!("failed to create {}", dir_path.display()))?;
        info!("created {}", dir_path.display());
    }

    let config_path = path.join("config.json");
    let serialized = serde_json::to_vec_pretty(config)?;
    fs::write(&config_path, serialized)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    info!("created {}", config_path.display());

    fs::create_dir_all(rootfs.join("etc"))?;
    let startup_path = rootfs.join("etc").join("startup.sh");
    fs::write(&startup_path, format!("shstack {shstack}\n"))
        .with_context(|| format!("failed to write {}", startup_path.display()))?;
    info!("created {}", startup_path.display());

    Ok(Bundle {
        path: path.to_path_buf(),
        rootfs,
        config: config.clone(),
    })
}

/// Execute the `ADD`/`COPY` list of an Ecsfile: copy each source file or
/// directory tree into the bundle's rootfs under its destination path.
pub fn copy_into_rootfs(bundle: &Bundle, copies: &[CopyFile]) -> Result<()> {
    for copy in copies {
        let relative = copy.to.strip_prefix("/").unwrap_or(&copy.to);
        let dest = bundle.rootfs.join(relative);
        copy_recursive(&copy.from, &dest)
            .with_context(|| format!("failed to copy {}", copy.from.display()))?;
        info!("copied {} -> {}", copy.from.display(), dest.display());
    }
    Ok(())
}

fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::metadata(src)?;
    if metadata.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
    }
    Ok(())
}
