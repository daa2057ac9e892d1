use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::archive::{stream, ArchiveEntry};
use crate::bundle::Bundle;
use crate::constants::{LAYER_TAR_NAME, LAYER_VERSION};
use crate::export::config::build_image_config;
use crate::export::layer::{write_layer_tar, LayerRecord};
use crate::export::manifest::{build_manifest, build_repositories, ImageReference};
use crate::export::utils::sha256_bytes;

/// Inputs of one packaging run.
#[derive(Debug, Default)]
pub struct PackRequest {
    pub bundle: PathBuf,
    pub tarball: Option<PathBuf>,
    pub reference: Option<String>,
}

/// Identifiers of a finished packaging run.
#[derive(Debug)]
pub struct PackOutcome {
    pub tarball: PathBuf,
    pub reference: ImageReference,
    pub layer_digest: String,
    pub config_digest: String,
}

/// Pack one bundle into an image tarball.
///
/// Inputs are validated before anything touches the filesystem; all
/// intermediate artifacts live in a unique temporary directory next to the
/// output path, and the finished archive is renamed into place so a failed
/// run never leaves a partial file at the requested location. The
/// temporary directory is removed whether the run succeeds or not.
pub fn pack_image(request: &PackRequest) -> Result<PackOutcome> {
    let reference = match &request.reference {
        Some(raw) => ImageReference::parse(raw)?,
        None => ImageReference::for_bundle(&request.bundle)?,
    };
    let bundle = Bundle::open(&request.bundle)?;
    let tarball = resolve_tarball_path(request.tarball.as_deref(), &bundle);

    let parent = match tarball.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix(".ecspack-")
        .tempdir_in(parent)
        .context("failed to create temporary working directory")?;

    let result = assemble(&bundle, &reference, &tarball, temp.path());
    if let Err(err) = temp.close() {
        // secondary condition only; the operation's own result wins
        warn!("failed to remove temporary directory: {err}");
    }
    result
}

fn assemble(
    bundle: &Bundle,
    reference: &ImageReference,
    tarball: &Path,
    temp: &Path,
) -> Result<PackOutcome> {
    let now = Utc::now();

    // layer tar, digested while it is written
    let layer_path = temp.join(LAYER_TAR_NAME);
    let layer = write_layer_tar(&bundle.rootfs, &layer_path)?;
    info!(
        digest = %layer.digest,
        size = layer.size,
        "layer tar written"
    );

    let layer_record = LayerRecord::new(
        &layer.digest,
        &now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    );
    let layer_json = serde_json::to_vec(&layer_record)?;

    // the config digest names the config file itself
    let image_config = build_image_config(
        &bundle.config,
        &layer.digest,
        &now.format("%Y-%m-%dT%H:%M:%S%.3f000000Z").to_string(),
    )?;
    let config_json = serde_json::to_vec(&image_config)?;
    let config_digest = sha256_bytes(&config_json);
    info!(digest = %config_digest, "image config built");

    let manifest_json =
        serde_json::to_vec(&build_manifest(reference, &layer.digest, &config_digest))?;
    let repositories_json =
        serde_json::to_vec(&build_repositories(reference, &layer.digest))?;

    // synthetic entry sequence; only layer.tar is streamed from disk
    let entries = vec![
        Ok(ArchiveEntry::directory(&layer.digest)),
        Ok(ArchiveEntry::file_on_disk(
            format!("{}/{LAYER_TAR_NAME}", layer.digest),
            &layer_path,
            layer.size,
        )),
        Ok(ArchiveEntry::file(
            format!("{}/json", layer.digest),
            layer_json,
        )),
        Ok(ArchiveEntry::file(
            format!("{}/VERSION", layer.digest),
            LAYER_VERSION.as_bytes().to_vec(),
        )),
        Ok(ArchiveEntry::file(
            format!("{config_digest}.json"),
            config_json,
        )),
        Ok(ArchiveEntry::file("manifest.json", manifest_json)),
        Ok(ArchiveEntry::file("repositories", repositories_json)),
    ];

    let staged = temp.join("image.tar");
    let file = stream::pack(
        File::create(&staged)
            .with_context(|| format!("failed to create {}", staged.display()))?,
        entries,
    )?;
    file.sync_all()?;

    fs::rename(&staged, tarball)
        .with_context(|| format!("failed to move image to {}", tarball.display()))?;
    info!("image written to {}", tarball.display());

    Ok(PackOutcome {
        tarball: tarball.to_path_buf(),
        reference: reference.clone(),
        layer_digest: layer.digest,
        config_digest,
    })
}

/// Default: `<bundleBaseName>.<architecture>.tar`, the architecture taken
/// from the bundle's own configuration. An explicit name without the
/// `.tar` suffix gets it appended.
fn resolve_tarball_path(requested: Option<&Path>, bundle: &Bundle) -> PathBuf {
    match requested {
        Some(path) => {
            if path.to_string_lossy().ends_with(".tar") {
                path.to_path_buf()
            } else {
                PathBuf::from(format!("{}.tar", path.display()))
            }
        }
        None => PathBuf::from(format!(
            "{}.{}.tar",
            bundle.base_name(),
            bundle.config.platform.arch
        )),
    }
}
