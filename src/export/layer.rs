use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::archive::{stream, WalkOptions, Walker};
use crate::constants::IMAGE_OS;
use crate::export::utils::DigestWriter;

/// Digest and size of one serialized layer tar.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub digest: String,
    pub size: u64,
}

/// Stream the bundle's rootfs into `dest` as an uncompressed tar, digesting
/// the bytes as they hit the disk. Entry paths are rebased to the rootfs
/// root and only file and symlink entries go into the layer, which keeps
/// the tar a pure function of the tree's content.
pub fn write_layer_tar(rootfs: &Path, dest: &Path) -> Result<LayerInfo> {
    let file = File::create(dest)
        .with_context(|| format!("failed to create layer tar at {}", dest.display()))?;

    let options = WalkOptions {
        include_empty_dir: false,
        ..WalkOptions::default()
    }
    .rebased_on(rootfs);
    let entries = Walker::new(vec![rootfs.to_path_buf()], options);

    let writer = stream::pack(DigestWriter::new(file), entries)
        .with_context(|| format!("failed to pack rootfs {}", rootfs.display()))?;
    let (mut file, digest, size) = writer.finish();
    file.flush()?;
    file.sync_all()?;

    Ok(LayerInfo { digest, size })
}

/// The `json` sidecar stored next to `layer.tar`, in the legacy Docker-v1
/// shape image loaders still expect.
#[derive(Debug, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub created: String,
    pub container_config: ContainerConfig,
    pub os: String,
}

impl LayerRecord {
    /// Single-layer model: no parent, ever.
    pub fn new(digest: &str, created: &str) -> Self {
        Self {
            id: digest.to_string(),
            parent: None,
            created: created.to_string(),
            container_config: ContainerConfig::default(),
            os: IMAGE_OS.to_string(),
        }
    }
}

/// Empty legacy container configuration block. All fields keep their
/// zero/null values; consumers only check for presence.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "Domainname")]
    pub domainname: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "AttachStdin")]
    pub attach_stdin: bool,
    #[serde(rename = "AttachStdout")]
    pub attach_stdout: bool,
    #[serde(rename = "AttachStderr")]
    pub attach_stderr: bool,
    #[serde(rename = "Tty")]
    pub tty: bool,
    #[serde(rename = "OpenStdin")]
    pub open_stdin: bool,
    #[serde(rename = "StdinOnce")]
    pub stdin_once: bool,
    #[serde(rename = "Env")]
    pub env: Option<Vec<String>>,
    #[serde(rename = "Cmd")]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Volumes")]
    pub volumes: Option<Value>,
    #[serde(rename = "WorkingDir")]
    pub working_dir: String,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(rename = "OnBuild")]
    pub on_build: Option<Vec<String>>,
    #[serde(rename = "Labels")]
    pub labels: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn identical_trees_produce_identical_digests() {
        let dir = TempDir::new().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir_all(rootfs.join("etc")).unwrap();
        fs::write(rootfs.join("etc/hello"), "hi").unwrap();

        let first = write_layer_tar(&rootfs, &dir.path().join("one.tar")).unwrap();
        let second = write_layer_tar(&rootfs, &dir.path().join("two.tar")).unwrap();

        assert_eq!(first.digest, second.digest);
        assert_eq!(first.size, second.size);
        assert_eq!(
            fs::metadata(dir.path().join("one.tar")).unwrap().len(),
            first.size
        );
    }

    #[test]
    fn empty_rootfs_still_yields_a_digestable_tar() {
        let dir = TempDir::new().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir_all(&rootfs).unwrap();

        let info = write_layer_tar(&rootfs, &dir.path().join("layer.tar")).unwrap();
        assert_eq!(info.digest.len(), 64);
        // two 512-byte zero blocks of tar trailer
        assert_eq!(info.size, 1024);
    }

    #[test]
    fn layer_record_serializes_without_parent() {
        let record = LayerRecord::new("cafe", "2024-01-01T00:00:00Z");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""id":"cafe""#));
        assert!(!json.contains("parent"));
        assert!(json.contains(r#""os":"sylixos""#));
        assert!(json.contains(r#""Env":null"#));
    }
}
