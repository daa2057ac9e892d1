use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TAG, LAYER_TAR_NAME};
use crate::error::PackError;

/// One `manifest.json` element. A pack operation always emits exactly one.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Config")]
    pub config: String,
    #[serde(rename = "RepoTags")]
    pub repo_tags: Vec<String>,
    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

/// Legacy name → tag → layer digest lookup table.
pub type Repositories = BTreeMap<String, BTreeMap<String, String>>;

pub fn build_manifest(
    reference: &ImageReference,
    layer_digest: &str,
    config_digest: &str,
) -> Vec<ManifestEntry> {
    vec![ManifestEntry {
        config: format!("{config_digest}.json"),
        repo_tags: vec![reference.to_string()],
        layers: vec![format!("{layer_digest}/{LAYER_TAR_NAME}")],
    }]
}

pub fn build_repositories(reference: &ImageReference, layer_digest: &str) -> Repositories {
    let mut tags = BTreeMap::new();
    tags.insert(reference.tag.clone(), layer_digest.to_string());
    let mut repositories = BTreeMap::new();
    repositories.insert(reference.name.clone(), tags);
    repositories
}

/// `name[:tag]` image reference. The tag defaults to `latest`; more than
/// one `:` is rejected outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub name: String,
    pub tag: String,
}

impl ImageReference {
    pub fn parse(input: &str) -> Result<Self, PackError> {
        let sections: Vec<&str> = input.split(':').collect();
        match sections.as_slice() {
            [name] if !name.is_empty() => Ok(Self {
                name: name.to_string(),
                tag: DEFAULT_TAG.to_string(),
            }),
            [name, tag] if !name.is_empty() && !tag.is_empty() => Ok(Self {
                name: name.to_string(),
                tag: tag.to_string(),
            }),
            _ => Err(PackError::InvalidReference(input.to_string())),
        }
    }

    /// Default reference when none is supplied: the bundle directory's base
    /// name, tagged `latest`.
    pub fn for_bundle(bundle: &Path) -> Result<Self, PackError> {
        let name = bundle
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PackError::InvalidBundle {
                path: bundle.to_path_buf(),
                reason: "bundle path has no base name".to_string(),
            })?;
        Ok(Self {
            name,
            tag: DEFAULT_TAG.to_string(),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
