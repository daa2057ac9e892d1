use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::constants::{CREATED_BY, IMAGE_OS};

/// Image configuration record; its serialized bytes are digested and the
/// digest becomes the record's file name in the output archive.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    pub created: String,
    pub architecture: String,
    pub os: String,
    pub config: ProcessConfig,
    pub rootfs: RootFs,
    pub history: Vec<History>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Env")]
    pub env: Vec<String>,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Vec<String>,
    #[serde(rename = "WorkingDir")]
    pub working_dir: String,
    #[serde(rename = "Labels")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct History {
    pub created: String,
    pub created_by: String,
    pub empty_layer: bool,
}

/// Map a bundle's runtime configuration onto the image configuration.
///
/// The host-specific descriptors (mounts, commands, devices, resources,
/// network) are flattened into string labels so an image loader without a
/// schema for them still round-trips every leaf value.
pub fn build_image_config(
    runtime: &RuntimeConfig,
    layer_digest: &str,
    created: &str,
) -> Result<ImageConfig> {
    let mut labels = BTreeMap::new();
    labels.insert("hostname".to_string(), runtime.hostname.clone());
    flatten_into("mounts", &serde_json::to_value(&runtime.mounts)?, &mut labels);
    flatten_into(
        "sylixos.commands",
        &serde_json::to_value(&runtime.sylixos.commands)?,
        &mut labels,
    );
    flatten_into(
        "sylixos.devices",
        &serde_json::to_value(&runtime.sylixos.devices)?,
        &mut labels,
    );
    flatten_into("sylixos.resources", &runtime.sylixos.resources, &mut labels);
    flatten_into("sylixos.network", &runtime.sylixos.network, &mut labels);

    Ok(ImageConfig {
        created: created.to_string(),
        architecture: runtime.platform.arch.clone(),
        os: IMAGE_OS.to_string(),
        config: ProcessConfig {
            user: format!("{}:{}", runtime.process.user.uid, runtime.process.user.gid),
            env: runtime.process.env.clone(),
            entrypoint: runtime.process.args.clone(),
            working_dir: format!("/{}", runtime.root.path),
            labels,
        },
        rootfs: RootFs {
            fs_type: "layers".to_string(),
            diff_ids: vec![format!("sha256:{layer_digest}")],
        },
        history: vec![History {
            created: created.to_string(),
            created_by: CREATED_BY.to_string(),
            empty_layer: false,
        }],
    })
}

/// Recursively flatten a JSON value into dotted-path labels. Objects join
/// keys with `.`, arrays index numerically, every scalar leaf becomes one
/// label. Null leaves have no scalar value and are dropped.
pub fn flatten_into(prefix: &str, value: &Value, labels: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&join(prefix, key), child, labels);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&join(prefix, &index.to_string()), child, labels);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            labels.insert(prefix.to_string(), s.clone());
        }
        other => {
            labels.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
