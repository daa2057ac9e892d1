use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Parsed form of a bundle's `config.json`.
///
/// Every field defaults so partially filled bundle configs still load; the
/// packing pipeline only hard-requires `platform.arch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub process: ProcessSpec,
    #[serde(default)]
    pub root: RootSpec,
    #[serde(default)]
    pub mounts: Vec<Mount>,
    #[serde(default)]
    pub sylixos: SylixosSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default = "default_arch")]
    pub arch: String,
    #[serde(default)]
    pub os: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessSpec {
    #[serde(default)]
    pub user: UserSpec,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub cwd: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSpec {
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootSpec {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub destination: String,
    pub source: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Host-specific resource, device, command and network descriptors.
///
/// `resources` and `network` are kept as raw JSON so the label flattener
/// sees every leaf the bundle author wrote, not just the keys this crate
/// knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SylixosSpec {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default = "default_resources")]
    pub resources: Value,
    #[serde(default = "default_network")]
    pub network: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub path: String,
    #[serde(default)]
    pub access: String,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            arch: default_arch(),
            os: String::new(),
        }
    }
}

impl Default for SylixosSpec {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            devices: Vec::new(),
            resources: default_resources(),
            network: default_network(),
        }
    }
}

fn default_arch() -> String {
    "noarch".to_string()
}

fn default_resources() -> Value {
    json!({
        "cpu": { "highestPrio": 160, "lowestPrio": 250 },
        "memory": { "kheapLimit": 2_097_152, "memoryLimitMB": 64 },
        "disk": { "limitMB": 128 },
        "kernelObject": {
            "deviceLimit": 50,
            "dlopenLibraryLimit": 50,
            "eventLimit": 800,
            "eventSetLimit": 50,
            "msgQueueLimit": 100,
            "partitionLimit": 20,
            "posixMqueueLimit": 100,
            "regionLimit": 20,
            "rmsLimit": 20,
            "socketLimit": 100,
            "srtpLimit": 20,
            "threadLimit": 100,
            "threadPoolLimit": 4,
            "threadVarLimit": 100,
            "timerLimit": 50,
            "xsiipcLimit": 100
        }
    })
}

fn default_network() -> Value {
    json!({ "ftpdEnable": true, "telnetdEnable": true })
}

impl RuntimeConfig {
    /// Built-in template used by `create` and `build` when scaffolding a
    /// fresh bundle.
    pub fn template(arch: &str) -> Self {
        let mut config = Self {
            hostname: "sylixos".to_string(),
            process: ProcessSpec {
                cwd: "/".to_string(),
                ..ProcessSpec::default()
            },
            root: RootSpec {
                path: "rootfs".to_string(),
            },
            ..Self::default()
        };
        config.platform.arch = arch.to_string();
        config
    }
}
