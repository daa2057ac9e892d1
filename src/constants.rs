// Centralized constants for the ecspack project to avoid magic strings

/// CPU architectures a bundle may target
pub const ARCHITECTURES: &[&str] = &[
    "noarch",
    "x86-64",
    "arm64",
    "arm",
    "riscv64",
    "mips64",
    "ppc",
    "loongarch",
];

/// Standard directory set scaffolded under a new bundle's rootfs
pub const BUNDLE_DIRS: &[&str] = &[
    "apps", "home", "bin", "qt", "boot", "dev", "lib", "proc", "root", "sbin", "tmp", "usr", "var",
];

/// Operating system name recorded in layer and image config records
pub const IMAGE_OS: &str = "sylixos";

/// Content of the per-layer VERSION sidecar
pub const LAYER_VERSION: &str = "1.0";

/// Tag used when an image reference carries none
pub const DEFAULT_TAG: &str = "latest";

/// Producer name written into image config history
pub const CREATED_BY: &str = "ecspack";

/// File name of the layer tarball inside its digest directory
pub const LAYER_TAR_NAME: &str = "layer.tar";

/// Default shell stack size written into rootfs/etc/startup.sh
pub const DEFAULT_SHSTACK: u32 = 200_000;

/// Mount appended to every Ecsfile-derived configuration
pub const LICENSE_MOUNT_PATH: &str = "/etc/lic";

/// Fallback permission bits when the platform exposes none
pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const DEFAULT_DIR_MODE: u32 = 0o755;
