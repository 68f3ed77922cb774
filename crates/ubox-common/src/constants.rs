//! System-wide constants and default paths.

use std::path::PathBuf;

/// Application name used in output and file names.
pub const APP_NAME: &str = "ubox";

/// Directory under `$HOME` holding the default repository.
pub const HOME_DIR_NAME: &str = ".ubox";

/// System-wide configuration file.
pub const SYSTEM_CONFIG_FILE: &str = "/etc/ubox.toml";

/// Configuration file name inside the user directory.
pub const USER_CONFIG_FILE: &str = "ubox.toml";

/// Environment variable overriding the repository root.
pub const ENV_DIR: &str = "UBOX_DIR";

/// Environment variable overriding the temporary directory.
pub const ENV_TMP: &str = "UBOX_TMP";

/// Environment variable overriding the verbosity level.
pub const ENV_LOGLEVEL: &str = "UBOX_LOGLEVEL";

/// Repository subdirectory holding image metadata.
pub const REPOS_DIR: &str = "repos";
/// Repository subdirectory holding image layers.
pub const LAYERS_DIR: &str = "layers";
/// Repository subdirectory holding containers and container names.
pub const CONTAINERS_DIR: &str = "containers";
/// Repository subdirectory holding provisioned executables.
pub const BIN_DIR: &str = "bin";
/// Repository subdirectory holding provisioned libraries.
pub const LIB_DIR: &str = "lib";

/// Marker file name flagging an image or container as protected.
pub const PROTECT_MARKER: &str = "PROTECT";

/// Marker file name identifying an image tag directory.
pub const TAG_MARKER: &str = "TAG";

/// Container metadata file name.
pub const CONTAINER_METADATA: &str = "container.json";

/// Container root filesystem directory name.
pub const CONTAINER_ROOTFS: &str = "ROOT";

/// Install marker file name inside `lib/`.
pub const INSTALL_MARKER: &str = "install.json";

/// Maximum length of a container name.
pub const MAX_NAME_LENGTH: usize = 2048;

/// Default network timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

/// Default Docker Hub index.
pub const DOCKERIO_INDEX_URL: &str = "https://hub.docker.com";

/// Default Docker Hub registry.
pub const DOCKERIO_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Returns the user-level ubox directory (`$HOME/.ubox`).
///
/// Falls back to a relative `.ubox` when no home directory is known.
pub fn user_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(HOME_DIR_NAME), |home| home.join(HOME_DIR_NAME))
}

/// Returns the default temporary directory.
pub fn default_tmpdir() -> PathBuf {
    std::env::var_os("TMPDIR").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}
