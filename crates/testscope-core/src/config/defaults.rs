//! Default values for testscope configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Directories whose whole subtree is skipped during discovery.
pub const DEFAULT_SKIP_FOLDERS: &[&str] = &["vendor", ".git", ".vscode"];

/// File name suffix that marks a Go test file.
pub const DEFAULT_TEST_FILE_SUFFIX: &str = "_test.go";

/// Function name prefixes recognised as test entry points.
pub const DEFAULT_TEST_PREFIXES: &[&str] = &["Test", "Example"];

/// Methods labelled `(<receiver>).Test*` are suite methods.
pub const DEFAULT_RECEIVER_METHOD_PATTERN: &str = r"^\(([^)]+)\)\.(Test.*)$";

/// Conventional source directory preferred as discovery root when present.
pub const DEFAULT_SRC_DIR: &str = "src";

// ============================================================================
// Runner Defaults
// ============================================================================

/// Maximum number of run requests in flight.
pub const DEFAULT_MAX_PARALLEL: usize = 20;

/// Go toolchain binary.
pub const DEFAULT_GO_BINARY: &str = "go";

/// Value passed to `go test -timeout`, in seconds. Zero disables it.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 30;

/// Time on top of the go timeout before the process is killed.
///
/// `-timeout` only starts once the test binary runs, so this also has to
/// cover compiling the package.
pub const DEFAULT_KILL_GRACE_SECS: u64 = 120;

/// Flag selecting suite methods inside a suite function (testify).
pub const DEFAULT_SUITE_METHOD_FLAG: &str = "-testify.m";

// ============================================================================
// Files
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "testscope.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "testscope";

/// User config file name.
pub const USER_CONFIG_FILE: &str = "config.toml";
