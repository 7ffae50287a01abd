//! Crate-wide constants.

/// Default directory, relative to the project root, for generated outputs.
pub const DEFAULT_GEN_DIR: &str = "build-out/gen";

/// Environment variable that overrides [`DEFAULT_GEN_DIR`].
pub const GEN_DIR_ENV: &str = "APKRULE_GEN_DIR";

/// Suffix of a genrule's private working directory.
pub const TMP_DIR_SUFFIX: &str = "__tmp";

/// Suffix of a genrule's staged inputs directory.
pub const SRCS_DIR_SUFFIX: &str = "__srcs";

/// Environment variable bound to the absolute output path of a genrule.
pub const OUT_ENV: &str = "OUT";

/// Default POSIX interpreter for genrule commands.
pub const DEFAULT_POSIX_SHELL: &str = "/bin/bash";

/// Length of the truncated hex digest used for plan keys.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;
