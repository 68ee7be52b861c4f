//! Banner and build information printed by `--version`

use std::fmt;

const BANNER: &str = r#"
 ____  ____    ___  _____
(  _ \(  _ \  / __)(  _  )
 )(_) ))(_) )( (_-. )(_)(
(____/(____/  \___/(_____)
"#;

/// Build metadata, filled from environment variables at compile time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_time: &'static str,
    pub git_commit: &'static str,
    pub rustc_version: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            build_time: option_env!("DDGO_BUILD_TIME").unwrap_or("unknown"),
            git_commit: option_env!("DDGO_GIT_COMMIT").unwrap_or("unknown"),
            rustc_version: option_env!("DDGO_RUSTC_VERSION").unwrap_or("unknown"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", BANNER)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "BuildTime: {}", self.build_time)?;
        writeln!(f, "GitCommit: {}", self.git_commit)?;
        writeln!(f, "RustcVersion: {}", self.rustc_version)
    }
}

/// Print the banner and build information to stdout
pub fn print_version() {
    println!("{}", VersionInfo::current());
}
