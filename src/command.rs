use std::path::PathBuf;

use clap::{ArgAction, Parser};
use consolex::config::{split_list, Config};

/// Remove console statements from your project.
#[derive(Parser, Debug)]
#[command(name = "consolex", author, version, about, long_about = None)]
pub struct Args {
    /// Console methods to remove (comma-separated).
    #[arg(short, long)]
    pub types: Option<String>,

    /// Project path. Defaults to the current directory.
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// File extensions to process (comma-separated).
    #[arg(short, long)]
    pub extensions: Option<String>,

    /// Show what would be removed without writing any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory names to exclude (comma-separated).
    #[arg(long)]
    pub exclude: Option<String>,

    /// Global object whose methods are removed.
    #[arg(long)]
    pub receiver: Option<String>,

    /// Config file. Defaults to `consolex.toml` in the project path.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write rewritten files without parsing them again first.
    #[arg(long)]
    pub no_verify: bool,

    /// More log output, repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Flags given on the command line win over the config file.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(types) = &self.types {
            config.types = split_list(types);
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = split_list(extensions);
        }
        if let Some(exclude) = &self.exclude {
            config.exclude = split_list(exclude);
        }
        if let Some(receiver) = &self.receiver {
            config.receiver = receiver.clone();
        }
        config.dry_run |= self.dry_run;
        if self.no_verify {
            config.verify_output = false;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use consolex::config::Config;

    use super::Args;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "consolex",
            "--types",
            "log, debug",
            "-e",
            "ts",
            "--dry-run",
            "--no-verify",
        ]);
        let config = args.apply(Config::default());

        assert_eq!(config.types, vec!["log", "debug"]);
        assert_eq!(config.extensions, vec!["ts"]);
        assert_eq!(config.exclude, Config::default().exclude);
        assert!(config.dry_run);
        assert!(!config.verify_output);
    }

    #[test]
    fn no_flags_keep_config() {
        let args = Args::parse_from(["consolex"]);
        let config = Config {
            receiver: "logger".to_owned(),
            ..Config::default()
        };
        assert_eq!(args.apply(config.clone()), config);
    }
}
