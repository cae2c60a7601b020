use std::path::{Path, PathBuf};

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(arg_required_else_help = true)]
pub struct Args {
    /// JSON configuration file; built-in defaults are used when omitted
    #[clap(short, long, value_name = "PATH", env = "LOGWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extra plugin directory, searched in addition to the configured ones
    #[clap(long = "plugin-dir", value_name = "DIR")]
    pub plugin_dirs: Vec<PathBuf>,

    /// Log file, overriding the configured one
    #[clap(short, long, env = "LOGWEAVE_FILE")]
    pub log_file: Option<PathBuf>,

    /// Threshold, overriding the configured one (DEBUG, INFO, WARN, ERROR, FATAL)
    #[clap(long)]
    pub level: Option<String>,

    /// Module tag attached to every message
    #[clap(short, long, default_value = "demo")]
    pub module: String,

    /// Messages to publish. Prefix with `LEVEL:` to choose a severity, e.g. `error:disk full`
    #[clap(required = true)]
    pub messages: Vec<String>,

    /// Print the loaded plugins and per-run counts.
    #[clap(long)]
    pub verbose: bool,
}

impl Args {
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
