use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rmm-report-extract",
    version,
    about = "Deterministic extraction of monitoring-vendor reports into report data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Run(RunArgs),
    #[command(name = "match")]
    Match(MatchArgs),
    Extract(ExtractArgs),
    InitConfig(InitConfigArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Match(_) => "match",
            Self::Extract(_) => "extract",
            Self::InitConfig(_) => "init-config",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Restrict the run to these modules instead of the configured list.
    #[arg(long = "module")]
    pub modules: Vec<String>,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[arg(long)]
    pub client: String,

    #[arg(long)]
    pub dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub module: String,

    #[arg(long)]
    pub client: String,

    /// Already OCR'd text, e.g. a merged text artifact from a previous run.
    #[arg(long)]
    pub text: PathBuf,

    #[arg(long)]
    pub report_period: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InitConfigArgs {
    #[arg(long = "client", required = true)]
    pub clients: Vec<String>,

    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    #[arg(long)]
    pub report_period: Option<String>,

    #[arg(long, default_value = "data/")]
    pub data_directory: String,
}
