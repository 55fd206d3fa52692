use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueHint};
use gavel_config::broker::BrokerStrategy;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SyncArgs {
    /// Repository to synchronize
    #[arg(short, long, default_value = "central")]
    pub repo: String,

    /// Index snapshot to walk instead of the one in the index directory
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub index: Option<String>,

    /// Do not publish versions already present in the product catalog
    #[arg(long)]
    pub skip_known: bool,

    /// Publish inline without a per-artifact deadline
    #[arg(long)]
    pub no_deadline: bool,

    /// Override the broker strategy: direct or pooled
    #[arg(long)]
    pub strategy: Option<BrokerStrategy>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk a repository index and publish change notifications
    #[clap(name = "sync", visible_alias = "s")]
    Sync(SyncArgs),

    /// Print the resolved configuration to stdout
    Config,

    /// Generate the default config file
    #[clap(name = "defconfig")]
    DefConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_defaults() {
        let args = Args::parse_from(["gavel", "sync"]);
        let Commands::Sync(sync) = args.command else {
            panic!("expected sync command");
        };
        assert_eq!(sync.repo, "central");
        assert!(sync.index.is_none());
        assert!(!sync.skip_known);
        assert!(!sync.no_deadline);
        assert!(sync.strategy.is_none());
    }

    #[test]
    fn test_sync_flags() {
        let args = Args::parse_from([
            "gavel",
            "-vv",
            "sync",
            "--repo",
            "typesafe",
            "--skip-known",
            "--no-deadline",
            "--strategy",
            "pooled",
            "--index",
            "/tmp/index.json",
        ]);
        assert_eq!(args.verbose, 2);
        let Commands::Sync(sync) = args.command else {
            panic!("expected sync command");
        };
        assert_eq!(sync.repo, "typesafe");
        assert!(sync.skip_known);
        assert!(sync.no_deadline);
        assert_eq!(sync.strategy, Some(BrokerStrategy::Pooled));
        assert_eq!(sync.index.as_deref(), Some("/tmp/index.json"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(Args::try_parse_from(["gavel", "sync", "--strategy", "jms"]).is_err());
    }
}
