use std::{env, path::PathBuf};

use clap::Parser;
use cli::{Args, Commands};
use gavel_config::{
    config::{self, generate_default_config, set_config_path, Config},
    error::ConfigError,
};
use gavel_core::Result;
use logging::setup_logging;
use tracing::{debug, info};

mod cli;
mod logging;
mod progress;
mod sync;
mod utils;

fn absolute_config_path(raw: &str) -> Result<PathBuf> {
    let path = gavel_config::utils::resolve_path(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().map_err(ConfigError::from)?;
    Ok(cwd.join(path))
}

fn print_config(config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(ConfigError::from)?;
    println!("# {}", config::config_path().display());
    print!("{content}");
    Ok(())
}

async fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        utils::set_color(false);
    }

    if let Some(ref raw) = args.config {
        set_config_path(absolute_config_path(raw)?);
    }
    debug!("config path: {}", config::config_path().display());

    match args.command {
        Commands::DefConfig => {
            let path = generate_default_config()?;
            info!("Default config written to {}", path.display());
        }
        Commands::Config => {
            let config = Config::new()?;
            print_config(&config)?;
        }
        Commands::Sync(sync_args) => {
            let config = Config::new()?;
            sync::sync_repository(&config, sync_args, args.json).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_config_path() {
        assert_eq!(
            absolute_config_path("/etc/gavel/config.toml").unwrap(),
            PathBuf::from("/etc/gavel/config.toml")
        );

        let relative = absolute_config_path("gavel.toml").unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("gavel.toml"));
    }
}
