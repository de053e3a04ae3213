use clap::{Parser, Subcommand};
use studyroom_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyroom", version, about = "Studyroom focus timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Study statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Daily archives
    Archive {
        #[command(subcommand)]
        action: commands::archive::ArchiveAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: &Config) {
    // stderr keeps stdout free for JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log.level.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    init_tracing(&config);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action, &config),
        Commands::Stats { action } => commands::stats::run(action, &config),
        Commands::Archive { action } => commands::archive::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_timer_configure() {
        let cli = Cli::try_parse_from(["studyroom", "timer", "configure", "--focus", "50", "--break", "10"])
            .unwrap();
        match cli.command {
            Commands::Timer {
                action: commands::timer::TimerAction::Configure { focus, break_minutes },
            } => {
                assert_eq!(focus, 50);
                assert_eq!(break_minutes, 10);
            }
            _ => panic!("expected timer configure"),
        }
    }

    #[test]
    fn configure_rejects_minutes_beyond_u32() {
        assert!(Cli::try_parse_from(["studyroom", "timer", "configure", "--focus", "4294967296", "--break", "5"]).is_err());
        assert!(Cli::try_parse_from(["studyroom", "timer", "configure", "--focus", "25", "--break", "-1"]).is_err());
    }

    #[test]
    fn parses_archive_list_limit() {
        let cli = Cli::try_parse_from(["studyroom", "archive", "list", "--limit", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Archive {
                action: commands::archive::ArchiveAction::List { limit: Some(3) }
            }
        ));
    }

    #[test]
    fn bind_requires_owner() {
        assert!(Cli::try_parse_from(["studyroom", "timer", "bind"]).is_err());
    }
}
