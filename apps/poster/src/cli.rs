use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::Config;

/// Posts dance-event announcements to X.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Announce one upcoming event.
    Daily,
    /// Post a thread of every event in the coming month.
    Weekly,
    /// Clear the posted-event log.
    ResetLog,
    /// Print the weekly thread without posting.
    PreviewWeekly,
}

/// Flags that override environment configuration.
#[derive(Debug, Clone, Args, Default)]
pub struct Overrides {
    /// Render and log posts without publishing anything.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Weighted-length budget per post.
    #[arg(
        long,
        global = true,
        value_name = "UNITS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub budget: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(budget) = self.budget {
            config.post_budget = budget as usize;
        }
    }
}

impl Cli {
    /// Config with flag overrides applied. `preview-weekly` always runs dry.
    pub fn configure(&self, mut config: Config) -> Config {
        self.overrides.apply(&mut config);
        if matches!(self.command, Command::PreviewWeekly) {
            config.dry_run = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommand_with_global_flags() {
        let cli =
            Cli::try_parse_from(["poster", "weekly", "--dry-run", "--budget", "140"]).unwrap();
        assert!(matches!(cli.command, Command::Weekly));
        let config = cli.configure(Config::default());
        assert!(config.dry_run);
        assert_eq!(config.post_budget, 140);
    }

    #[test]
    fn test_preview_weekly_forces_dry_run() {
        let cli = Cli::try_parse_from(["poster", "preview-weekly"]).unwrap();
        assert!(cli.configure(Config::default()).dry_run);
    }

    #[test]
    fn test_flags_absent_keep_config() {
        let cli = Cli::try_parse_from(["poster", "daily"]).unwrap();
        let config = cli.configure(Config {
            post_budget: 200,
            ..Config::default()
        });
        assert!(!config.dry_run);
        assert_eq!(config.post_budget, 200);
    }

    #[test]
    fn test_rejects_zero_budget_and_unknown_command() {
        assert!(Cli::try_parse_from(["poster", "daily", "--budget", "0"]).is_err());
        assert!(Cli::try_parse_from(["poster", "monthly"]).is_err());
        assert!(Cli::try_parse_from(["poster", "reset-log"]).is_ok());
    }
}
