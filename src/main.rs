use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_agent::agent::{Agent, Report};
use review_agent::catalog::Catalog;
use review_agent::config::{load_settings, AgentProfile, ConfigFile};
use review_agent::error::AgentError;
use review_agent::ui::{self, Spinner, Status};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Review Agent - search NCBI, Web of Science and Galaxy in plain language
#[derive(Parser, Debug)]
#[command(name = "review-agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Natural-language literature review agent for NCBI, Web of Science and Galaxy",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show the environment variables the agent reads and exit
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive literature review session (default)
    Chat,

    /// Interactive Galaxy project session
    Galaxy,

    /// Run a single request and exit
    Ask {
        /// The request, e.g. "fetch full records for \"BRCA1 and human cancer\""
        text: String,

        /// Use the Galaxy catalog instead of the literature one
        #[arg(long)]
        galaxy: bool,
    },

    /// List the actions the model can choose from
    #[command(alias = "ls")]
    Actions {
        #[arg(long)]
        galaxy: bool,
    },

    /// Write a starter configuration file
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "review-agent.toml")]
        path: PathBuf,
    },
}

fn print_env_vars() {
    println!("Review Agent - Environment Variables");
    println!();
    println!("Language model:");
    println!("  GOOGLE_API_KEY     Gemini API key (required)");
    println!("  GEMINI_MODEL       Model name (default: gemini-1.5-flash-latest)");
    println!();
    println!("NCBI Entrez:");
    println!("  NCBI_EMAIL         Contact email sent with every request (required)");
    println!("  NCBI_API_KEY       Optional key for higher rate limits");
    println!("  DATABASE           Default database (default: pubmed)");
    println!();
    println!("Web of Science Starter:");
    println!("  WOS_API_KEY        Clarivate API key (required)");
    println!("  WOS_BASE_URL       Documents endpoint");
    println!("  DATABASE_CODE      Collection code (default: WOS)");
    println!("  SORT_FIELD         Sort field code (default: LD)");
    println!("  ASCENDING          true or false (default: true)");
    println!();
    println!("Galaxy:");
    println!("  GALAXY_URL         Server URL (required for `galaxy`)");
    println!("  GALAXY_API_KEY     API key (required for `galaxy`)");
    println!();
    println!("Any setting can also be given as REVIEW_AGENT__SECTION__KEY,");
    println!("e.g. REVIEW_AGENT__FETCH__MAX_RECORDS=500.");
    println!();
    println!("Logging:");
    println!("  RUST_LOG           Overrides -v/-q (e.g. review_agent=debug)");
    std::process::exit(0);
}

fn profile(galaxy: bool) -> AgentProfile {
    if galaxy {
        AgentProfile::Galaxy
    } else {
        AgentProfile::Review
    }
}

fn is_exit(text: &str) -> bool {
    text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit")
}

/// Run one command; Ctrl-C cancels the model call or the fetch but keeps
/// the session.
async fn run_command(agent: &mut Agent, text: &str) -> Result<(), AgentError> {
    let token = CancellationToken::new();
    let spinner = if ui::is_terminal() {
        Spinner::new("Working...")
    } else {
        Spinner::hidden()
    };

    let result = {
        let handle = agent.handle(text, &token);
        tokio::pin!(handle);
        tokio::select! {
            result = &mut handle => result,
            _ = tokio::signal::ctrl_c() => {
                spinner.set_message("Cancelling...");
                token.cancel();
                handle.await
            }
        }
    };
    spinner.finish();

    match result {
        Ok(Report::Answer(answer)) => {
            println!("{}", answer.trim_end());
            Ok(())
        }
        Ok(Report::Action(report)) => {
            ui::print_report(&report);
            Ok(())
        }
        Err(AgentError::Cancelled) => {
            ui::print_status(Status::Warning, "Command cancelled");
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            ui::print_status(Status::Error, &e.to_string());
            Ok(())
        }
    }
}

async fn interactive(mut agent: Agent) -> Result<()> {
    ui::print_banner(agent.catalog().profile());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit(text) {
            break;
        }
        run_command(&mut agent, text).await?;
    }

    println!("Goodbye!");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
    }

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    // Logs go to stderr so previews on stdout stay clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("review_agent={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Actions { galaxy } => {
            let catalog = Catalog::new(profile(galaxy))?;
            println!("{}", ui::catalog_table(&catalog));
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            ConfigFile::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            ui::print_status(
                Status::Success,
                &format!("Wrote starter configuration to {}", path.display()),
            );
        }
        command => {
            let settings = load_settings(cli.config.as_deref())?;
            match command {
                Commands::Ask { text, galaxy } => {
                    let mut agent = Agent::from_settings(&settings, profile(galaxy))?;
                    run_command(&mut agent, &text).await?;
                }
                Commands::Galaxy => {
                    interactive(Agent::from_settings(&settings, AgentProfile::Galaxy)?).await?;
                }
                _ => {
                    interactive(Agent::from_settings(&settings, AgentProfile::Review)?).await?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_chat() {
        let cli = Cli::parse_from(["review-agent"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_ask() {
        let cli = Cli::parse_from(["review-agent", "-vv", "ask", "--galaxy", "list my tools"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Ask { text, galaxy }) => {
                assert_eq!(text, "list my tools");
                assert!(galaxy);
            }
            other => panic!("Expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit now"));
    }
}
