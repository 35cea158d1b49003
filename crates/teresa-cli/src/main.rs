//! Teresa - command-line client for the teresa app platform
//!
//! Usage:
//!   teresa deploy <dir> --app <name>   # Package and deploy a directory
//!   teresa login --email <email>       # Store a token for the current cluster
//!   teresa config set-cluster ...      # Manage clusters
//!   teresa app list                    # Inspect apps and teams
//!   teresa app env set <app> K=V       # Change an app's env vars

mod output;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use teresa_core::api::{EnvVar, NewApp, PatchAppRequest};
use teresa_core::config::ConfigStore;
use teresa_core::context::AppContext;
use teresa_core::deploy::{ConsoleSink, DeployOptions, MAX_DEPLOY_TIMEOUT};

const MAX_TIMEOUT_SECS: u64 = MAX_DEPLOY_TIMEOUT.as_secs();

#[derive(Parser)]
#[command(name = "teresa")]
#[command(about = "Deploy and manage apps on a teresa cluster", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/teresa/config.toml)
    #[arg(long, global = true, env = "TERESA_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package a directory and deploy it to an app
    Deploy(DeployArgs),

    /// Log in and store a token for the current cluster
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Manage clusters
    Config(ConfigArgs),

    /// Create, inspect and configure apps
    App(AppArgs),

    /// Inspect teams
    Team(TeamArgs),

    /// Print the client version
    Version,
}

#[derive(Args)]
struct DeployArgs {
    /// Directory with the application source
    dir: PathBuf,

    /// Application name
    #[arg(long)]
    app: String,

    /// Team that owns the application
    #[arg(long)]
    team: Option<String>,

    /// Free-text description stored with the deployment
    #[arg(long)]
    description: Option<String>,

    /// Skip the confirmation prompt (for CI/CD)
    #[arg(long)]
    no_input: bool,

    /// Overall deadline in seconds (overrides the config file)
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    timeout: Option<u64>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add or update a cluster
    SetCluster {
        /// Cluster name
        name: String,

        /// Server URL, http(s)://hostname[:port]
        #[arg(long)]
        server: String,

        /// Make this the current cluster
        #[arg(long)]
        current: bool,
    },

    /// Select the cluster used by other commands
    UseCluster {
        /// Cluster name
        name: String,
    },

    /// Show configured clusters
    View,
}

#[derive(Args)]
struct AppArgs {
    #[command(subcommand)]
    command: AppSubcommand,
}

#[derive(Subcommand)]
enum AppSubcommand {
    /// List apps visible to the current user
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show details for one app
    Info {
        /// Application name
        name: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Create an app
    Create {
        /// Application name
        name: String,

        /// Owning team (required when you belong to more than one)
        #[arg(long)]
        team: Option<String>,

        /// Number of replicas
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        scale: i64,
    },

    /// Manage environment variables
    Env(EnvArgs),
}

#[derive(Args)]
struct EnvArgs {
    #[command(subcommand)]
    command: EnvSubcommand,
}

#[derive(Subcommand)]
enum EnvSubcommand {
    /// Add or replace env vars
    Set {
        /// Application name
        app: String,

        /// Variables as KEY=VALUE
        #[arg(required = true, value_parser = parse_env_var)]
        vars: Vec<EnvVar>,
    },

    /// Remove env vars
    Unset {
        /// Application name
        app: String,

        /// Variable names
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

fn parse_env_var(raw: &str) -> Result<EnvVar, String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok(EnvVar {
            key: key.to_string(),
            value: value.to_string(),
        }),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[derive(Args)]
struct TeamArgs {
    #[command(subcommand)]
    command: TeamSubcommand,
}

#[derive(Subcommand)]
enum TeamSubcommand {
    /// List teams
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "teresa=debug" } else { "teresa=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let store = match cli.config {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };
    debug!(path = %store.config_path().display(), "using config file");

    match cli.command {
        Commands::Deploy(args) => run_deploy(store, args).await,
        Commands::Login { email } => {
            run_login(store, email).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(args) => {
            run_config(store, args.command)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::App(args) => {
            run_app(store, args.command).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Team(args) => {
            run_team(store, args.command).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("teresa {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_deploy(store: ConfigStore, args: DeployArgs) -> Result<ExitCode> {
    let ctx = AppContext::load(store)?;
    let cluster = ctx.cluster_name()?.to_string();

    let mut options = DeployOptions::new(&args.app, &args.dir);
    if let Some(team) = &args.team {
        options = options.with_team(team);
    }
    if let Some(description) = &args.description {
        options = options.with_description(description);
    }

    println!(
        "Deploying app {} to the cluster {}...",
        style(&args.app).green(),
        style(&cluster).green()
    );

    if !args.no_input && !confirm_deploy()? {
        println!("Deploy cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let deployer = ctx.deployer(Arc::new(ConsoleSink), args.timeout.map(Duration::from_secs))?;

    tokio::select! {
        result = deployer.deploy(&options) => match result {
            Ok(report) => {
                output::print_deploy_success(&report);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(output::print_deploy_error(&e)),
        },
        _ = tokio::signal::ctrl_c() => Ok(output::print_interrupted()),
    }
}

fn confirm_deploy() -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Cannot ask for confirmation without a terminal; pass --no-input");
    }
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Are you sure?")
        .default(false)
        .interact()?;
    Ok(confirmed)
}

async fn run_login(store: ConfigStore, email: Option<String>) -> Result<()> {
    let mut ctx = AppContext::load(store)?;
    let cluster = ctx.cluster_name()?.to_string();
    let theme = ColorfulTheme::default();

    let email = match email {
        Some(email) => email,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;

    let token = ctx
        .client()?
        .login(&email, &password)
        .await
        .context("Login failed")?;
    ctx.config_mut().set_token(token)?;
    ctx.save()?;

    println!(
        "{} logged in to {}",
        style("✓").green().bold(),
        style(&cluster).green()
    );
    Ok(())
}

fn run_config(store: ConfigStore, command: ConfigSubcommand) -> Result<()> {
    let mut ctx = AppContext::load(store)?;

    match command {
        ConfigSubcommand::SetCluster {
            name,
            server,
            current,
        } => {
            ctx.config_mut().set_cluster(&name, &server, current)?;
            ctx.save()?;
            println!("Cluster '{}' saved", name);
        }
        ConfigSubcommand::UseCluster { name } => {
            ctx.config_mut().use_cluster(&name)?;
            ctx.save()?;
            println!("Now using cluster '{}'", name);
        }
        ConfigSubcommand::View => {
            println!("Config: {}", ctx.config_store().config_path().display());
            println!();
            output::print_config(ctx.config());
        }
    }
    Ok(())
}

async fn run_app(store: ConfigStore, command: AppSubcommand) -> Result<()> {
    let client = AppContext::load(store)?.client()?;

    match command {
        AppSubcommand::List { format } => {
            let apps = client.apps().await.context("Failed to list apps")?;
            match format {
                OutputFormat::Table => output::print_apps(&apps),
                OutputFormat::Json => output::print_json(&apps)?,
            }
        }
        AppSubcommand::Info { name, format } => {
            let app = client
                .app_info(&name)
                .await
                .with_context(|| format!("Failed to get app '{}'", name))?;
            match format {
                OutputFormat::Table => output::print_app_info(&app),
                OutputFormat::Json => output::print_json(&app)?,
            }
        }
        AppSubcommand::Create { name, team, scale } => {
            let app = client
                .create_app(&NewApp {
                    name: name.clone(),
                    team,
                    scale,
                })
                .await
                .with_context(|| format!("Failed to create app '{}'", name))?;
            output::print_app_created(&app);
        }
        AppSubcommand::Env(EnvArgs { command }) => {
            let (name, operation) = match command {
                EnvSubcommand::Set { app, vars } => (app, PatchAppRequest::set_env(vars)),
                EnvSubcommand::Unset { app, keys } => (app, PatchAppRequest::unset_env(keys)),
            };
            let app = client
                .patch_app(&name, &[operation])
                .await
                .with_context(|| format!("Failed to update env vars of '{}'", name))?;
            output::print_env_vars(&app);
        }
    }
    Ok(())
}

async fn run_team(store: ConfigStore, command: TeamSubcommand) -> Result<()> {
    let client = AppContext::load(store)?.client()?;

    match command {
        TeamSubcommand::List { format } => {
            let teams = client.teams().await.context("Failed to list teams")?;
            match format {
                OutputFormat::Table => output::print_teams(&teams),
                OutputFormat::Json => output::print_json(&teams)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_flags_parse() {
        let cli = Cli::try_parse_from([
            "teresa",
            "deploy",
            "./site",
            "--app",
            "webapi",
            "--team",
            "web",
            "--description",
            "release 1.2",
            "--no-input",
            "--timeout",
            "60",
        ])
        .expect("deploy args should parse");

        match cli.command {
            Commands::Deploy(args) => {
                assert_eq!(args.dir, PathBuf::from("./site"));
                assert_eq!(args.app, "webapi");
                assert_eq!(args.team.as_deref(), Some("web"));
                assert_eq!(args.description.as_deref(), Some("release 1.2"));
                assert!(args.no_input);
                assert_eq!(args.timeout, Some(60));
            }
            _ => panic!("expected deploy command"),
        }
    }

    #[test]
    fn deploy_timeout_must_be_in_range() {
        for bad in ["0", "86401", "18446744073709551615"] {
            let result = Cli::try_parse_from([
                "teresa", "deploy", ".", "--app", "webapi", "--timeout", bad,
            ]);
            assert!(result.is_err(), "--timeout {bad} should be rejected");
        }
    }

    #[test]
    fn app_create_defaults_to_one_replica() {
        let cli = Cli::try_parse_from(["teresa", "app", "create", "webapi", "--team", "site"])
            .expect("app create should parse");
        match cli.command {
            Commands::App(AppArgs {
                command: AppSubcommand::Create { name, team, scale },
            }) => {
                assert_eq!(name, "webapi");
                assert_eq!(team.as_deref(), Some("site"));
                assert_eq!(scale, 1);
            }
            _ => panic!("expected app create"),
        }

        assert!(
            Cli::try_parse_from(["teresa", "app", "create", "webapi", "--scale", "0"]).is_err()
        );
    }

    #[test]
    fn env_set_splits_on_first_equals() {
        let cli = Cli::try_parse_from([
            "teresa", "app", "env", "set", "webapi", "PORT=8080", "DSN=a=b",
        ])
        .expect("env set should parse");
        match cli.command {
            Commands::App(AppArgs {
                command:
                    AppSubcommand::Env(EnvArgs {
                        command: EnvSubcommand::Set { app, vars },
                    }),
            }) => {
                assert_eq!(app, "webapi");
                assert_eq!(vars[0].key, "PORT");
                assert_eq!(vars[1].key, "DSN");
                assert_eq!(vars[1].value, "a=b");
            }
            _ => panic!("expected app env set"),
        }

        assert!(Cli::try_parse_from(["teresa", "app", "env", "set", "webapi", "PORT"]).is_err());
        assert!(Cli::try_parse_from(["teresa", "app", "env", "set", "webapi", "=x"]).is_err());
        assert!(Cli::try_parse_from(["teresa", "app", "env", "unset", "webapi"]).is_err());
    }

    #[test]
    fn deploy_requires_app() {
        assert!(Cli::try_parse_from(["teresa", "deploy", "."]).is_err());
    }

    #[test]
    fn config_set_cluster_parses() {
        let cli = Cli::try_parse_from([
            "teresa",
            "config",
            "set-cluster",
            "prod",
            "--server",
            "https://teresa.example.com",
            "--current",
        ])
        .expect("config args should parse");

        match cli.command {
            Commands::Config(ConfigArgs {
                command:
                    ConfigSubcommand::SetCluster {
                        name,
                        server,
                        current,
                    },
            }) => {
                assert_eq!(name, "prod");
                assert_eq!(server, "https://teresa.example.com");
                assert!(current);
            }
            _ => panic!("expected config set-cluster"),
        }
    }
}
