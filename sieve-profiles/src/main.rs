//! sieve-profiles - Manage ManageSieve connection profiles
//!
//! Lists, inspects and edits the named profiles under `~/.sieveprofiles`,
//! and selects which one a client opens by default.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use libsieveprofiles::logging::{LogFormat, LoggingConfig};
use libsieveprofiles::{
    Config, MigrationOutcome, SieveProfiles, SieveProfilesError, StoreConfig, DEFAULT_PROFILE,
};
use tracing::{debug, error};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "sieve-profiles")]
#[command(version)]
#[command(about = "Manage sieve server connection profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Home directory holding .sieveprofiles (default: $HOME)
    #[arg(long, global = true, env = "SIEVE_PROFILES_HOME")]
    home: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format (text, json, pretty)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// List available profiles (the last used one is marked with *)
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the settings of a profile (never the password)
    Show {
        /// Profile name (default: last used profile)
        profile: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        profile: String,

        /// Sieve server host
        #[arg(long)]
        server: Option<String>,

        /// Sieve server port
        #[arg(long)]
        port: Option<u16>,

        /// Login name
        #[arg(long)]
        user: Option<String>,

        /// Read the password from stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Make a profile the default for the next session
    Use {
        /// Profile name
        profile: String,
    },

    /// Copy the legacy ~/.sieveproperties into the default profile
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(cli.log_format, "warn".to_string(), cli.verbose).init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<SieveProfilesError>()
        .map(SieveProfilesError::exit_code)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    let profiles = SieveProfiles::new(store_config(cli.home, cli.config)?);
    debug!("Using profile storage at {:?}", profiles.config().root);

    // Startup migration; the explicit `migrate` command reports the outcome
    let outcome = profiles.migrate_legacy()?;

    match cli.command {
        Commands::List { format } => list_profiles(&profiles, format),
        Commands::Show { profile, format } => show_profile(&profiles, profile.as_deref(), format),
        Commands::Set {
            profile,
            server,
            port,
            user,
            password_stdin,
        } => set_profile(
            &profiles,
            &profile,
            server.as_deref(),
            port,
            user.as_deref(),
            password_stdin,
        ),
        Commands::Use { profile } => use_profile(&profiles, &profile),
        Commands::Migrate => report_migration(&profiles, outcome),
    }
}

/// Resolve storage locations from the flags, the config file and the environment
fn store_config(home: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<StoreConfig> {
    let config = match config_path {
        Some(path) => Config::load_from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };

    let store = match home {
        Some(home) => config.store_config_with_home(&home)?,
        None => config.store_config()?,
    };
    Ok(store)
}

fn list_profiles(profiles: &SieveProfiles, format: OutputFormat) -> Result<()> {
    let names = profiles.available_profiles();
    let last_used = profiles.last_used_profile();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "profiles": names,
                "last_used": last_used,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for name in &names {
                let marker = if *name == last_used { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }
    }

    Ok(())
}

fn show_profile(profiles: &SieveProfiles, name: Option<&str>, format: OutputFormat) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => selected_profile(profiles),
    };

    if name != DEFAULT_PROFILE && !profiles.profile_exists(&name) {
        anyhow::bail!(
            "Profile '{}' not found. Use 'sieve-profiles set {}' to create it.",
            name,
            name
        );
    }

    let mut store = profiles.open(Some(&name))?;
    store.load()?;
    let profile = store.profile();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "name": store.name(),
                "profile": profile,
                "password_stored": profile.has_password(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Profile:  {}", store.name());
            println!("Server:   {}", profile.server);
            println!("Port:     {}", profile.port);
            println!("User:     {}", profile.username);
            println!(
                "Password: {}",
                if profile.has_password() { "stored" } else { "not set" }
            );
        }
    }

    Ok(())
}

/// Last used profile, or the default one when none is recorded
fn selected_profile(profiles: &SieveProfiles) -> String {
    let last_used = profiles.last_used_profile();
    if last_used.is_empty() {
        DEFAULT_PROFILE.to_string()
    } else {
        last_used
    }
}

fn set_profile(
    profiles: &SieveProfiles,
    name: &str,
    server: Option<&str>,
    port: Option<u16>,
    user: Option<&str>,
    password_stdin: bool,
) -> Result<()> {
    let password = if password_stdin {
        Some(read_password_from_stdin()?)
    } else {
        None
    };

    let mut store = profiles.open(Some(name))?;
    store.load()?;

    if let Some(server) = server {
        store.set_server(server);
    }
    if let Some(port) = port {
        store.set_port(port);
    }
    if let Some(user) = user {
        store.set_username(user);
    }
    if let Some(password) = &password {
        store.set_password(password.as_str());
    }

    store.write()?;

    println!("✓ Saved profile '{}'", name);
    Ok(())
}

fn read_password_from_stdin() -> Result<Zeroizing<String>> {
    let mut buffer = Zeroizing::new(String::new());
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read password from stdin")?;

    let trimmed = buffer.trim_end_matches(['\n', '\r']);
    Ok(Zeroizing::new(trimmed.to_string()))
}

fn use_profile(profiles: &SieveProfiles, name: &str) -> Result<()> {
    // `default` is always selectable, even before its record exists
    if name != DEFAULT_PROFILE && !profiles.profile_exists(name) {
        anyhow::bail!(
            "Profile '{}' not found. Use 'sieve-profiles set {}' to create it.",
            name,
            name
        );
    }

    profiles.save_last_used_profile(name)?;

    println!("✓ Using profile '{}'", name);
    Ok(())
}

fn report_migration(profiles: &SieveProfiles, outcome: MigrationOutcome) -> Result<()> {
    let config = profiles.config();
    match outcome {
        MigrationOutcome::Migrated => println!(
            "✓ Migrated {} to the default profile",
            config.legacy_file.display()
        ),
        MigrationOutcome::DefaultExists => {
            println!("Default profile already exists, legacy settings left untouched")
        }
        MigrationOutcome::NoLegacyRecord => println!(
            "Nothing to migrate: {} not found",
            config.legacy_file.display()
        ),
    }
    Ok(())
}
