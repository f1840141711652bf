//! Headless Settings - settings gateway and required-extension manager.
//!
//! Operates on a local data directory holding the settings store, the
//! transient cache and the installed extensions.

#![allow(clippy::single_match_else)]

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use headless_settings::core::{
    Config, FileCache, HttpTransport, JsonFileStore, ReqwestTransport, RetryConfig, SettingsStore,
    STATUS_ACTION,
};
use headless_settings::extension::ExtensionStatus;
use headless_settings::gateway::schema;
use headless_settings::payment::IntentMode;
use headless_settings::seo::{DirectoryHeads, HeadOptions, SiteUrls};
use headless_settings::settings::{GlobalAttributeFilter, RequestContext, SettingsEditor};
use headless_settings::{Collaborators, ConfiguredCatalog, Gateway, GatewayError, LocalHost};

/// Settings gateway and required-extension manager for headless storefronts
#[derive(Parser)]
#[command(name = "headless-settings")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the configured one)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage required extensions
    Extensions {
        #[command(subcommand)]
        operation: ExtensionsOperation,
    },

    /// Check for and install host extension updates
    Update {
        #[command(subcommand)]
        operation: UpdateOperation,
    },

    /// Show and edit storefront settings
    Settings {
        #[command(subcommand)]
        operation: SettingsOperation,
    },

    /// Create a payment intent for the current cart
    PaymentIntent {
        /// Intent mode (PAYMENT or SETUP)
        #[arg(short, long)]
        mode: Option<IntentMode>,
    },

    /// Print a product's SEO head markup
    SeoHead {
        /// Product ID
        product_id: u64,

        /// Frontend base URL replacing the site URLs
        #[arg(long)]
        frontend_url: Option<String>,

        /// Image base URL replacing the uploads base
        #[arg(long)]
        image_url: Option<String>,

        /// Keep only allowlisted tags and attributes
        #[arg(long)]
        sanitize: bool,
    },

    /// Trigger a frontend build through the configured build hook
    Deploy,

    /// Print the GraphQL type declarations
    Schema,

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ExtensionsOperation {
    /// List required extensions and their state
    List,

    /// Report whether an extension is active
    Status {
        /// Extension slug
        slug: String,

        /// Activation path the caller expects (defaults to the catalog's)
        #[arg(long)]
        file: Option<String>,

        /// Action token (issued on the fly when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Install and activate an extension
    Install {
        /// Extension slug
        slug: String,

        /// Action token (issued on the fly when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Issue an action token
    Token {
        /// Action name
        action: String,
    },
}

#[derive(Subcommand)]
enum UpdateOperation {
    /// Compare the running version with the latest published one
    Check {
        /// Ignore the cached remote version
        #[arg(long)]
        refresh: bool,
    },

    /// Replace the host extension with the latest published version
    Install {
        /// Action token (issued on the fly when omitted)
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsOperation {
    /// Print the aggregated settings snapshot
    Show {
        /// Host header to report as the request domain
        #[arg(long)]
        host: Option<String>,
    },

    /// Save settings from a JSON file ("-" reads stdin)
    Save {
        /// JSON file with the submitted settings
        file: PathBuf,
    },

    /// Edit the global attribute filter list
    Attribute {
        #[command(subcommand)]
        operation: AttributeOperation,
    },
}

#[derive(Subcommand)]
enum AttributeOperation {
    /// Append an attribute filter
    Add {
        /// Filter label
        label: String,

        /// Product attribute slug
        slug: String,

        /// Show per-term counts
        #[arg(long)]
        show_count: bool,

        /// Hide terms without products
        #[arg(long)]
        hide_empty: bool,

        /// Expand the filter by default
        #[arg(long)]
        open: bool,
    },

    /// Move a filter one position up
    MoveUp { index: usize },

    /// Move a filter one position down
    MoveDown { index: usize },

    /// Remove a filter
    Remove { index: usize },
}

/// Everything a command needs, wired from configuration.
struct AppContext {
    gateway: Gateway,
    editor: SettingsEditor,
}

impl AppContext {
    fn open(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => config
                .data_dir()
                .context("no data directory available; pass --data-dir or set [general] data_dir")?,
        };
        Self::build(&config, &data_dir)
    }

    fn build(config: &Config, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let retry = RetryConfig::with_retries(config.general.http_retries);
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::with_retry(retry)?);
        let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(data_dir.join("settings.json")));
        let catalog = Arc::new(ConfiguredCatalog::new(config.commerce.clone()));
        let host = Arc::new(LocalHost::new(data_dir.join("extensions"), transport.clone())?);

        let gateway = Gateway::new(
            config,
            Collaborators {
                host,
                transport: transport.clone(),
                store: store.clone(),
                cache: Arc::new(FileCache::new(data_dir.join("cache.json"))),
                catalog: catalog.clone(),
                currency: catalog.clone(),
                cart: catalog.clone(),
                seo: Arc::new(DirectoryHeads::new(
                    config.seo.heads_dir(data_dir),
                    SiteUrls::from_config(&config.seo),
                )),
            },
        )?;
        let editor = SettingsEditor::new(store, catalog, transport);

        tracing::debug!(data_dir = %data_dir.display(), "context ready");
        Ok(Self { gateway, editor })
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let open = || AppContext::open(cli.config.as_deref(), cli.data_dir.as_deref());

    match cli.command {
        Commands::Extensions { operation } => cmd_extensions(&open()?, operation, cli.format),
        Commands::Update { operation } => cmd_update(&open()?, operation, cli.format),
        Commands::Settings { operation } => cmd_settings(&open()?, operation, cli.format),
        Commands::PaymentIntent { mode } => cmd_payment_intent(&open()?, mode, cli.format),
        Commands::SeoHead { product_id, frontend_url, image_url, sanitize } => {
            let options = HeadOptions { frontend_url, image_url, sanitize };
            cmd_seo_head(&open()?, product_id, &options, cli.format)
        }
        Commands::Deploy => cmd_deploy(&open()?),
        Commands::Schema => {
            print!("{}", schema::sdl());
            Ok(())
        }
        Commands::Config { path } => cmd_config(cli.config.as_deref(), path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load_from_file(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Config::load(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn token_or_issue(gateway: &Gateway, token: Option<String>, action: &str) -> Result<String> {
    match token {
        Some(token) => Ok(token),
        None => Ok(gateway.issue_token(action)?),
    }
}

/// Handle extension commands.
fn cmd_extensions(ctx: &AppContext, operation: ExtensionsOperation, format: Format) -> Result<()> {
    let gateway = &ctx.gateway;

    match operation {
        ExtensionsOperation::List => {
            let states = gateway.extension_states();

            if format == Format::Json {
                let rows: Vec<_> = states
                    .iter()
                    .map(|(descriptor, state)| {
                        serde_json::json!({
                            "slug": descriptor.slug,
                            "name": descriptor.display_name,
                            "activationPath": descriptor.activation_path,
                            "state": state,
                        })
                    })
                    .collect();
                return print_json(&rows);
            }

            for (descriptor, state) in &states {
                println!(
                    "{} {:<32} {:<20} {}",
                    state.icon(),
                    descriptor.display_name,
                    state.display_name(),
                    descriptor.slug
                );
            }

            if gateway.all_active() {
                println!("\nAll required extensions are active.");
            }
        }
        ExtensionsOperation::Status { slug, file, token } => {
            let token = token_or_issue(gateway, token, STATUS_ACTION)?;
            let file = match file {
                Some(file) => file,
                None => gateway.registry().resolve(&slug)?.activation_path.clone(),
            };

            let status: ExtensionStatus = gateway.check_extension_status(&slug, &file, &token)?;
            match format {
                Format::Json => print_json(&serde_json::json!({ "status": status.as_str() }))?,
                Format::Text => println!("{}", status.as_str()),
            }
        }
        ExtensionsOperation::Install { slug, token } => {
            let token = token_or_issue(gateway, token, headless_settings::core::INSTALL_ACTION)?;

            match gateway.install_extension(&slug, &token) {
                Ok(redirect) => {
                    println!("Installed and activated '{slug}'.");
                    println!("Continue at: {}", redirect.location);
                }
                Err(GatewayError::Lifecycle(e)) => {
                    let retry = gateway.install_url(&slug);
                    anyhow::bail!("{}", e.user_message(retry.as_deref()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        ExtensionsOperation::Token { action } => {
            println!("{}", gateway.issue_token(&action)?);
        }
    }

    Ok(())
}

/// Handle update commands.
fn cmd_update(ctx: &AppContext, operation: UpdateOperation, format: Format) -> Result<()> {
    let gateway = &ctx.gateway;

    match operation {
        UpdateOperation::Check { refresh } => {
            if refresh {
                gateway.refresh_version();
            }

            let info = gateway.version_info();
            if format == Format::Json {
                return print_json(&serde_json::json!({
                    "current": info.current,
                    "remote": info.remote,
                    "updateAvailable": info.update_available(),
                }));
            }

            println!("Current version: {}", info.current);
            if info.remote_unknown() {
                println!("Latest version:  unknown (remote feed unavailable)");
            } else {
                println!("Latest version:  {}", info.remote);
            }

            if info.update_available() {
                println!("\nAn update is available. Run 'headless-settings update install'.");
            }
        }
        UpdateOperation::Install { token } => {
            let token = token_or_issue(gateway, token, headless_settings::core::SELF_UPDATE_ACTION)?;

            match gateway.self_update(&token) {
                Ok(report) => match format {
                    Format::Json => print_json(&report)?,
                    Format::Text => println!("Updated to {}.", report.target_version),
                },
                Err(GatewayError::Lifecycle(e)) => anyhow::bail!("{}", e.user_message(None)),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Handle settings commands.
fn cmd_settings(ctx: &AppContext, operation: SettingsOperation, format: Format) -> Result<()> {
    match operation {
        SettingsOperation::Show { host } => {
            let snapshot = ctx.gateway.settings(&RequestContext { host });

            match format {
                Format::Json => print_json(&snapshot)?,
                Format::Text => {
                    println!("Primary color:     {}", snapshot.primary_color);
                    println!("Logo:              {}", snapshot.logo);
                    println!("Products per page: {}", snapshot.products_per_page);
                    println!("Frontend URL:      {}", snapshot.front_end_url);
                    if let Some(max_price) = snapshot.max_price {
                        println!("Max price:         {max_price}");
                    }
                    if let (Some(code), Some(symbol)) = (&snapshot.currency_code, &snapshot.currency_symbol) {
                        println!("Currency:          {code} ({symbol})");
                    }
                    println!("Version:           {}", snapshot.host_extension_version);

                    if !snapshot.global_attributes.is_empty() {
                        println!("\nAttribute filters:");
                        for (i, filter) in snapshot.global_attributes.iter().enumerate() {
                            println!("  {}. {} ({})", i, filter.label, filter.attribute_slug);
                        }
                    }
                }
            }
        }
        SettingsOperation::Save { file } => {
            let raw = read_input(&file)?;
            let submitted: serde_json::Value =
                serde_json::from_str(&raw).context("settings must be a JSON object")?;

            let saved = ctx.editor.save(&submitted)?;
            match format {
                Format::Json => print_json(&saved)?,
                Format::Text => println!("Settings saved."),
            }
        }
        SettingsOperation::Attribute { operation } => cmd_attribute(&ctx.editor, operation)?,
    }

    Ok(())
}

fn cmd_attribute(editor: &SettingsEditor, operation: AttributeOperation) -> Result<()> {
    match operation {
        AttributeOperation::Add { label, slug, show_count, hide_empty, open } => {
            let mut filter = GlobalAttributeFilter::new(label, slug);
            filter.show_count = show_count;
            filter.hide_empty = hide_empty;
            filter.open_by_default = open;

            let saved = editor.add_attribute(filter)?;
            println!("Added filter at position {}.", saved.global_attributes.len() - 1);
        }
        AttributeOperation::MoveUp { index } => {
            if !editor.move_attribute_up(index)? {
                println!("Filter {index} is already first.");
            }
        }
        AttributeOperation::MoveDown { index } => {
            if !editor.move_attribute_down(index)? {
                println!("Filter {index} is already last.");
            }
        }
        AttributeOperation::Remove { index } => {
            let removed = editor.remove_attribute(index)?;
            println!("Removed filter '{}'.", removed.label);
        }
    }

    Ok(())
}

/// Handle the SEO head command.
fn cmd_seo_head(ctx: &AppContext, product_id: u64, options: &HeadOptions, format: Format) -> Result<()> {
    let head = ctx.gateway.full_seo_head(product_id, options);

    match (format, head) {
        (Format::Json, head) => print_json(&serde_json::json!({ "fullYoastHead": head }))?,
        (Format::Text, Some(head)) => println!("{head}"),
        (Format::Text, None) => eprintln!("No SEO head exported for product {product_id}."),
    }

    Ok(())
}

/// Handle the payment intent command.
fn cmd_payment_intent(ctx: &AppContext, mode: Option<IntentMode>, format: Format) -> Result<()> {
    let result = ctx.gateway.payment_intent(mode);

    if format == Format::Json {
        return print_json(&result);
    }

    match &result.error {
        Some(error) => anyhow::bail!("Payment intent failed: {error}"),
        None => {
            println!("Intent:  {}", result.id.as_deref().unwrap_or_default());
            println!("Mode:    {}", result.mode);
            println!("Amount:  {} {}", result.amount, result.currency);
        }
    }

    Ok(())
}

/// Trigger a frontend build.
fn cmd_deploy(ctx: &AppContext) -> Result<()> {
    let status = ctx.editor.trigger_build()?;
    println!("Build triggered (HTTP {status}).");
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "headless-settings", &mut io::stdout());
}

/// Show configuration or its location.
fn cmd_config(explicit: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match explicit {
            Some(path) => println!("{}", path.display()),
            None => {
                if let Some(path) = Config::config_dir() {
                    println!("{}", path.display());
                }
            }
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}
