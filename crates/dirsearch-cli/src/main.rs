//! Dirsearch CLI - principal search by attributes and groups

use clap::{Parser, Subcommand};
use dirsearch_core::config::Config;
use dirsearch_core::domain::directory::{DirectoryFixture, DirectoryStore};
use dirsearch_core::domain::search::request::LABEL_PARAM;
use dirsearch_core::domain::search::{
    FieldCategory, IndexRequest, IndexResponse, SearchRequest, SearchResponse, SearchService,
    classify,
};
use dirsearch_core::storage::Database;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "dirsearch")]
#[command(author, version, about = "Principal search by attributes and groups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Database file (overrides database.path)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load realms, principals, attributes and groups from a JSON fixture
    Import {
        /// Fixture file
        fixture: PathBuf,
    },

    /// Search principals, paged and ordered
    Search {
        /// Realm name or id (defaults to search.default_realm)
        #[arg(short, long)]
        realm: Option<String>,
        /// Filters and reserved parameters as key=value (e.g. city=Moscow _max=10)
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Count principals matching filters
    Count {
        #[arg(short, long)]
        realm: Option<String>,
        /// Filters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// List distinct values of one field among matching principals
    Index {
        #[arg(short, long)]
        realm: Option<String>,
        /// Field to index (same as _label=...)
        #[arg(short, long)]
        label: Option<String>,
        /// Filters and reserved parameters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Show how a field name is resolved
    Classify {
        /// Field name
        label: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,

    /// Show version information
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the whole configuration as TOML
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// Parse one `key=value` query parameter
fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing; stdout is reserved for command output
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "dirsearch=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<dirsearch_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };
    let database = cli.database.as_deref();

    match cli.command {
        Commands::Import { fixture } => {
            let (_, db) = connect(database).await?;
            cmd_import(&db, &fixture, out).await
        }
        Commands::Search { realm, params } => {
            let (config, db) = connect(database).await?;
            let realm = resolve_realm(realm, &config)?;
            cmd_search(&search_service(&db, &config)?, &realm, params, out).await
        }
        Commands::Count { realm, params } => {
            let (config, db) = connect(database).await?;
            let realm = resolve_realm(realm, &config)?;
            cmd_count(&search_service(&db, &config)?, &realm, params, out).await
        }
        Commands::Index {
            realm,
            label,
            mut params,
        } => {
            let (config, db) = connect(database).await?;
            let realm = resolve_realm(realm, &config)?;
            if let Some(label) = label {
                params.insert(0, (LABEL_PARAM.to_string(), label));
            }
            cmd_index(&search_service(&db, &config)?, &realm, params, out).await
        }
        Commands::Classify { label } => cmd_classify(&label, out),
        Commands::Config { action } => cmd_config(action, out),
        Commands::Doctor => {
            let (config, db) = connect(database).await?;
            cmd_doctor(&db, &config, out).await
        }
        Commands::Info => cmd_info(out),
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Load the configuration and open the database it names
async fn connect(database: Option<&Path>) -> anyhow::Result<(Config, Database)> {
    let config = Config::load()?;
    let mut db_config = config.database_config();
    if let Some(path) = database {
        db_config.path = path.to_path_buf();
    }
    debug!(path = %db_config.path.display(), "Opening directory database");
    let db = Database::new(db_config).await?;
    Ok((config, db))
}

fn search_service(db: &Database, config: &Config) -> anyhow::Result<SearchService> {
    Ok(SearchService::with_options(
        db.pool().clone(),
        config.search_options(),
        config.request_defaults()?,
    ))
}

fn resolve_realm(realm: Option<String>, config: &Config) -> anyhow::Result<String> {
    realm
        .or_else(|| config.search.default_realm.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No realm given. Pass --realm or run `dirsearch config set search.default_realm <name>`."
            )
        })
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_import(db: &Database, fixture: &Path, out: Output) -> anyhow::Result<()> {
    let directory = DirectoryFixture::from_file(fixture)?;
    let store = DirectoryStore::new(db.pool().clone());
    let result = directory.import(&store).await?;

    if out.json() {
        return out.print_json(&result);
    }
    if !out.quiet {
        println!("Import completed successfully!");
        println!("  Realms: {}", result.realms);
        println!("  Principals: {}", result.principals);
        println!("  Attributes: {}", result.attributes);
        println!("  Groups: {}", result.groups);
        println!("  Memberships: {}", result.memberships);
    }
    Ok(())
}

async fn cmd_search(
    service: &SearchService,
    realm: &str,
    params: Vec<(String, String)>,
    out: Output,
) -> anyhow::Result<()> {
    let request = SearchRequest::from_params(params, service.defaults())?;
    let response = service.search(realm, &request).await?;

    if out.json() {
        return out.print_json(&response);
    }
    print_search(&response, out.quiet);
    Ok(())
}

fn print_search(response: &SearchResponse, quiet: bool) {
    if !quiet {
        println!("Found {} principal(s)", response.total_size);
        if response.principals.is_empty() {
            return;
        }
        println!();
    }

    for principal in &response.principals {
        let name = [principal.first_name.as_deref(), principal.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "  {:<20} {:<30} {}",
            principal.username,
            principal.email.as_deref().unwrap_or("-"),
            name
        );
    }
}

async fn cmd_count(
    service: &SearchService,
    realm: &str,
    params: Vec<(String, String)>,
    out: Output,
) -> anyhow::Result<()> {
    let request = SearchRequest::from_params(params, service.defaults())?;
    let total = service.count_principals(realm, &request.filters).await?;

    if out.json() {
        return out.print_json(&serde_json::json!({ "totalSize": total }));
    }
    println!("{}", total);
    Ok(())
}

async fn cmd_index(
    service: &SearchService,
    realm: &str,
    params: Vec<(String, String)>,
    out: Output,
) -> anyhow::Result<()> {
    let request = IndexRequest::from_params(params, service.defaults())?;
    let response = service.index_page(realm, &request).await?;

    if out.json() {
        return out.print_json(&response);
    }
    print_index(&request.label, &response, out.quiet);
    Ok(())
}

fn print_index(label: &str, response: &IndexResponse, quiet: bool) {
    if !quiet {
        println!("Found {} distinct value(s) for '{}'", response.total_size, label);
        if response.values.is_empty() {
            return;
        }
        println!();
    }
    for value in &response.values {
        println!("  {}", value);
    }
}

fn cmd_classify(label: &str, out: Output) -> anyhow::Result<()> {
    let category = classify(label);

    if out.json() {
        return out.print_json(&category);
    }
    match &category {
        FieldCategory::Default(field) => {
            println!("{}: built-in field (column {})", label, field.column())
        }
        FieldCategory::Group => println!("{}: group membership", label),
        FieldCategory::Attribute(name) => println!("{}: attribute '{}'", label, name),
    }
    Ok(())
}

fn cmd_info(out: Output) -> anyhow::Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    if out.json() {
        return out.print_json(&serde_json::json!({
            "name": "dirsearch",
            "version": version,
        }));
    }
    println!("dirsearch {}: principal search over attributes and groups", version);
    if !out.quiet {
        if let Ok(path) = Config::config_path() {
            println!("  Config: {}", path.display());
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, out: Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            if out.json() {
                return out.print_json(&config);
            }
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !out.quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !out.quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(db: &Database, config: &Config, out: Output) -> anyhow::Result<()> {
    let quiet = out.quiet;
    if !quiet {
        println!("Dirsearch Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    match config.validate() {
        Ok(()) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    match db.health_check().await {
        Ok(()) => {
            if !quiet {
                println!("[OK] Database: Connected");
                println!("     Path: {}", db.path().display());
            }
        }
        Err(e) => {
            all_ok = false;
            warn!(error = %e, "Database health check failed");
            if !quiet {
                println!("[!!] Database: Health check failed - {}", e);
            }
        }
    }

    match db.migration_status().await {
        Ok(status) if status.needs_migration => {
            all_ok = false;
            if !quiet {
                println!(
                    "[!!] Database: Migrations pending (v{} -> v{})",
                    status.current_version, status.target_version
                );
            }
        }
        Ok(status) => {
            if !quiet {
                println!("[OK] Database: Schema v{}", status.current_version);
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Migration check failed - {}", e);
            }
        }
    }

    let store = DirectoryStore::new(db.pool().clone());
    if !check_realms(&store, quiet).await {
        all_ok = false;
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}

/// Report each realm's principal count; false when any lookup fails
async fn check_realms(store: &DirectoryStore, quiet: bool) -> bool {
    let realms = match store.list_realms().await {
        Ok(realms) => realms,
        Err(e) => {
            if !quiet {
                println!("[!!] Database: Failed to list realms - {}", e);
            }
            return false;
        }
    };

    if !quiet {
        println!("     Realms: {}", realms.len());
    }
    let mut ok = true;
    for realm in &realms {
        match store.count_principals(&realm.id).await {
            Ok(principals) => {
                if !quiet {
                    println!("       {} ({} principals)", realm.name, principals);
                }
            }
            Err(e) => {
                ok = false;
                warn!(realm = %realm.name, error = %e, "Failed to count principals");
                if !quiet {
                    println!(
                        "[!!] Database: Failed to count principals in {} - {}",
                        realm.name, e
                    );
                }
            }
        }
    }
    ok
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
