//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use contentseed_core::{ContentFactory, TemplateMap, load_template_file};
use contentseed_shared::{
    AppConfig, AssetProps, ClientConfig, ContentSeedError, FactoryOptions, init_config,
    load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{error, info};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contentseed — create entries and assets from data and templates.
#[derive(Parser)]
#[command(
    name = "contentseed",
    version,
    about = "Create entries and assets in a content space from JSON data and declarative templates.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.contentseed/contentseed.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where and how to write.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct TargetArgs {
    /// Space id (overrides config).
    #[arg(long, env = "CONTENTFUL_SPACE_ID")]
    pub space: Option<String>,

    /// Environment id (overrides config).
    #[arg(long)]
    pub environment: Option<String>,

    /// Build payloads and print them without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Create without publishing.
    #[arg(long)]
    pub no_publish: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create entries of a content type from a JSON data file.
    Create {
        /// Content type to create.
        content_type: String,

        /// JSON file holding one record or an array of records.
        #[arg(long)]
        data: PathBuf,

        /// Template file (.toml or .json; defaults to the configured one).
        #[arg(long)]
        templates: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Create a single asset from a public URL.
    Asset {
        /// Asset title and file name.
        #[arg(long)]
        name: String,

        /// MIME type, e.g. image/png.
        #[arg(long = "type")]
        content_type: String,

        /// URL the file is fetched from.
        #[arg(long)]
        url: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Template file utilities.
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Template subcommands.
#[derive(Subcommand)]
pub(crate) enum TemplatesAction {
    /// Parse and validate a template file, then list its fields.
    Check {
        /// Template file (defaults to the configured one).
        #[arg(long)]
        templates: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Crate targets that get the verbosity level by default.
const LOG_TARGETS: &[&str] = &[
    "contentseed",
    "contentseed_core",
    "contentseed_client",
    "contentseed_shared",
];

fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Create {
            content_type,
            data,
            templates,
            target,
        } => cmd_create(&config, &content_type, &data, templates.as_deref(), &target).await,
        Command::Asset {
            name,
            content_type,
            url,
            target,
        } => {
            let props = AssetProps {
                name,
                content_type,
                url,
            };
            cmd_asset(&config, &props, &target).await
        }
        Command::Templates { action } => match action {
            TemplatesAction::Check { templates } => cmd_templates_check(&config, templates.as_deref()),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Merge config-file options with CLI overrides.
fn factory_options(config: &AppConfig, target: &TargetArgs) -> FactoryOptions {
    let mut options = FactoryOptions::from(config);
    if let Some(space) = &target.space {
        options.space_id = space.clone();
    }
    if let Some(environment) = &target.environment {
        options.environment = environment.clone();
    }
    if target.dry_run {
        options.dry_run = true;
    }
    if target.no_publish {
        options.publish = Some(false);
    }
    options
}

/// Template file from the flag, else from the config.
fn templates_path(config: &AppConfig, flag: Option<&Path>) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| config.defaults.templates.as_ref().map(PathBuf::from))
        .ok_or_else(|| eyre!("no template file given: pass --templates or set defaults.templates"))
}

/// Records held by a data file: a single object or an array of them.
fn records_from(data: Value) -> Vec<Value> {
    match data {
        Value::Array(records) => records,
        record => vec![record],
    }
}

fn read_records(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentSeedError::io(path, e))?;
    let data: Value = serde_json::from_str(&content)
        .map_err(|e| ContentSeedError::parse(format!("{}: {e}", path.display())))?;
    Ok(records_from(data))
}

async fn connect(
    config: &AppConfig,
    target: &TargetArgs,
    templates: TemplateMap,
) -> Result<ContentFactory> {
    let options = factory_options(config, target);
    let client_config = ClientConfig::from_app_config(config)?;
    Ok(ContentFactory::connect_http(&client_config, options, templates).await?)
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_create(
    config: &AppConfig,
    content_type: &str,
    data: &Path,
    templates: Option<&Path>,
    target: &TargetArgs,
) -> Result<()> {
    let templates = load_template_file(&templates_path(config, templates)?)?.into_templates();
    if !templates.contains(content_type) {
        return Err(eyre!("template file has no content type '{content_type}'"));
    }

    let records = read_records(data)?;
    let factory = connect(config, target, templates).await?;

    info!(
        content_type,
        records = records.len(),
        dry_run = factory.is_dry_run(),
        publish = factory.publishes(),
        "creating entries"
    );

    let progress = spinner();
    let total = records.len();
    let mut failures = 0usize;

    // Sequential on purpose: records may create shared related content.
    for (index, record) in records.iter().enumerate() {
        progress.set_message(format!("Creating [{}/{total}] {content_type}", index + 1));
        match factory.create_entry(content_type, record).await {
            Ok(created) => progress.suspend(|| println!("{}", created.to_value())),
            Err(e) => {
                failures += 1;
                error!(index, kind = %e.kind(), error = %e, "record failed");
            }
        }
    }
    progress.finish_and_clear();

    if failures > 0 {
        return Err(eyre!("{failures} of {total} records failed"));
    }
    Ok(())
}

async fn cmd_asset(config: &AppConfig, props: &AssetProps, target: &TargetArgs) -> Result<()> {
    Url::parse(&props.url).map_err(|e| eyre!("invalid URL '{}': {e}", props.url))?;

    let factory = connect(config, target, TemplateMap::new()).await?;
    let created = factory.create_asset(props).await?;
    println!("{}", created.to_value());
    Ok(())
}

fn cmd_templates_check(config: &AppConfig, templates: Option<&Path>) -> Result<()> {
    let path = templates_path(config, templates)?;
    let file = load_template_file(&path)?;

    println!("{}: {} content types", path.display(), file.content_types.len());
    for (content_type, spec) in &file.content_types {
        println!("  {content_type}");
        for (field, decl) in &spec.fields {
            match decl.references() {
                Some(target) => println!("    {field} -> {target}"),
                None => println!("    {field}"),
            }
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cli_parses_create() {
        let cli = Cli::try_parse_from([
            "contentseed",
            "create",
            "post",
            "--data",
            "posts.json",
            "--dry-run",
            "--space",
            "sp1",
        ])
        .expect("parse");
        match cli.command {
            Command::Create {
                content_type,
                target,
                ..
            } => {
                assert_eq!(content_type, "post");
                assert!(target.dry_run);
                assert_eq!(target.space.as_deref(), Some("sp1"));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn default_filter_covers_library_crates() {
        let filter = default_filter(1);
        assert!(filter.contains("contentseed_core=debug"));
        assert!(filter.contains("contentseed=debug"));
    }

    #[test]
    fn dry_run_flag_disables_publish() {
        let config = AppConfig::default();
        let target = TargetArgs {
            dry_run: true,
            ..TargetArgs::default()
        };
        let options = factory_options(&config, &target);
        assert!(options.dry_run);
        assert!(!options.publishes());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AppConfig::default();
        config.contentful.space_id = "from-config".into();
        let target = TargetArgs {
            space: Some("from-flag".into()),
            environment: Some("staging".into()),
            no_publish: true,
            ..TargetArgs::default()
        };
        let options = factory_options(&config, &target);
        assert_eq!(options.space_id, "from-flag");
        assert_eq!(options.environment, "staging");
        assert!(!options.dry_run);
        assert!(!options.publishes());
    }

    #[test]
    fn records_accept_object_or_array() {
        assert_eq!(records_from(json!({"a": 1})).len(), 1);
        assert_eq!(records_from(json!([{"a": 1}, {"a": 2}])).len(), 2);
    }

    #[test]
    fn templates_path_falls_back_to_config() {
        let mut config = AppConfig::default();
        assert!(templates_path(&config, None).is_err());

        config.defaults.templates = Some("blog.toml".into());
        assert_eq!(templates_path(&config, None).unwrap(), PathBuf::from("blog.toml"));
        assert_eq!(
            templates_path(&config, Some(Path::new("other.toml"))).unwrap(),
            PathBuf::from("other.toml")
        );
    }
}
