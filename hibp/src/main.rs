//! hibp CLI Application
//!
//! A command-line interface for querying the Have I Been Pwned breach API.
//! Builds queries from arguments and files, runs them concurrently through
//! hibp-lib and prints one line (or JSON object) per query.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args as ClapArgs, Parser, Subcommand};
use futures::StreamExt;
use hibp_lib::{load_env_config, parse_duration_string, ConfigManager, EnvConfig, FileConfig};
use hibp_lib::{
    read_parameters_from_file, DispatchConfig, Dispatcher, HibpError, QueryBuilder, QueryRequest,
    MAX_CONCURRENCY,
};
use std::collections::HashSet;
use std::process;
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use ui::Summary;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for hibp
#[derive(Parser, Debug)]
#[command(name = "hibp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query the Have I Been Pwned breach API concurrently")]
#[command(
    long_about = "Query the Have I Been Pwned breach API concurrently.\n\nLook up accounts, domains and breaches in bulk with a bounded number of requests in flight and a deadline for the whole batch."
)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Max concurrent queries (default: one per query, max: 100)
    #[arg(
        short = 'c',
        long = "concurrency",
        global = true,
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Deadline for the whole batch, e.g. "10s", "2m" (default: 10s)
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "DURATION",
        global = true,
        help_heading = "Performance"
    )]
    pub timeout: Option<String>,

    /// Timeout for each HTTP call (default: 5s)
    #[arg(
        long = "request-timeout",
        value_name = "DURATION",
        global = true,
        help_heading = "Performance"
    )]
    pub request_timeout: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", global = true, help_heading = "Output Format")]
    pub json: bool,

    /// Show results as they complete instead of in submission order
    #[arg(long = "streaming", global = true, help_heading = "Output Format")]
    pub streaming: bool,

    /// Query a different API root (mirrors, test servers)
    #[arg(
        long = "base-url",
        value_name = "URL",
        global = true,
        help_heading = "Configuration"
    )]
    pub base_url: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(
        long = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find the breaches an account (email address or username) appears in
    Account(ParamArgs),

    /// Find the breaches recorded against a domain
    Domain(ParamArgs),

    /// Look up breaches by name
    Breach(ParamArgs),

    /// List every breach in the system
    Breaches,

    /// List the data classes breaches are tagged with
    Dataclasses,
}

/// Values for a parameterised query, inline or from a file.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Values to query
    #[arg(value_name = "VALUE")]
    pub values: Vec<String>,

    /// Input file with values (one per line, '#' starts a comment)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<String>,
}

/// Output settings resolved from flags and config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub json: bool,
    pub streaming: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "hibp=debug,hibp_lib=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    for (flag, value) in [
        ("--timeout", &args.timeout),
        ("--request-timeout", &args.request_timeout),
    ] {
        if let Some(value) = value {
            if parse_duration_string(value).is_none() {
                return Err(format!(
                    "Invalid {} value '{}'. Use format like '5s', '2m', '500ms'",
                    flag, value
                ));
            }
        }
    }

    if let Some(base_url) = &args.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err("--base-url must start with http:// or https://".to_string());
        }
    }

    Ok(())
}

/// Main query logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (config, output) = build_config(&args)?;

    let dispatcher = Dispatcher::with_config(config)?;
    let requests = build_requests(&args.command, &dispatcher.query_builder()?)?;

    debug!(
        queries = requests.len(),
        concurrency = dispatcher.config().effective_concurrency(requests.len()),
        timeout = ?dispatcher.config().timeout,
        "Starting run"
    );

    if output.streaming {
        run_streaming(&dispatcher, requests, output).await
    } else {
        run_batch(&dispatcher, requests, output).await
    }
}

/// Run the queries and print results in submission order once all are done.
async fn run_batch(
    dispatcher: &Dispatcher,
    requests: Vec<QueryRequest>,
    output: OutputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = dispatcher.run_all(requests).await;

    if output.json {
        println!("{}", ui::render_json(batch.iter())?);
        return Ok(());
    }

    let mut summary = Summary::default();
    for request in batch.iter() {
        summary.record(request.outcome());
        ui::print_result(request, None);
    }

    if summary.total() > 1 || summary.has_errors() {
        ui::print_summary(&summary, batch.elapsed);
    }

    Ok(())
}

/// Run the queries and print each result as soon as it completes.
///
/// JSON output becomes one object per line.
async fn run_streaming(
    dispatcher: &Dispatcher,
    requests: Vec<QueryRequest>,
    output: OutputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = requests.len();
    let start_time = Instant::now();
    let mut stream = Box::pin(dispatcher.run_lazy(requests));

    let mut summary = Summary::default();
    let mut completed = 0usize;

    while let Some(request) = stream.next().await {
        completed += 1;
        summary.record(request.outcome());

        if output.json {
            println!("{}", ui::render_json_line(&request)?);
        } else {
            let counter = (total > 1).then_some((completed, total));
            ui::print_result(&request, counter);
        }
    }

    if !output.json && (total > 1 || summary.has_errors()) {
        ui::print_summary(&summary, start_time.elapsed());
    }

    Ok(())
}

/// Build the dispatcher configuration and output options.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (HIBP_*)
/// 3. Local config file (./hibp.toml or ./.hibp.toml)
/// 4. Global config file (~/.hibp.toml)
/// 5. XDG config file (~/.config/hibp/config.toml)
/// 6. Built-in defaults
fn build_config(
    args: &Args,
) -> Result<(DispatchConfig, OutputOptions), Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new(args.verbose);

    let explicit_path = args.config.as_ref().or(env_config.config.as_ref());
    let file_config = match explicit_path {
        Some(path) => {
            debug!(path = %path, "Using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => match config_manager.discover_and_load() {
            Ok(file_config) => file_config,
            Err(e) => {
                warn!(error = %e, "Config discovery failed, using defaults");
                FileConfig::default()
            }
        },
    };

    resolve_config(&file_config, &env_config, args)
}

/// Layer file, environment and CLI settings over the defaults.
fn resolve_config(
    file_config: &FileConfig,
    env_config: &EnvConfig,
    args: &Args,
) -> Result<(DispatchConfig, OutputOptions), Box<dyn std::error::Error>> {
    let config = file_config.apply_to(DispatchConfig::default());
    let config = env_config.apply_to(config);
    let config = apply_cli_args_to_config(config, args)?;

    let file_defaults = file_config.defaults.as_ref();
    let output = OutputOptions {
        json: args.json || file_defaults.and_then(|d| d.json).unwrap_or(false),
        streaming: args.streaming || file_defaults.and_then(|d| d.streaming).unwrap_or(false),
    };

    Ok((config, output))
}

/// Apply CLI arguments to config (highest precedence).
fn apply_cli_args_to_config(
    mut config: DispatchConfig,
    args: &Args,
) -> Result<DispatchConfig, Box<dyn std::error::Error>> {
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = &args.timeout {
        config.timeout = parse_duration_string(timeout)
            .ok_or_else(|| format!("Invalid --timeout value '{}'", timeout))?;
    }
    if let Some(timeout) = &args.request_timeout {
        config.request_timeout = parse_duration_string(timeout)
            .ok_or_else(|| format!("Invalid --request-timeout value '{}'", timeout))?;
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }

    Ok(config)
}

/// Turn the subcommand into query requests.
///
/// Fails before any network call if a value does not validate.
fn build_requests(
    command: &Command,
    builder: &QueryBuilder,
) -> Result<Vec<QueryRequest>, Box<dyn std::error::Error>> {
    let requests = match command {
        Command::Account(params) => collect_parameters(params, "account")?
            .iter()
            .map(|account| builder.for_account(account))
            .collect::<Result<Vec<_>, HibpError>>()?,
        Command::Domain(params) => collect_parameters(params, "domain")?
            .iter()
            .map(|domain| builder.for_domain(domain))
            .collect::<Result<Vec<_>, HibpError>>()?,
        Command::Breach(params) => collect_parameters(params, "breach name")?
            .iter()
            .map(|name| builder.for_breach_name(name))
            .collect(),
        Command::Breaches => vec![builder.for_all_breaches()],
        Command::Dataclasses => vec![builder.for_data_classes()],
    };

    Ok(requests)
}

/// Gather values from arguments and `--file`, dropping duplicates but
/// keeping first-seen order.
fn collect_parameters(
    params: &ParamArgs,
    what: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut values: Vec<String> = params.values.iter().map(|v| v.trim().to_string()).collect();

    if let Some(path) = &params.file {
        values.extend(read_parameters_from_file(path)?);
    }

    if values.is_empty() {
        return Err(format!("You must specify at least one {} or a file with --file", what).into());
    }

    if let Some(blank) = values.iter().find(|v| v.is_empty()) {
        return Err(HibpError::invalid_input(what, blank.as_str(), "Value cannot be empty").into());
    }

    let mut seen = HashSet::new();
    values.retain(|value| seen.insert(value.clone()));

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hibp_lib::{DefaultsConfig, QueryKind, ServiceConfig};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommand_with_global_flags() {
        let args = parse(&[
            "hibp", "account", "a@example.com", "bob", "-c", "4", "--json", "--timeout", "30s",
        ]);

        assert_eq!(args.concurrency, Some(4));
        assert!(args.json);
        assert_eq!(args.timeout.as_deref(), Some("30s"));
        match args.command {
            Command::Account(params) => assert_eq!(params.values, vec!["a@example.com", "bob"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_parameterless_subcommands() {
        assert!(matches!(parse(&["hibp", "breaches"]).command, Command::Breaches));
        assert!(matches!(
            parse(&["hibp", "dataclasses"]).command,
            Command::Dataclasses
        ));
    }

    #[test]
    fn test_validate_args_concurrency_bounds() {
        assert!(validate_args(&parse(&["hibp", "breaches", "-c", "100"])).is_ok());

        let err = validate_args(&parse(&["hibp", "breaches", "-c", "0"])).unwrap_err();
        assert!(err.contains("between 1 and 100"));
        assert!(validate_args(&parse(&["hibp", "breaches", "-c", "101"])).is_err());
    }

    #[test]
    fn test_validate_args_rejects_bad_durations() {
        let err = validate_args(&parse(&["hibp", "breaches", "--timeout", "soon"])).unwrap_err();
        assert!(err.contains("--timeout"));

        let args = parse(&["hibp", "breaches", "--request-timeout", "500ms"]);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_non_http_base_url() {
        let args = parse(&["hibp", "breaches", "--base-url", "ftp://mirror"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_resolve_config_precedence() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(5),
                timeout: Some("20s".to_string()),
                request_timeout: Some("3s".to_string()),
                json: Some(true),
                streaming: None,
            }),
            service: Some(ServiceConfig {
                base_url: Some("http://file.test/".to_string()),
                user_agent: Some("file-agent".to_string()),
            }),
        };
        let env_config = EnvConfig {
            concurrency: Some(8),
            timeout: Some(Duration::from_secs(40)),
            ..Default::default()
        };
        let args = parse(&["hibp", "breaches", "-c", "12", "--base-url", "http://cli.test/"]);

        let (config, output) = resolve_config(&file_config, &env_config, &args).unwrap();

        // CLI beats env beats file
        assert_eq!(config.concurrency, Some(12));
        assert_eq!(config.timeout, Duration::from_secs(40));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.base_url, "http://cli.test/");
        assert_eq!(config.user_agent, "file-agent");
        assert_eq!(
            output,
            OutputOptions {
                json: true,
                streaming: false
            }
        );
    }

    #[test]
    fn test_resolve_config_defaults() {
        let args = parse(&["hibp", "dataclasses"]);
        let (config, output) =
            resolve_config(&FileConfig::default(), &EnvConfig::default(), &args).unwrap();

        assert_eq!(config.concurrency, None);
        assert_eq!(config.timeout, DispatchConfig::default().timeout);
        assert_eq!(output, OutputOptions::default());
    }

    #[test]
    fn test_collect_parameters_merges_file_and_dedups() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# accounts to audit\nbob\n\ncarol@example.com\nbob").unwrap();

        let params = ParamArgs {
            values: vec!["alice@example.com".to_string(), " bob ".to_string()],
            file: Some(file.path().to_string_lossy().to_string()),
        };

        let values = collect_parameters(&params, "account").unwrap();
        assert_eq!(values, vec!["alice@example.com", "bob", "carol@example.com"]);
    }

    #[test]
    fn test_collect_parameters_requires_input() {
        let err = collect_parameters(&ParamArgs::default(), "domain").unwrap_err();
        assert!(err.to_string().contains("at least one domain"));

        let params = ParamArgs {
            values: vec!["  ".to_string()],
            file: None,
        };
        assert!(collect_parameters(&params, "breach name").is_err());
    }

    #[test]
    fn test_build_requests_validates_before_dispatch() {
        let builder = QueryBuilder::new("http://hibp.test/api/v2/").unwrap();

        let command = Command::Domain(ParamArgs {
            values: vec!["adobe.com".to_string(), "not a domain".to_string()],
            file: None,
        });
        let err = build_requests(&command, &builder).unwrap_err();
        assert!(err.to_string().contains("Invalid domain"));

        let command = Command::Breach(ParamArgs {
            values: vec!["adobe".to_string(), "linkedin".to_string()],
            file: None,
        });
        let requests = build_requests(&command, &builder).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url(), "http://hibp.test/api/v2/breach/linkedin");

        let requests = build_requests(&Command::Breaches, &builder).unwrap();
        assert_eq!(requests[0].kind(), QueryKind::AllBreaches);
    }
}
