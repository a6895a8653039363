//! CLI definition and command dispatch for bindkit.
//!
//! Every command works on an application manifest (`--manifest`, default
//! `bindkit.yaml`). Binding options come from the manifest's `binding`
//! section unless `--config` points at a separate file.
//!
//! ## Exit codes
//!
//! - `0`: success
//! - `1`: error (bad manifest, unknown action, malformed request data)
//! - `2`: `bind --strict` left parameters unresolved

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::ui::{table, ColorMode, MessageType, Style};

use bindkit_core::value::json_type_name;
use bindkit_core::{ActionParameterBinder, AppManifest, BindingConfig, BindingError, RawParams};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Exit code for `bind --strict` with unresolved parameters.
const EXIT_INCOMPLETE: u8 = 2;

/// bindkit – bind request parameters to controller actions
#[derive(Parser, Debug)]
#[command(name = "bindkit")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "BINDKIT_VERBOSE")]
    pub verbose: bool,

    /// Path to the application manifest
    #[arg(short, long, global = true, env = "BINDKIT_MANIFEST", default_value = "bindkit.yaml")]
    pub manifest: PathBuf,

    /// Binding configuration file; replaces the manifest's `binding` section
    #[arg(long, global = true, env = "BINDKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, env = "BINDKIT_COLOR", value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bind request parameters to an action and show the arguments
    #[command(after_help = r#"EXAMPLES:
    # Bind query parameters
    bindkit bind PostController view -p id=42 -p page=2

    # Bind a JSON body
    bindkit bind PostController create --params '{"model": {"title": "Hello"}}'

    # Machine-readable output, fail when anything is missing
    bindkit bind PostController view -p id=42 --json --strict
"#)]
    Bind {
        /// Controller class name
        controller: String,

        /// Action id (e.g. `view`, `create-post`)
        action: String,

        /// Request parameters as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// A single string parameter; repeatable, applied after --params
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        param: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Exit with status 2 when any parameter is unresolved
        #[arg(long)]
        strict: bool,
    },

    /// Show the parameter descriptors of an action
    #[command(after_help = r#"EXAMPLES:
    bindkit inspect PostController view
    bindkit inspect PostController view --json
"#)]
    Inspect {
        /// Controller class name
        controller: String,

        /// Action id
        action: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the effective binder chain in precedence order
    Binders {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse arguments, run the command, and map the outcome to an exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always show; debug output only with --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("bindkit_core={},bindkit_cli={}", log_level, log_level);

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);

    let binder = match load_binder(&cli.manifest, cli.config.as_deref()) {
        Ok(binder) => binder,
        Err(e) => {
            let cause = e.chain().nth(1).map(ToString::to_string);
            let hint = format!(
                "Check the manifest at {} or pass --manifest",
                cli.manifest.display()
            );
            eprintln!(
                "{}",
                style.error_with_context(&e.to_string(), cause.as_deref(), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Bind {
            controller,
            action,
            params,
            param,
            json,
            strict,
        } => handle_bind(
            &style,
            &binder,
            &controller,
            &action,
            params.as_deref(),
            &param,
            json,
            strict,
        ),
        Command::Inspect {
            controller,
            action,
            json,
        } => handle_inspect(&style, &binder, &controller, &action, json),
        Command::Binders { json } => handle_binders(&style, &binder, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            let hint = e
                .downcast_ref::<BindingError>()
                .and_then(error_hint);
            eprintln!("{}", style.error_with_context(&e.to_string(), None, hint));
            ExitCode::FAILURE
        }
    }
}

fn load_binder(manifest_path: &Path, config_path: Option<&Path>) -> Result<ActionParameterBinder> {
    let mut manifest = AppManifest::from_path(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    if let Some(path) = config_path {
        manifest.binding = BindingConfig::from_path(path)
            .with_context(|| format!("Failed to load binding config {}", path.display()))?;
    }

    debug!(
        manifest = %manifest_path.display(),
        classes = manifest.classes.len(),
        config_override = config_path.is_some(),
        "Assembling binder"
    );
    manifest
        .into_binder()
        .context("Manifest declares an inconsistent schema")
}

fn error_hint(error: &BindingError) -> Option<&'static str> {
    match error {
        BindingError::UnknownClass(_) => Some("Run `bindkit inspect` against a class from the manifest"),
        BindingError::MethodNotFound { .. } => {
            Some("Inline actions map `view-post` to the method `actionViewPost`")
        }
        BindingError::MalformedFilter { .. } => Some("Filter payloads must be JSON objects"),
        _ => None,
    }
}

// ============================================================================
// Request parameters
// ============================================================================

/// Merge `--params` JSON and `-p key=value` pairs into one parameter map.
fn parse_params(json_params: Option<&str>, pairs: &[String]) -> Result<RawParams> {
    let mut params = match json_params {
        Some(text) => match serde_json::from_str::<Value>(text).context("Invalid --params JSON")? {
            Value::Object(map) => map,
            other => bail!("--params must be a JSON object, got {}", json_type_name(&other)),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid parameter '{}': expected KEY=VALUE", pair);
        };
        if key.is_empty() {
            bail!("Invalid parameter '{}': empty key", pair);
        }
        params.insert(key.to_string(), Value::String(value.to_string()));
    }

    Ok(params)
}

// ============================================================================
// Command handlers
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn handle_bind(
    style: &Style,
    binder: &ActionParameterBinder,
    controller: &str,
    action_id: &str,
    json_params: Option<&str>,
    pairs: &[String],
    json_output: bool,
    strict: bool,
) -> Result<ExitCode> {
    let params = parse_params(json_params, pairs)?;
    let action = binder.registry().action(controller, action_id)?;
    let result = binder.bind_action_params(&action, &params)?;

    if json_output {
        let mut output = result.to_json();
        if let Value::Object(map) = &mut output {
            map.insert("action".to_string(), json!(action.unique_id()));
        }
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Bound {} ({} parameters)", action, result.parameters().len())
            )
        );
        let rendered = table::render_arguments_table(&result, style);
        if !rendered.is_empty() {
            println!();
            println!("{}", rendered);
        }
        if !result.messages().is_empty() {
            println!();
            for (name, message) in result.messages() {
                println!("{}", style.message(MessageType::Info, &format!("{}: {}", name, message)));
            }
        }
        if !result.is_complete() {
            println!();
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    &format!("Missing parameters: {}", result.missing().join(", "))
                )
            );
        }
    }

    if strict && !result.is_complete() {
        return Ok(ExitCode::from(EXIT_INCOMPLETE));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_inspect(
    style: &Style,
    binder: &ActionParameterBinder,
    controller: &str,
    action_id: &str,
    json_output: bool,
) -> Result<ExitCode> {
    let action = binder.registry().action(controller, action_id)?;
    let method = binder.resolve_method(&action)?;
    let parameters = binder.describe(&action)?;

    if json_output {
        let output = json!({
            "action": action.unique_id(),
            "method": method.name,
            "parameters": parameters,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", style.section(&action.unique_id()));
    println!("{}", style.key_value("Method", &method.name));
    if parameters.is_empty() {
        println!();
        println!("{}", style.message(MessageType::Info, "Action declares no parameters"));
    } else {
        println!();
        println!("{}", table::render_parameters_table(&parameters));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_binders(style: &Style, binder: &ActionParameterBinder, json_output: bool) -> Result<ExitCode> {
    let composite = binder.composite();
    let keys = composite.binder_keys();

    if json_output {
        let output = json!({
            "binders": keys,
            "maxDepth": composite.config().max_depth,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", table::render_binders_table(&keys));
    println!();
    println!(
        "{}",
        style.message_detail("Max depth", &composite.config().max_depth.to_string())
    );
    Ok(ExitCode::SUCCESS)
}
