use std::{fmt::Write as _, sync::Arc};

use adapter_registry::{AdapterDescriptor, AdapterParameter, AdapterRegistry, ErrorStore, RegistryConfig};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "adapters", version, about = "Inspect the adapters published by the backend")]
struct Cli {
    /// Backend base URL (overrides config and ADAPTER_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    api_base: Option<String>,

    /// Log requests and registry activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every adapter the backend knows about
    List(ListArgs),
    /// Show the inputs, outputs and example of one adapter
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Include placeholder entries
    #[arg(long)]
    include_fake: bool,

    /// Print the raw JSON array
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Adapter identifier (e.g. csv_reader)
    id: String,

    /// Print the descriptor as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = RegistryConfig::load();
    if let Some(api_base) = cli.api_base.as_deref() {
        config.api_base = api_base.to_string();
    }

    let errors = ErrorStore::new();
    let registry = AdapterRegistry::from_config(&config, Arc::new(errors.clone()))
        .with_context(|| format!("cannot use adapter backend at '{}'", config.api_base))?;
    load_adapters(&registry, &errors, &config).await?;

    match cli.command {
        Command::List(args) => run_list(&registry, &args),
        Command::Show(args) => run_show(&registry, &args),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn load_adapters(registry: &AdapterRegistry, errors: &ErrorStore, config: &RegistryConfig) -> Result<()> {
    debug!(api_base = %config.api_base, "loading adapters");
    let outcome = registry.refresh_adapters_now().await;
    if outcome.is_success() {
        return Ok(());
    }

    for report in errors.take() {
        eprintln!("error: {}", report.message);
    }
    bail!("could not load adapters from {}", config.api_base)
}

fn run_list(registry: &AdapterRegistry, args: &ListArgs) -> Result<()> {
    let adapters: Vec<AdapterDescriptor> = if args.include_fake {
        registry.snapshot().as_ref().clone()
    } else {
        registry.real_adapters()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&adapters)?);
    } else {
        print!("{}", render_list(&adapters));
    }
    Ok(())
}

fn run_show(registry: &AdapterRegistry, args: &ShowArgs) -> Result<()> {
    let Some(adapter) = registry.get(&args.id) else {
        bail!("unknown adapter '{}' ({} adapters available)", args.id, registry.len());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&adapter)?);
    } else {
        print!("{}", render_detail(&adapter));
    }
    Ok(())
}

fn render_list(adapters: &[AdapterDescriptor]) -> String {
    if adapters.is_empty() {
        return "no adapters available\n".to_string();
    }

    let id_width = adapters.iter().map(|adapter| display_width(&adapter.id)).max().unwrap_or(0);
    let type_width = adapters
        .iter()
        .map(|adapter| display_width(&adapter.function_type))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for adapter in adapters {
        let mut line = format!(
            "{}  {}  {}",
            pad(&adapter.id, id_width),
            pad(&adapter.function_type, type_width),
            adapter.display_name()
        );
        if adapter.is_placeholder() {
            line.push_str("  (placeholder)");
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn render_detail(adapter: &AdapterDescriptor) -> String {
    let mut out = String::new();
    if adapter.display_name() == adapter.id {
        let _ = writeln!(out, "{}", adapter.id);
    } else {
        let _ = writeln!(out, "{} ({})", adapter.id, adapter.display_name());
    }
    let _ = writeln!(out, "  type: {}", adapter.function_type);
    if !adapter.description.trim().is_empty() {
        let _ = writeln!(out, "  {}", adapter.description.trim());
    }
    render_parameters(&mut out, "inputs", adapter.inputs.iter());
    render_parameters(&mut out, "outputs", adapter.outputs.iter());
    if !adapter.example.is_empty() {
        let _ = writeln!(out, "  example:");
        for (field, value) in &adapter.example {
            let _ = writeln!(out, "    {} = {}", field, value);
        }
    }
    out
}

fn render_parameters<'a>(
    out: &mut String,
    heading: &str,
    parameters: impl ExactSizeIterator<Item = (&'a String, &'a AdapterParameter)> + Clone,
) {
    if parameters.len() == 0 {
        let _ = writeln!(out, "  {}: none", heading);
        return;
    }
    let width = parameters.clone().map(|(name, _)| display_width(name)).max().unwrap_or(0);
    let _ = writeln!(out, "  {}:", heading);
    for (name, parameter) in parameters {
        let requirement = if parameter.optional { "optional" } else { "required" };
        let line = match parameter.value.as_deref() {
            Some(value) => format!("    {}  {}  default: {}", pad(name, width), requirement, value),
            None => format!("    {}  {}", pad(name, width), requirement),
        };
        let _ = writeln!(out, "{}", line);
    }
}

/// Column width of `text`, counted in chars to match `pad`.
fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Left-align `text` in a column of `width` characters.
fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn adapter(id: &str, function_type: &str) -> AdapterDescriptor {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "description": format!("{id} adapter"),
            "inputs": {
                "path": {"id": "path", "optional": false, "val": null},
                "delimiter": {"id": "delimiter", "optional": true, "val": ","}
            },
            "outputs": {"out": {"id": "out", "optional": false, "val": null}},
            "func_type": function_type,
            "friendly_name": null,
            "example": {"path": "data.csv"}
        }))
        .expect("valid descriptor")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["adapters", "show", "csv_reader", "--api-base", "http://localhost:1/api"])
            .expect("parse");
        assert_eq!(cli.api_base.as_deref(), Some("http://localhost:1/api"));
        assert!(matches!(cli.command, Command::Show(ShowArgs { ref id, json: false }) if id == "csv_reader"));
    }

    #[test]
    fn list_aligns_columns_and_marks_placeholders() {
        let mut fake = adapter("demo", "transform");
        fake.is_fake = Some(true);
        fake.friendly_name = Some("Demo".into());
        let rendered = render_list(&[adapter("csv_reader", "source"), fake]);

        assert_eq!(
            rendered,
            "csv_reader  source     csv_reader\n\
             demo        transform  Demo  (placeholder)\n"
        );
    }

    #[test]
    fn non_ascii_ids_keep_columns_aligned() {
        let rendered = render_list(&[adapter("lecteur_données", "source"), adapter("csv", "source")]);

        assert_eq!(
            rendered,
            "lecteur_données  source  lecteur_données\n\
             csv              source  csv\n"
        );
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(render_list(&[]), "no adapters available\n");
    }

    #[test]
    fn detail_lists_parameters_and_example() {
        let rendered = render_detail(&adapter("csv_reader", "source"));
        assert!(rendered.starts_with("csv_reader\n  type: source\n"), "{rendered}");
        assert!(rendered.contains("    path       required\n"), "{rendered}");
        assert!(rendered.contains("    delimiter  optional  default: ,\n"), "{rendered}");
        assert!(rendered.contains("  outputs:\n    out  required\n"), "{rendered}");
        assert!(rendered.contains("  example:\n    path = data.csv\n"), "{rendered}");
    }
}
