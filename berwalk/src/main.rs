//! berwalk - dump BER encoded data as a field tree

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use berwalk::{builtin_registry, BerDecoder, DecodeConfig, Decoded, FieldTree, NodeId};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Decode BER, CER or DER encoded data and print its structure
#[derive(Parser, Debug)]
#[command(name = "berwalk")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File holding the encoded data
    #[arg(required_unless_present_any = ["hex", "list_syntaxes"])]
    file: Option<PathBuf>,

    /// Encoded data as a hex string instead of a file
    #[arg(long, conflicts_with = "file")]
    hex: Option<String>,

    /// Decode the whole buffer with the handler of this syntax
    #[arg(long)]
    syntax: Option<String>,

    /// Show identifier and length octets as fields
    #[arg(long)]
    show_internal_fields: bool,

    /// Try to decode OCTET STRING content as BER
    #[arg(long)]
    decode_octetstring_as_ber: bool,

    /// Try to decode unknown primitive content as BER
    #[arg(long)]
    decode_primitive_as_ber: bool,

    /// Walk content without a registered handler as generic BER
    #[arg(long)]
    decode_unexpected: bool,

    /// Warn about INTEGERs encoded with more octets than needed
    #[arg(long)]
    warn_excess_integer_bytes: bool,

    /// Print the tree and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Print the filter expression of every node
    #[arg(long)]
    filters: bool,

    /// List the registered syntaxes and exit
    #[arg(long)]
    list_syntaxes: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> DecodeConfig {
        let config = DecodeConfig::new()
            .with_internal_fields(self.show_internal_fields)
            .with_octetstring_as_ber(self.decode_octetstring_as_ber)
            .with_primitive_as_ber(self.decode_primitive_as_ber)
            .with_decode_unexpected(self.decode_unexpected)
            .with_excess_integer_warning(self.warn_excess_integer_bytes);
        match &self.syntax {
            Some(syntax) => config.with_syntax(syntax.clone()),
            None => config,
        }
    }

    fn input(&self) -> Result<Vec<u8>> {
        if let Some(text) = &self.hex {
            let cleaned: String = text.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
            return hex::decode(&cleaned).context("Invalid hex input");
        }
        match &self.file {
            Some(path) => std::fs::read(path).with_context(|| format!("Failed to read {}", path.display())),
            None => bail!("No input given, pass a file or --hex"),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let registry = builtin_registry();
    if cli.list_syntaxes {
        for name in registry.syntax_names() {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.config();
    if let Some(syntax) = &config.decode_as_syntax {
        if !registry.has_syntax_handler(syntax) {
            bail!("Unknown syntax '{}', see --list-syntaxes", syntax);
        }
    }

    let data = cli.input()?;
    log::debug!("Decoding {} bytes", data.len());
    let decoded = BerDecoder::with_config(&registry, config).decode(&data);

    if cli.json {
        print_json(&decoded)?;
    } else {
        print_text(&decoded, cli.filters);
    }

    Ok(if decoded.is_malformed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_text(decoded: &Decoded, filters: bool) {
    if filters {
        for &root in decoded.tree.roots() {
            print_filters(&decoded.tree, root, 0);
        }
    } else {
        print!("{}", decoded.tree.render());
    }

    if !decoded.diagnostics.is_empty() {
        println!();
        for diagnostic in &decoded.diagnostics {
            println!(
                "[{:?}] {:?} at {} ({} bytes): {}",
                diagnostic.severity,
                diagnostic.kind,
                diagnostic.offset,
                diagnostic.length,
                diagnostic.message
            );
        }
    }
}

fn print_filters(tree: &FieldTree, id: NodeId, depth: usize) {
    println!("{:indent$}{}", "", tree.filter_expression(id), indent = depth * 4);
    for &child in tree.children(id) {
        print_filters(tree, child, depth + 1);
    }
}

fn print_json(decoded: &Decoded) -> Result<()> {
    let output = serde_json::json!({
        "tree": decoded.tree,
        "diagnostics": decoded.diagnostics,
        "offset": decoded.offset,
        "malformed": decoded.malformed.as_ref().map(ToString::to_string),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
