//! Process command - turn a single draft or raw text into an invoice.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use factura_core::invoice::{InvoicePipeline, ProcessedInvoice, RandomSource};
use factura_core::models::draft::{Draft, InvoiceRequest, RequestOptions};

use super::load_config;
use super::output::{format_invoice, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Draft JSON file produced by the upstream model
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Raw request text, priced by the deterministic extractor alone
    #[arg(short, long)]
    text: Option<String>,

    /// Tax rate as a fraction (e.g. 0.18)
    #[arg(long)]
    tax_rate: Option<Decimal>,

    /// Currency used when the draft names none
    #[arg(long)]
    currency: Option<String>,

    /// Issue date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Seed for simulated document and invoice numbers
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Validate the computed invoice
    #[arg(long)]
    validate: bool,

    /// Print the corrections applied to the draft
    #[arg(long)]
    show_warnings: bool,
}

impl ProcessArgs {
    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            tax_rate: self.tax_rate,
            default_currency: self.currency.clone(),
            issue_date: self.date,
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    let ids = match args.seed {
        Some(seed) => RandomSource::with_seed(seed),
        None => RandomSource::new(),
    };
    let mut pipeline = InvoicePipeline::new(&config).with_source(ids);
    let options = args.request_options();

    let processed = match (&args.input, &args.text) {
        (Some(input), _) => {
            info!("Processing draft file: {}", input.display());
            let draft = read_draft(input)?;
            pipeline.process(draft, &options)
        }
        (None, Some(text)) => {
            let request = InvoiceRequest::new(text.as_str()).with_options(options);
            pipeline.process_text(&request)?
        }
        (None, None) => anyhow::bail!("Either an input file or --text is required"),
    };

    let invoice = &processed.invoice;

    if args.validate {
        let issues = invoice.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_invoice(invoice, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_warnings {
        print_warnings(&processed);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read and decode a draft file.
pub fn read_draft(path: &Path) -> anyhow::Result<Draft> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    let content = fs::read_to_string(path)?;
    let draft = Draft::from_json(&content)
        .map_err(|e| anyhow::anyhow!("Invalid draft {}: {}", path.display(), e))?;
    Ok(draft)
}

fn print_warnings(processed: &ProcessedInvoice) {
    eprintln!();
    if processed.warnings.is_empty() {
        eprintln!("{} No corrections were needed", style("ℹ").blue());
        return;
    }
    eprintln!(
        "{} {} warnings:",
        style("⚠").yellow(),
        processed.warnings.len()
    );
    for warning in &processed.warnings {
        eprintln!("  - {}", warning);
    }
}
