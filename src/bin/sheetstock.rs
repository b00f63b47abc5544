//! sheetstock CLI - Browse and edit stock sheets from the command line
//!
//! ## Example Usage
//!
//! ```bash
//! # Check the backend and list files
//! sheetstock ping
//! sheetstock files
//!
//! # Show the second page of a sheet as CSV
//! sheetstock rows gerceklesenmakrodata_20251003204545.xlsx --page 2 --csv
//!
//! # Recalculate and save a row with a manual USD rate
//! sheetstock edit gerceklesenmakrodata_20251003204545.xlsx 42 \
//!     --set "Toplam Stok Çıkış Miktarı=12" --manual USD=41,5
//! ```

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use sheetstock::config::Config;
use sheetstock::currency::{Currency, HOME_CURRENCY};
use sheetstock::data::{Backend, DeleteRequest, HttpBackend, Record};
use sheetstock::error::SheetStockError;
use sheetstock::fx::{manual_rates_from_form, CurrencyRateProvider, ExchangeRateApiSource};
use sheetstock::stock::{compute_with_conversion, format_number, StockCalculationInput};
use sheetstock::viewer::DataView;
use std::io;
use std::path::PathBuf;
use std::process;

/// sheetstock: Stock sheet viewer and editor
#[derive(Parser)]
#[command(name = "sheetstock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stock sheet viewer and editor with currency-aware totals", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test the backend connection
    Ping,

    /// List files known to the backend
    Files,

    /// List the sheets of a file
    Sheets {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Show one page of rows
    Rows {
        #[arg(value_name = "FILE")]
        file: String,

        /// Sheet name (first sheet if omitted)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Write CSV to stdout
        #[arg(long)]
        csv: bool,
    },

    /// Ask the backend to (re)process a file
    Process {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Filter a file by document number
    Search {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "DOCUMENT_NUMBER")]
        document_number: String,

        #[arg(long)]
        csv: bool,
    },

    /// Statistics for a document number
    Stats {
        #[arg(value_name = "DOCUMENT_NUMBER")]
        document_number: String,
    },

    /// Show the exchange rates in effect
    Rates {
        /// Manual rate override, e.g. USD=41,5 (repeatable)
        #[arg(short, long, value_name = "CUR=RATE")]
        manual: Vec<String>,
    },

    /// Convert an amount into Turkish lira
    Convert {
        amount: f64,

        #[arg(value_name = "CURRENCY")]
        currency: String,

        #[arg(short, long, value_name = "CUR=RATE")]
        manual: Vec<String>,
    },

    /// Compute net quantity and totals without touching the backend
    Calc {
        #[arg(long)]
        incoming: f64,

        #[arg(long)]
        outgoing: f64,

        #[arg(long)]
        price: f64,

        #[arg(long, default_value = "TRY")]
        currency: String,

        #[arg(short, long, value_name = "CUR=RATE")]
        manual: Vec<String>,
    },

    /// Edit a row, recalculate derived columns and save
    Edit {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "ID")]
        id: i64,

        /// Column assignment, e.g. "Para Birimi=USD" (repeatable)
        #[arg(long = "set", value_name = "COLUMN=VALUE", required = true)]
        set: Vec<String>,

        #[arg(short, long)]
        sheet: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Locate the row through a document-number filter instead of paging
        #[arg(long, value_name = "DOCUMENT_NUMBER")]
        document: Option<String>,

        #[arg(short, long, value_name = "CUR=RATE")]
        manual: Vec<String>,

        /// Show the recalculated row without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a row by id
    Delete {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if cli.verbose {
        println!("{} v{}", "sheetstock".cyan().bold(), env!("CARGO_PKG_VERSION"));
        println!("Backend: {}", config.backend_url.dimmed());
    }

    if let Err(e) = run(cli.command, &config).await {
        match e.downcast_ref::<SheetStockError>() {
            Some(err) => eprintln!("{} {}", "Error:".red().bold(), err.user_message()),
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        process::exit(1);
    }
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Ping => {
            let message = backend(config)?.test_connection().await?;
            println!("{} {}", "✓".green(), message);
        }

        Commands::Files => {
            let files = backend(config)?.list_files().await?;
            println!("{}", format!("Files ({})", files.len()).bold());
            for file in files {
                let marker = if config.filter_scope(&file).is_some() {
                    " [filterable]".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {}{}", file, marker);
            }
        }

        Commands::Sheets { file } => {
            let sheets = backend(config)?.list_sheets(&file).await?;
            println!("{}", format!("Sheets in {}", file).bold());
            for sheet in sheets {
                println!("  {:<30} {:>8} rows", sheet.name, sheet.row_count);
            }
        }

        Commands::Rows {
            file,
            sheet,
            page,
            csv,
        } => {
            let backend = backend(config)?;
            let mut view = DataView::from_config(&backend, file, config);
            open_page(&mut view, sheet.as_deref(), page).await?;
            if csv {
                write_csv(view.visible_rows())?;
            } else {
                print_rows(view.visible_rows());
                println!(
                    "{}",
                    format!(
                        "Page {} of {} ({}{} rows)",
                        view.page(),
                        view.total_pages(),
                        if view.total_is_inferred() { "at least " } else { "" },
                        view.total_rows().unwrap_or(0)
                    )
                    .dimmed()
                );
            }
        }

        Commands::Process { file, sheet } => {
            let message = backend(config)?.process_file(&file, sheet.as_deref()).await?;
            println!("{} {}", "✓".green(), message);
        }

        Commands::Search {
            file,
            document_number,
            csv,
        } => {
            let backend = backend(config)?;
            let mut view = DataView::from_config(&backend, file, config);
            let rows = view.apply_filter(&document_number).await?;
            if rows.is_empty() {
                println!(
                    "{} No rows for document \"{}\" (product rows excluded)",
                    "Warning:".yellow(),
                    document_number
                );
            } else if csv {
                write_csv(rows)?;
            } else {
                print_rows(rows);
            }
        }

        Commands::Stats { document_number } => {
            let stats = backend(config)?.document_statistics(&document_number).await?;
            println!("{}", format!("Document {}", stats.document_number).bold());
            println!("  {} {}", "Records:".bold(), stats.total_records);
            println!("  {} {}", "Files:".bold(), stats.file_count);
            println!("  {} {}", "Last modified:".bold(), stats.last_modified);
        }

        Commands::Rates { manual } => {
            let provider = rate_provider(config, &manual)?;
            let snapshot = provider.get_rates().await;
            println!(
                "{} {}",
                "Exchange rates".bold(),
                format!("({:?}, {})", snapshot.origin(), snapshot.fetched_at()).dimmed()
            );
            for (currency, rate) in snapshot.rates() {
                if !currency.is_home() {
                    println!(
                        "  1 {} = {} {}",
                        currency,
                        format_number(*rate, 4),
                        HOME_CURRENCY.symbol()
                    );
                }
            }
        }

        Commands::Convert {
            amount,
            currency,
            manual,
        } => {
            let provider = rate_provider(config, &manual)?;
            let converted = provider.convert_to_home(amount, &currency).await;
            println!(
                "{} {} = {} {}",
                format_number(amount, 2),
                currency.to_uppercase(),
                format_number(converted, 2).green(),
                HOME_CURRENCY.symbol()
            );
        }

        Commands::Calc {
            incoming,
            outgoing,
            price,
            currency,
            manual,
        } => {
            let provider = rate_provider(config, &manual)?;
            let input = StockCalculationInput::new(incoming, outgoing, price, currency);
            let result = compute_with_conversion(&input, &provider).await;
            println!("  {} {}", "Net quantity:".bold(), format_number(result.net_quantity, 2));
            println!(
                "  {} {} {}",
                "Total price:".bold(),
                format_number(result.total_price_original, 2),
                result.original_currency
            );
            println!(
                "  {} {} {}",
                "Total price (TRY):".bold(),
                format_number(result.total_price_home, 2).green(),
                HOME_CURRENCY.symbol()
            );
        }

        Commands::Edit {
            file,
            id,
            set,
            sheet,
            page,
            document,
            manual,
            dry_run,
        } => {
            let assignments = set
                .iter()
                .map(|entry| parse_assignment(entry))
                .collect::<Result<Vec<_>, _>>()?;
            let backend = backend(config)?;
            let provider = rate_provider(config, &manual)?;

            let mut view = DataView::from_config(&backend, file, config);
            match document {
                Some(document) => {
                    view.apply_filter(&document).await?;
                }
                None => open_page(&mut view, sheet.as_deref(), page).await?,
            }
            let record = view
                .find_row(id)
                .cloned()
                .with_context(|| format!("row {} not found in {}", id, view.file()))?;

            let mut session = view.edit_session(config);
            session.start_edit(&record, &provider).await;
            for (column, value) in assignments {
                session.change_field(&column, value, &provider).await?;
            }

            if let Some(working) = session.working_copy() {
                print_rows(&[Record::new(id, working.clone())]);
            }
            if dry_run {
                session.cancel();
                println!("{}", "Dry run, nothing saved".dimmed());
            } else {
                let saved = view.save_edit(&mut session, &config.modified_by).await?;
                println!("{} Row {} saved", "✓".green(), saved);
            }
        }

        Commands::Delete { id } => {
            let request = DeleteRequest {
                id,
                modified_by: config.modified_by.clone(),
            };
            backend(config)?.delete_record(&request).await?;
            println!("{} Row {} deleted", "✓".green(), id);
        }
    }

    Ok(())
}

fn backend(config: &Config) -> sheetstock::error::Result<HttpBackend> {
    config.http_backend()
}

fn rate_provider(
    config: &Config,
    manual: &[String],
) -> anyhow::Result<CurrencyRateProvider<ExchangeRateApiSource>> {
    let provider = config.rate_provider()?;
    if !manual.is_empty() {
        let entries = manual
            .iter()
            .map(|entry| parse_assignment(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let rates = manual_rates_from_form(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        for (code, _) in &entries {
            if Currency::from_code(code).is_none() {
                log::warn!("Ignoring manual rate for unsupported currency {}", code);
            }
        }
        provider.set_manual_rates(Some(rates))?;
    }
    Ok(provider)
}

/// Split `KEY=VALUE`
fn parse_assignment(entry: &str) -> Result<(String, String), SheetStockError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(SheetStockError::InputError(format!(
            "expected KEY=VALUE, got {:?}",
            entry
        ))),
    }
}

async fn open_page<B: Backend>(
    view: &mut DataView<'_, B>,
    sheet: Option<&str>,
    page: u32,
) -> anyhow::Result<()> {
    view.load_sheets().await?;
    if let Some(sheet) = sheet {
        view.select_sheet(sheet).await;
    }
    if view.sheet().is_none() {
        anyhow::bail!("{} has no sheets", view.file());
    }
    view.go_to_page(page).await?;
    Ok(())
}

fn print_rows(rows: &[Record]) {
    for record in rows {
        println!("{}", format!("#{}", record.id).cyan().bold());
        for (column, value) in record.fields.iter() {
            println!("  {:<32} {}", format!("{}:", column).bold(), value.to_text());
        }
    }
}

fn write_csv(rows: &[Record]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    let Some(first) = rows.first() else {
        return Ok(());
    };

    let columns: Vec<&str> = first.fields.columns().collect();
    writer.write_record(std::iter::once("id").chain(columns.iter().copied()))?;
    for record in rows {
        let id = record.id.to_string();
        let values: Vec<String> = columns
            .iter()
            .map(|column| record.fields.get(column).map(|v| v.to_text()).unwrap_or_default())
            .collect();
        writer.write_record(std::iter::once(id.as_str()).chain(values.iter().map(String::as_str)))?;
    }
    writer.flush()?;
    Ok(())
}
