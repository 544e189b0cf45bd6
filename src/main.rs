use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tablesweep::io_utils::{io_cli_error, simple_cli_error, sweep_cli_error};
use tablesweep::manifest::HostInfo;
use tablesweep::report::{self, DEFAULT_METRIC};
use tablesweep::{
    config, BitOrder, CodeFamily, CodeTable, CommandHarness, Dataset, DirSink, Resolution, Sweep,
    SweepConfig, TableFormat, TableSink,
};

/// Sweep lookup-table widths for unary, γ and δ codes and collect benchmark
/// results.
#[derive(Parser)]
#[command(name = "tablesweep")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate tables and run the harness for every width
    Sweep(SweepArgs),
    /// Generate tables for a single width
    Generate {
        /// Table width in bits
        #[arg(long)]
        bits: u8,
        /// Only this family (default: all three)
        #[arg(long)]
        family: Option<CodeFamily>,
        /// Encoding table cap (default: the family's sweep default)
        #[arg(long)]
        cap: Option<u64>,
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Table format: rust, bincode or raw
        #[arg(long, default_value = "rust")]
        format: TableFormat,
    },
    /// Decode a window through a freshly generated table
    Inspect {
        #[arg(long)]
        family: CodeFamily,
        #[arg(long)]
        bits: u8,
        /// Bit order of the window: M2L or L2M
        #[arg(long, default_value = "M2L")]
        order: BitOrder,
        /// Window as a binary string, e.g. 0101
        window: String,
    },
    /// Summarise a dataset per configuration
    Report {
        /// Dataset CSV written by a sweep
        dataset: PathBuf,
        /// Timing column to summarise
        #[arg(long, default_value = DEFAULT_METRIC)]
        metric: String,
        #[arg(long)]
        family: Option<CodeFamily>,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SweepArgs {
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    min_bits: Option<u8>,
    /// Last width, inclusive
    #[arg(long)]
    max_bits: Option<u8>,
    #[arg(long)]
    unary_cap: Option<u64>,
    #[arg(long)]
    gamma_cap: Option<u64>,
    #[arg(long)]
    delta_cap: Option<u64>,
    /// Directory the harness loads tables from
    #[arg(long)]
    tables_dir: Option<PathBuf>,
    #[arg(long)]
    format: Option<TableFormat>,
    /// Output CSV path
    #[arg(long)]
    dataset: Option<PathBuf>,
    #[arg(long)]
    delimiter: Option<char>,
    /// Working directory of the harness
    #[arg(long)]
    harness_cwd: Option<PathBuf>,
    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
    /// Harness command and arguments, after `--`
    #[arg(last = true)]
    harness: Vec<String>,
}

impl SweepArgs {
    fn into_config(self) -> Result<(SweepConfig, bool), Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => SweepConfig::load(path)
                .map_err(|e| sweep_cli_error("loading configuration", e))?,
            None => SweepConfig::default(),
        };
        if let Some(v) = self.min_bits {
            cfg.min_bits = v;
        }
        if let Some(v) = self.max_bits {
            cfg.max_bits = v;
        }
        if let Some(v) = self.unary_cap {
            cfg.unary_cap = v;
        }
        if let Some(v) = self.gamma_cap {
            cfg.gamma_cap = v;
        }
        if let Some(v) = self.delta_cap {
            cfg.delta_cap = v;
        }
        if let Some(v) = self.tables_dir {
            cfg.tables_dir = v;
        }
        if let Some(v) = self.format {
            cfg.format = v;
        }
        if let Some(v) = self.dataset {
            cfg.dataset = v;
        }
        if let Some(v) = self.delimiter {
            cfg.delimiter = v;
        }
        if let Some((program, args)) = self.harness.split_first() {
            cfg.harness.program = program.clone();
            cfg.harness.args = args.to_vec();
            cfg.harness.cwd = None;
        }
        if let Some(v) = self.harness_cwd {
            cfg.harness.cwd = Some(v);
        }
        Ok((cfg, self.quiet))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli.command) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .try_init();
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Sweep(args) => sweep(args),
        Command::Generate {
            bits,
            family,
            cap,
            out_dir,
            format,
        } => {
            let defaults = SweepConfig::default();
            let families = match family {
                Some(f) => vec![f],
                None => CodeFamily::ALL.to_vec(),
            };
            let mut sink = DirSink::new(&out_dir, format);
            for family in families {
                let cap = cap.unwrap_or_else(|| defaults.cap(family));
                let table = CodeTable::generate(family, bits, cap)
                    .map_err(|e| sweep_cli_error("generating table", e))?;
                let path = sink
                    .persist(&table)
                    .map_err(|e| sweep_cli_error("writing table", e))?;
                println!("{} {}", path.display(), table.fingerprint());
            }
            Ok(())
        }
        Command::Inspect {
            family,
            bits,
            order,
            window,
        } => {
            config::validate_bits(bits).map_err(|e| sweep_cli_error("inspect", e))?;
            if window.len() > bits as usize {
                return Err(simple_cli_error(&format!(
                    "window '{window}' is longer than {bits} bits"
                ))
                .into());
            }
            let value = u64::from_str_radix(&window, 2)
                .map_err(|_| simple_cli_error(&format!("'{window}' is not a binary string")))?;
            let table = CodeTable::generate(family, bits, family.min_symbol())
                .map_err(|e| sweep_cli_error("generating table", e))?;
            match table.lookup(value, order) {
                Resolution::Decoded { symbol, consumed } => {
                    println!("symbol {symbol}, {consumed} bits")
                }
                Resolution::Unresolved => println!("unresolved"),
            }
            Ok(())
        }
        Command::Report {
            dataset,
            metric,
            family,
            delimiter,
            json,
        } => {
            let delimiter =
                config::delimiter_byte(delimiter).map_err(|e| sweep_cli_error("report", e))?;
            if !dataset.exists() {
                let err = std::io::Error::from(std::io::ErrorKind::NotFound);
                return Err(io_cli_error("reading dataset", &dataset, err).into());
            }
            let ds = Dataset::load(&dataset, delimiter)
                .map_err(|e| sweep_cli_error("reading dataset", e))?;
            let summaries = report::summarize(&ds, &metric, family);
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print!("{}", report::render_text(&summaries));
            }
            Ok(())
        }
    }
}

fn sweep(args: SweepArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, quiet) = args.into_config()?;
    let mut sink = DirSink::new(&config.tables_dir, config.format);
    let mut harness = CommandHarness::from(&config.harness);
    let dataset_path = config.dataset.clone();

    let mut sweep = Sweep::new(config, &mut sink, &mut harness)
        .map_err(|e| sweep_cli_error("invalid sweep", e))?
        .with_output(HostInfo::detect())
        .map_err(|e| sweep_cli_error("creating dataset", e))?;
    if !quiet {
        sweep = sweep.with_progress();
    }
    let dataset = sweep.run().map_err(|e| sweep_cli_error("sweep failed", e))?;
    eprintln!(
        "Wrote {} rows to {}",
        dataset.len(),
        dataset_path.display()
    );
    Ok(())
}
