use clap::Parser;
use std::path::PathBuf;
use tablesweep::io_utils::{simple_cli_error, sweep_cli_error};
use tablesweep::{persist, BitOrder, Resolution};

/// Print the entries of a table written in the bincode or raw format.
#[derive(Parser)]
struct Args {
    /// Table file (.bin or .raw)
    input: PathBuf,
    /// Bit order of the read table to print
    #[arg(long, default_value = "M2L")]
    order: BitOrder,
    /// Also print the encoding table
    #[arg(long)]
    codewords: bool,
    /// Only print the summary line
    #[arg(long)]
    summary: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !args.input.exists() {
        return Err(simple_cli_error(&format!(
            "'{}' does not exist. Check the path.",
            args.input.display()
        ))
        .into());
    }
    let table = persist::load(&args.input).map_err(|e| sweep_cli_error("loading table", e))?;

    println!(
        "{} table, {} bits, cap {}, {} of {} windows resolved ({}), fingerprint {}",
        table.family,
        table.bits,
        table.cap,
        table.resolved_count(args.order),
        table.len(),
        args.order,
        table.fingerprint()
    );
    if args.summary {
        return Ok(());
    }

    let width = table.bits as usize;
    for (window, entry) in table.read_entries(args.order).iter().enumerate() {
        match entry.resolution() {
            Resolution::Decoded { symbol, consumed } => {
                println!("{window:0width$b} -> {symbol} ({consumed} bits)")
            }
            Resolution::Unresolved => println!("{window:0width$b} -> unresolved"),
        }
    }
    if args.codewords {
        let first = table.family.min_symbol();
        for (i, cw) in table.write_entries(args.order).iter().enumerate() {
            let len = cw.len as usize;
            println!("{:>6}: {:0len$b} ({len} bits)", first + i as u64, cw.bits);
        }
    }
    Ok(())
}
