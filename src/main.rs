use arswitch::config::ToggleOptions;
use arswitch::shell::{self, LineConsole};
use arswitch::storage::{FsStorage, OpenMode, Storage};
use arswitch::table::{ByteOrder, TableReader};
use arswitch::toggle::Toggler;
use arswitch::AspectRatio;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arswitch", about = "Toggle the aspect ratio stored in a SYSCONF blob")]
struct Cli {
    /// JSON options file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the SYSCONF blob
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,
    /// Entry name to resolve
    #[arg(short, long, global = true)]
    key: Option<String>,
    /// Table fields are little-endian
    #[arg(long, global = true)]
    little_endian: bool,
    /// Close the read handle and reopen read-write for the write phase
    #[arg(long, global = true)]
    reopen: bool,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current value
    Show,
    /// Flip between 4:3 and 16:9
    Toggle,
    /// Write an explicit value: 4:3 or 16:9
    Set {
        ratio: AspectRatio,
    },
    /// List the entries of the item table
    List {
        /// Name bytes to read per item
        #[arg(long, default_value = "6")]
        name_len: usize,
    },
    /// Press-A-to-toggle loop on stdin (default)
    Interactive,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    arswitch::logging::init(cli.verbose);
    let opts = build_options(&cli)?;
    let toggler = Toggler::new(FsStorage, opts);

    match cli.command.unwrap_or(Commands::Interactive) {

        // ── Show ─────────────────────────────────────────────────────────────
        Commands::Show => {
            let snap = toggler.current()?;
            println!("{} @ 0x{:x} = {} ({})",
                toggler.options().key, snap.offset, snap.value, snap.ratio());
        }

        // ── Toggle / Set ─────────────────────────────────────────────────────
        Commands::Toggle => {
            let out = toggler.toggle()?;
            println!("{} → {}", out.previous_ratio(), out.ratio());
        }
        Commands::Set { ratio } => {
            let out = toggler.set(ratio)?;
            println!("{} → {}", out.previous_ratio(), out.ratio());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { name_len } => {
            let opts = toggler.options();
            let handle = toggler.storage().open(&opts.path, OpenMode::Read)?;
            let mut reader = TableReader::with_byte_order(handle, opts.byte_order);
            let pointer = reader.lookup_pointer()?;
            let entries = reader.entries(name_len)?;
            println!("Lookup pointer 0x{pointer:04x}");
            println!("{:>4} {:>8} {:>8}  {:<14} Name", "#", "Item", "Payload", "Hex");
            for e in &entries {
                println!("{:>4} {:>8} {:>8}  {:<14} {}",
                    e.index,
                    format!("0x{:04x}", e.item_offset),
                    format!("0x{:04x}", e.payload_offset),
                    hex::encode(&e.name),
                    e.name_lossy());
            }
        }

        // ── Interactive ──────────────────────────────────────────────────────
        Commands::Interactive => {
            let stdin = std::io::stdin();
            let mut console = LineConsole::new(stdin.lock(), std::io::stdout());
            shell::run(&toggler, &mut console)?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn build_options(cli: &Cli) -> Result<ToggleOptions, Box<dyn std::error::Error>> {
    let mut opts = match &cli.config {
        Some(path) => ToggleOptions::load(path)?,
        None       => ToggleOptions::default(),
    };
    if let Some(file) = &cli.file { opts.path = file.clone(); }
    if let Some(key) = &cli.key { opts.key = key.clone(); }
    if cli.little_endian { opts.byte_order = ByteOrder::Little; }
    if cli.reopen { opts.reopen_for_write = true; }
    opts.validate()?;
    Ok(opts)
}
