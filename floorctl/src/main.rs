use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use floorctl::libfloor::{self, FloorSetup};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "floorctl")]
#[command(version)]
#[command(about = "Floor-1 spectral envelope tool", long_about = None)]
struct Cli {
    /// Log codec internals (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in reference setup
    Init {
        /// Output setup file (.json or .msgpack)
        output: PathBuf,
    },
    /// Validate a setup and show its derived tables
    Inspect {
        /// Setup file (.json or MessagePack)
        setup: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the packed setup header of a floor
    Header {
        /// Setup file
        setup: PathBuf,
        /// Output header bytes
        output: PathBuf,
    },
    /// Fit and pack blocks of analysis data into a floor stream
    Encode {
        /// Setup file
        setup: PathBuf,
        /// JSON file of blocks with log_mdct and log_mask
        input: PathBuf,
        /// Output floor stream
        output: PathBuf,
    },
    /// Decode a floor stream to linear floor curves (JSON)
    Decode {
        /// Input floor stream
        input: PathBuf,
        /// Output JSON file
        output: PathBuf,
    },
    /// Show information about a floor stream
    Info {
        /// Input floor stream
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "libfloor=debug,floorctl=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => init(&output)?,
        Commands::Inspect { setup, json } => inspect(&setup, json)?,
        Commands::Header { setup, output } => header(&setup, &output)?,
        Commands::Encode {
            setup,
            input,
            output,
        } => encode(&setup, &input, &output)?,
        Commands::Decode { input, output } => decode(&input, &output)?,
        Commands::Info { input } => info(&input)?,
    }

    Ok(())
}

fn init(output: &Path) -> Result<()> {
    let setup = FloorSetup::reference();
    let bytes = floorctl::setup_bytes(&setup, output)?;
    fs::write(output, bytes).context("Failed to write setup file")?;

    println!("Done!");
    println!("  Output: {}", output.display());
    Ok(())
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let setup = floorctl::load_setup(path)?;
    let info = libfloor::describe_setup(&setup).context("Invalid setup")?;

    if json {
        let json_str = serde_json::to_string_pretty(&info).context("Failed to serialize info")?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("Floor Setup");
    println!("───────────────────────────────");
    println!("  Posts:       {}", info.posts);
    println!("  Range:       {}", info.range);
    println!("  Multiplier:  {} (q = {})", info.multiplier, info.quant_q);
    println!("  Partitions:  {}", info.partitions);
    println!("  Classes:     {}", info.classes);
    println!("  Books:       {}", info.books);
    println!("  Header:      {} bits", info.header_bits);

    println!();
    println!("Posts");
    println!("───────────────────────────────");
    let lookup = setup.build()?.lookup;
    for i in 0..info.posts {
        let (lo, hi) = info.neighbors[i];
        if i < 2 {
            println!("  {:>3}  x = {:<6} edge", i, lookup.x(i));
        } else {
            println!(
                "  {:>3}  x = {:<6} predicted from {} and {}",
                i,
                lookup.x(i),
                lo,
                hi
            );
        }
    }

    Ok(())
}

fn header(path: &Path, output: &Path) -> Result<()> {
    let setup = floorctl::load_setup(path)?;
    let mode = setup.build().context("Invalid setup")?;
    let (bytes, bits) = mode.header_bytes()?;

    fs::write(output, &bytes).context("Failed to write header")?;

    println!("Done!");
    println!("  Output: {}", output.display());
    println!("  Size:   {} bits ({} bytes)", bits, bytes.len());
    Ok(())
}

fn encode(setup_path: &Path, input: &Path, output: &Path) -> Result<()> {
    let setup = floorctl::load_setup(setup_path)?;

    println!("Reading {}...", input.display());
    let data = fs::read(input).context("Failed to read input file")?;
    let blocks = floorctl::parse_blocks(&data)?;
    println!("  Blocks: {}", blocks.blocks.len());

    println!("Encoding...");
    let (stream, stats) = floorctl::encode_blocks(&setup, &blocks.blocks)?;
    let bytes = stream.to_bytes()?;
    fs::write(output, &bytes).context("Failed to write output file")?;

    println!("Done!");
    println!("  Output: {}", output.display());
    println!("  Silent blocks: {}", stats.silent_frames);
    println!("  Bits per floor: {:.1}", stats.bits_per_floor());
    println!("  Size: {} bytes", bytes.len());
    Ok(())
}

fn decode(input: &Path, output: &Path) -> Result<()> {
    println!("Reading {}...", input.display());
    let data = fs::read(input).context("Failed to read floor stream")?;
    let stream = floorctl::read_stream(&data)?;

    println!("Decoding {} blocks...", stream.blocks.len());
    let curves = floorctl::decode_stream(&stream)?;

    let json = serde_json::to_string(&curves).context("Failed to serialize curves")?;
    fs::write(output, json).context("Failed to write output file")?;

    println!("Done!");
    println!("  Output: {}", output.display());
    if !curves.muted.is_empty() {
        println!("  Muted blocks: {:?}", curves.muted);
    }
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read floor stream")?;
    let stream = floorctl::read_stream(&data)?;
    let info = floorctl::stream_info(&stream, data.len());

    println!("Floor Stream");
    println!("───────────────────────────────");
    println!("  Blocks:      {}", info.blocks);
    println!("  Bins:        {}", info.bins);
    println!("  Silent:      {}", info.silent_blocks);
    println!("  Total bits:  {}", info.total_bits);
    println!("  File size:   {} bytes", info.bytes);
    println!("  Bits/floor:  {:.1}", info.bits_per_floor);
    Ok(())
}
