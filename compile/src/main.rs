use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use netplace::{compile, CompileOptions, Gate, Net};
use tracing::info;

/// Map a gate netlist onto a layered, unit-partitioned device and print the layout.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Netlist to compile (`.json` or `.aag`)
    netlist: PathBuf,

    /// Device description as JSON (`supported`, `units`, `capacity`)
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Gate kinds the device supports, overriding the device file
    #[arg(short, long, value_delimiter = ',')]
    supported: Vec<String>,

    /// Nodes per unit per layer, overriding the device file
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Compute units per layer, overriding the device file
    #[arg(short, long)]
    units: Option<usize>,

    /// Print the mapped net before the layout
    #[arg(long)]
    print_net: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).with_writer(std::io::stderr).init();

    let mut options = match &cli.device {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            CompileOptions::from_json_reader(file)
                .with_context(|| format!("reading device description {}", path.display()))?
        },
        None => CompileOptions::default(),
    };
    if !cli.supported.is_empty() {
        options.supported = cli
            .supported
            .iter()
            .map(|name| parse_gate(name))
            .collect::<Result<Vec<_>>>()?;
    }
    if let Some(capacity) = cli.capacity {
        options.capacity = capacity;
    }
    if cli.units.is_some() {
        options.units = cli.units;
    }

    let file = File::open(&cli.netlist).with_context(|| format!("opening {}", cli.netlist.display()))?;
    let is_aiger = cli.netlist.extension().map_or(false, |ext| ext == "aag" || ext == "aig");
    let loaded = if is_aiger { Net::from_aiger(file) } else { Net::from_json_reader(file) };
    let (mut net, mut ids) = loaded.with_context(|| format!("loading {}", cli.netlist.display()))?;
    info!("loaded {} nodes and {} wires", net.node_count(), net.wire_count());

    let (layout, stats) = compile(&mut net, &mut ids, &options).context("compiling netlist")?;

    if cli.print_net {
        println!("{}", net);
    }
    println!("{}", layout);
    println!(
        "{} rewrites, {} nodes, {} layers, {} units, {} global signals",
        stats.rewrites,
        stats.nodes,
        stats.layers,
        stats.units,
        layout.globals().len()
    );

    Ok(())
}

fn parse_gate(name: &str) -> Result<Gate> {
    Gate::ALL
        .iter()
        .copied()
        .find(|gate| gate.to_string().eq_ignore_ascii_case(name))
        .with_context(|| format!("unknown gate kind `{}`", name))
}
