use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use ap_client::{AspenResult, BackendKind, Client, ClientConfig, Connection, Stream, UnitSet};
use ap_core::{Tolerances, parse_component};

#[derive(Parser)]
#[command(name = "ap-cli")]
#[command(about = "Aspen Plus case client - inspect, modify and run flowsheets", long_about = None)]
struct Cli {
    /// Backend to drive (defaults to the configured one, else com)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,
    /// COM automation identifier (e.g. Apwn.Document.40.0)
    #[arg(long, global = true)]
    prog_id: Option<String>,
    /// Client configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the streams of a case
    Streams {
        /// Case file (or mock catalog name)
        case_path: PathBuf,
        /// Run the simulation before reading
        #[arg(long)]
        run: bool,
    },
    /// Write one stream's inputs, then run and print the result
    SetStream {
        /// Case file (or mock catalog name)
        case_path: PathBuf,
        /// Stream name
        name: String,
        /// Total flow
        #[arg(long)]
        flow: f64,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        pressure: Option<f64>,
        /// Component amount as NAME=VALUE (repeatable)
        #[arg(long = "component", value_parser = parse_component)]
        components: Vec<(String, f64)>,
        /// Skip the run after writing
        #[arg(long)]
        no_run: bool,
        /// Save the case here afterwards
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print stream temperatures and pressures converted to SI
    ConvertUnits {
        /// Case file (or mock catalog name)
        case_path: PathBuf,
        /// Unit set the case values are in (defaults to the case's own)
        #[arg(long)]
        units: Option<UnitSet>,
    },
}

fn main() -> AspenResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let mut client = Client::new(&config);
    info!(backend = client.backend_name(), "client ready");

    match cli.command {
        Commands::Streams { case_path, run } => cmd_streams(&mut client, &case_path, run),
        Commands::SetStream {
            case_path,
            name,
            flow,
            temperature,
            pressure,
            components,
            no_run,
            save,
        } => {
            let mut stream = Stream::new(name, flow);
            stream.temperature = temperature;
            stream.pressure = pressure;
            if !components.is_empty() {
                stream = stream.with_composition(components);
            }
            cmd_set_stream(&mut client, &case_path, &stream, !no_run, save.as_deref())
        }
        Commands::ConvertUnits { case_path, units } => {
            cmd_convert_units(&mut client, &case_path, units)
        }
    }
}

fn build_config(cli: &Cli) -> AspenResult<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.prog_id.is_some() {
        config.prog_id = cli.prog_id.clone();
    }
    Ok(config)
}

fn open<'a>(client: &'a mut Client, case_path: &Path) -> AspenResult<Connection<'a>> {
    let mut conn = client.connect()?;
    conn.open_case(case_path)?;
    Ok(conn)
}

fn print_streams(streams: &[Stream]) {
    if streams.is_empty() {
        println!("No streams in case");
        return;
    }
    for stream in streams {
        match composition_note(stream) {
            Some(note) => println!("  {} {}", stream, note),
            None => println!("  {}", stream),
        }
    }
}

/// Compositions that do not sum to one are amounts, not fractions.
fn composition_note(stream: &Stream) -> Option<String> {
    let total = stream.composition_total()?;
    if stream.is_normalized(Tolerances::default()) {
        return None;
    }
    Some(format!("(component amounts, total {:.4})", total))
}

fn cmd_streams(client: &mut Client, case_path: &Path, run: bool) -> AspenResult<()> {
    let mut conn = open(client, case_path)?;
    if run {
        let report = conn.run()?;
        println!(
            "✓ Run completed in {:.2} s ({})",
            report.duration.as_secs_f64(),
            report.entry_point
        );
    }

    println!("Streams in {}:", case_path.display());
    print_streams(&conn.get_streams()?);
    conn.finish()
}

fn cmd_set_stream(
    client: &mut Client,
    case_path: &Path,
    stream: &Stream,
    run: bool,
    save: Option<&Path>,
) -> AspenResult<()> {
    let mut conn = open(client, case_path)?;
    conn.set_stream(&stream.name, stream)?;
    println!("✓ Stream {} updated", stream.name);

    if run {
        conn.run()?;
        println!("✓ Run completed");
    }
    if let Some(path) = save {
        let written = conn.save(Some(path))?;
        println!("✓ Saved to {}", written.display());
    }

    print_streams(&conn.get_streams()?);
    conn.finish()
}

fn cmd_convert_units(
    client: &mut Client,
    case_path: &Path,
    units: Option<UnitSet>,
) -> AspenResult<()> {
    let mut conn = open(client, case_path)?;
    let units = units.unwrap_or_else(|| conn.units());
    let si = UnitSet::Si;

    println!("Streams in {} ({} -> {}):", case_path.display(), units, si);
    for stream in conn.get_streams()? {
        let t = stream
            .temperature_in(units)
            .map(|t| format!("{:.2} {}", si.raw_temperature(t), si.temperature_label()))
            .unwrap_or_else(|| "-".to_string());
        let p = stream
            .pressure_in(units)
            .map(|p| format!("{:.1} {}", si.raw_pressure(p), si.pressure_label()))
            .unwrap_or_else(|| "-".to_string());
        println!("  {}: T={}, P={}", stream.name, t, p);
    }
    conn.finish()
}
