// ============================================================================
// BET ORACLE - OPCODE TOOL
// ============================================================================
//
// Builds, inspects and submits betting opcodes:
//
//   bet-oracle [--network N] [--dry-run] encode  <file|->
//   bet-oracle [--network N]             decode  <hex>
//   bet-oracle [--network N] [--dry-run] submit  <file|->
//   bet-oracle [--network N]             mapping <index> <name>
//
// Input files hold one JSON record (or an array of them) in human units.
// Settings come from BET_ORACLE_* (a .env file is loaded first).

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use dotenv::dotenv;
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bet_oracle::mapping::parse_index;
use bet_oracle::{
    build_record, decode_hex, encode_hex, render_record, InMemoryMappingRegistry, MappingRegistry,
    Network, NodeRpcClient, OracleConfig, RecordFields, SubmissionPipeline,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const USAGE: &str = "usage: bet-oracle [--network mainnet|testnet|regtest] [--dry-run] \
<encode <file|-> | decode <hex> | submit <file|-> | mapping <index> <name>>";

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Debug)]
enum Command {
    Encode(String),
    Decode(String),
    Submit(String),
    Mapping { index: String, name: String },
}

#[derive(Debug)]
struct Args {
    network: Option<Network>,
    dry_run: bool,
    command: Command,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> CliResult<Args> {
    let mut network = None;
    let mut dry_run = false;
    let mut positional = Vec::new();

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--network" | "-n" => {
                let value = iter.next().ok_or("--network needs a value")?;
                network = Some(value.parse::<Network>()?);
            }
            "--dry-run" => dry_run = true,
            "-h" | "--help" => return Err(USAGE.into()),
            _ => positional.push(arg),
        }
    }

    let command = match positional.as_slice() {
        [cmd, input] if cmd == "encode" => Command::Encode(input.clone()),
        [cmd, hex] if cmd == "decode" => Command::Decode(hex.clone()),
        [cmd, input] if cmd == "submit" => Command::Submit(input.clone()),
        [cmd, index, name] if cmd == "mapping" => Command::Mapping {
            index: index.clone(),
            name: name.clone(),
        },
        _ => return Err(USAGE.into()),
    };

    Ok(Args {
        network,
        dry_run,
        command,
    })
}

/// A record file holds one record or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordBatch {
    One(RecordFields),
    Many(Vec<RecordFields>),
}

fn read_records(input: &str) -> CliResult<Vec<RecordFields>> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };

    Ok(match serde_json::from_str::<RecordBatch>(&text)? {
        RecordBatch::One(fields) => vec![fields],
        RecordBatch::Many(list) => list,
    })
}

// ============================================================================
// COMMANDS
// ============================================================================

fn load_registry(config: &OracleConfig) -> CliResult<InMemoryMappingRegistry> {
    match &config.mappings_path {
        Some(path) if path.exists() => Ok(InMemoryMappingRegistry::load_from(path)?),
        _ => Ok(InMemoryMappingRegistry::new()),
    }
}

fn save_registry(config: &OracleConfig, registry: &InMemoryMappingRegistry) -> CliResult<()> {
    if let Some(path) = &config.mappings_path {
        registry.save_to(path)?;
    }
    Ok(())
}

fn encode_command(config: &OracleConfig, input: &str) -> CliResult<()> {
    let registry = load_registry(config)?;
    for fields in read_records(input)? {
        let record = build_record(&fields, &registry)?;
        println!("{}", encode_hex(&record)?);
    }
    save_registry(config, &registry)
}

fn decode_command(config: &OracleConfig, hex: &str) -> CliResult<()> {
    let registry = load_registry(config)?;
    let record = decode_hex(hex)?;
    println!("{}", serde_json::to_string_pretty(&render_record(&record, &registry))?);
    Ok(())
}

fn mapping_command(config: &OracleConfig, index: &str, name: &str) -> CliResult<()> {
    let registry = load_registry(config)?;
    let lookup = registry.resolve_id(parse_index(index)?, name)?;
    println!("{}", serde_json::to_string_pretty(&lookup)?);
    save_registry(config, &registry)
}

async fn submit_command(config: &OracleConfig, input: &str) -> CliResult<()> {
    let registry = load_registry(config)?;
    let records = read_records(input)?
        .iter()
        .map(|fields| build_record(fields, &registry))
        .collect::<Result<Vec<_>, _>>()?;
    save_registry(config, &registry)?;

    let client = Arc::new(NodeRpcClient::new(config.rpc.clone())?);
    let pipeline = SubmissionPipeline::new(client.clone(), client, config.pipeline_settings());
    info!(
        "Submitting {} opcode(s) on {} from {}",
        records.len(),
        config.network,
        config.funding_address()
    );

    let mut failures = 0usize;
    for record in &records {
        match pipeline.submit_record(record).await {
            Ok(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
            Err(e) => {
                failures += 1;
                warn!("{} opcode for event {:?} failed: {}", record.type_tag(), record.event_id(), e);
            }
        }
    }

    let stats = pipeline.stats();
    info!(
        "Done: {} confirmed, {} dry run, {} rejected, {} failed",
        stats.confirmed, stats.dry_runs, stats.rejected, stats.failed
    );

    if failures > 0 {
        return Err(format!("{} of {} submissions failed", failures, records.len()).into());
    }
    Ok(())
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,bet_oracle=debug")))
        .with(tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let args = parse_args(std::env::args().skip(1))?;

    // --network takes precedence over BET_ORACLE_NETWORK
    let network = args.network.map(|n| n.to_string());
    let mut config = OracleConfig::from_lookup(|key| match (key, &network) {
        ("BET_ORACLE_NETWORK", Some(n)) => Some(n.clone()),
        _ => std::env::var(key).ok(),
    })?;
    config.dry_run |= args.dry_run;

    match &args.command {
        Command::Encode(input) => encode_command(&config, input),
        Command::Decode(hex) => decode_command(&config, hex),
        Command::Submit(input) => submit_command(&config, input).await,
        Command::Mapping { index, name } => mapping_command(&config, index, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> CliResult<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_commands() {
        let parsed = args(&["--network", "testnet", "--dry-run", "submit", "-"]).unwrap();
        assert_eq!(parsed.network, Some(Network::Testnet));
        assert!(parsed.dry_run);
        assert!(matches!(parsed.command, Command::Submit(ref input) if input == "-"));

        let parsed = args(&["mapping", "teams", "Arsenal"]).unwrap();
        assert!(matches!(parsed.command, Command::Mapping { ref index, .. } if index == "teams"));
    }

    #[test]
    fn test_parse_rejects_bad_usage() {
        assert!(args(&[]).is_err());
        assert!(args(&["decode"]).is_err());
        assert!(args(&["--network", "moon", "decode", "2a"]).is_err());
    }
}
