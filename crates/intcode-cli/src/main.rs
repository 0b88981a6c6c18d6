//! Command line runner for Intcode programs.

mod commands;
mod telemetry;

use anyhow::{Context, Result};
use commands::Invocation;
use intcode_core::CliConfig;
use tracing::info;

fn usage(program_name: &str) -> String {
    format!(
        "Usage: {0} [options] <command> <program-file> [args...]

Commands:
  run <file> [values...]          Feed values, run, print each output value
  pipeline <file> [p0,p1,...]     Chain one machine per phase setting
  network <file>                  Run a packet network with a NAT

Options:
  --config <file.json>            Load configuration
  --word small|wide|big           Cell type (default: wide)
  --ascii                         run: values are text lines, output is text
  --feedback                      pipeline: loop the last stage into the first
  --log-json                      Log as JSON lines on stderr

Examples:
  {0} run day9.txt 1
  {0} --word big run day9.txt 2
  {0} pipeline day7.txt 9,8,7,6,5 --feedback",
        program_name
    )
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("intcode");

    let invocation = match Invocation::parse(args.get(1..).unwrap_or(&[])) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            eprintln!("{}", usage(program_name));
            std::process::exit(2);
        }
    };

    // Load configuration
    let mut config = match &invocation.config_path {
        Some(path) => CliConfig::from_json_file(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?,
        None => CliConfig::default(),
    };
    config.apply_env()?;
    invocation.apply_to(&mut config);
    config.validate()?;

    telemetry::init_telemetry(&config.run)?;
    info!("Running {} with {} cells", invocation.program_path.display(), config.run.word);

    let result = commands::execute(&invocation, &config);
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }

    telemetry::shutdown_telemetry();
    result
}
