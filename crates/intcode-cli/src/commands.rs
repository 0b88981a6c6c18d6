//! Command line parsing and the commands themselves.

use anyhow::{anyhow, bail, Context, Result};
use intcode_core::{CliConfig, Word, WordKind};
use intcode_ir::Program;
use intcode_net::{Network, Pipeline};
use intcode_runtime::{Interpreter, RunState};
use num_bigint::BigInt;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Feed values (or text lines) to one machine and print its output
    Run { values: Vec<String> },
    /// Chain machines, optionally in a feedback loop
    Pipeline { phases: Option<Vec<i64>>, feedback: bool },
    /// Packet network with a NAT
    Network,
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub program_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub word: Option<WordKind>,
    pub ascii: bool,
    pub log_json: bool,
}

impl Invocation {
    /// Parse the arguments that follow the binary name. Options may appear
    /// anywhere; anything else is positional.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut positionals = Vec::new();
        let mut config_path = None;
        let mut word = None;
        let mut ascii = false;
        let mut feedback = false;
        let mut log_json = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter.next().context("--config needs a file")?;
                    config_path = Some(PathBuf::from(path));
                }
                "--word" => {
                    let kind = iter.next().context("--word needs small, wide or big")?;
                    word = Some(kind.parse::<WordKind>()?);
                }
                "--ascii" => ascii = true,
                "--feedback" => feedback = true,
                "--log-json" => log_json = true,
                option if option.starts_with("--") => bail!("unknown option {}", option),
                _ => positionals.push(arg.clone()),
            }
        }

        let mut positionals = positionals.into_iter();
        let command = positionals.next().context("missing command")?;
        let program_path = positionals
            .next()
            .map(PathBuf::from)
            .context("missing program file")?;
        let rest: Vec<String> = positionals.collect();

        let command = match command.as_str() {
            "run" => Command::Run { values: rest },
            "pipeline" => {
                if rest.len() > 1 {
                    bail!("pipeline takes a single comma-separated phase list");
                }
                let phases = rest.first().map(|list| parse_phases(list)).transpose()?;
                Command::Pipeline { phases, feedback }
            }
            "network" => {
                if !rest.is_empty() {
                    bail!("network takes no arguments");
                }
                Command::Network
            }
            other => bail!("unknown command {}", other),
        };

        if feedback && !matches!(command, Command::Pipeline { .. }) {
            bail!("--feedback only applies to pipeline");
        }

        Ok(Self {
            command,
            program_path,
            config_path,
            word,
            ascii,
            log_json,
        })
    }

    /// Let command line options override the loaded configuration
    pub fn apply_to(&self, config: &mut CliConfig) {
        if let Some(word) = self.word {
            config.run.word = word;
        }
        if self.ascii {
            config.run.ascii = true;
        }
        if self.log_json {
            config.run.log_json = true;
        }
        if let Command::Pipeline { phases, feedback } = &self.command {
            if let Some(phases) = phases {
                config.pipeline.phases = phases.clone();
            }
            if *feedback {
                config.pipeline.feedback = true;
            }
        }
    }
}

fn parse_phases(list: &str) -> Result<Vec<i64>> {
    list.split(',')
        .map(|phase| {
            phase
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid phase {:?}", phase))
        })
        .collect()
}

pub fn execute(invocation: &Invocation, config: &CliConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.run.word {
        WordKind::Small => execute_with::<i32>(invocation, config, &mut out),
        WordKind::Wide => execute_with::<i64>(invocation, config, &mut out),
        WordKind::Big => execute_with::<BigInt>(invocation, config, &mut out),
    }
}

fn execute_with<W: Word>(
    invocation: &Invocation,
    config: &CliConfig,
    out: &mut impl Write,
) -> Result<()> {
    let path = &invocation.program_path;
    let program = Program::<W>::from_file(path)
        .with_context(|| format!("failed to load program from {}", path.display()))?;
    info!("Loaded {} cells from {}", program.len(), path.display());

    match &invocation.command {
        Command::Run { values } => {
            run_program(program, values, config.run.ascii, out)?;
        }
        Command::Pipeline { .. } => {
            let signal = Pipeline::from_config(&program, &config.pipeline)?.run()?;
            writeln!(out, "{}", signal)?;
        }
        Command::Network => {
            let report = Network::new(&program, &config.network)?.run()?;
            writeln!(
                out,
                "first NAT packet: x={} y={}",
                report.first_nat_packet.x, report.first_nat_packet.y
            )?;
            writeln!(out, "repeated NAT y: {}", report.repeated_nat_y)?;
        }
    }
    Ok(())
}

/// Run one machine to completion or until it needs more input.
///
/// In ASCII mode every value is a line of text, and output that decodes as
/// text is printed as lines; other values are printed as numbers.
pub fn run_program<W: Word>(
    program: Program<W>,
    values: &[String],
    ascii: bool,
    out: &mut impl Write,
) -> Result<RunState> {
    let mut machine = Interpreter::new(program);

    if ascii {
        for line in values {
            machine.input_line(line);
        }
    } else {
        for (index, value) in values.iter().enumerate() {
            let value = W::parse_cell(value.trim()).map_err(|reason| {
                anyhow!("input {} ({:?}) is not a valid {}: {}", index, value, W::KIND, reason)
            })?;
            machine.input(value);
        }
    }

    let state = machine.run()?;

    if ascii {
        loop {
            if let Some(line) = machine.output_line() {
                writeln!(out, "{}", line)?;
            } else if let Ok(value) = machine.output() {
                writeln!(out, "{}", value)?;
            } else {
                break;
            }
        }
    } else {
        for value in machine.drain_output() {
            writeln!(out, "{}", value)?;
        }
    }

    if state == RunState::Blocked {
        warn!("Program is waiting for more input ({})", machine);
    }
    Ok(state)
}
