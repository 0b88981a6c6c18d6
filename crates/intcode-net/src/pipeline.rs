//! Machines chained output-to-input.

use intcode_core::{Error, PipelineConfig, Result, Word};
use intcode_ir::Program;
use intcode_runtime::{Interpreter, RunState, Status};
use tracing::{debug, instrument};

/// A chain of machines running the same program.
///
/// Each stage first receives its phase setting. The first stage then
/// receives the initial signal and every stage feeds its output to the next.
/// In feedback mode the last stage feeds the first, and the chain runs until
/// the last stage halts.
pub struct Pipeline<W: Word = i64> {
    stages: Vec<Interpreter<W>>,
    feedback: bool,
    initial_signal: W,
}

impl<W: Word> Pipeline<W> {
    pub fn new(program: &Program<W>, phases: &[W], feedback: bool) -> Self {
        let stages = phases
            .iter()
            .map(|phase| {
                let mut stage = Interpreter::new(program.clone());
                stage.input(phase.clone());
                stage
            })
            .collect();

        Self {
            stages,
            feedback,
            initial_signal: W::zero(),
        }
    }

    pub fn from_config(program: &Program<W>, config: &PipelineConfig) -> Result<Self> {
        let phases = config
            .phases
            .iter()
            .map(|&phase| to_word(phase, "phase"))
            .collect::<Result<Vec<W>>>()?;
        let initial_signal = to_word(config.initial_signal, "initial signal")?;
        Ok(Self::new(program, &phases, config.feedback).with_initial_signal(initial_signal))
    }

    pub fn with_initial_signal(mut self, signal: W) -> Self {
        self.initial_signal = signal;
        self
    }

    pub fn stages(&self) -> &[Interpreter<W>] {
        &self.stages
    }

    /// Run the chain and return the last value the last stage emitted.
    #[instrument(skip(self), fields(stages = self.stages.len(), feedback = self.feedback))]
    pub fn run(&mut self) -> Result<W> {
        if self.stages.is_empty() {
            return Err(Error::InvalidState("pipeline has no stages".to_string()));
        }

        let last = self.stages.len() - 1;
        let mut carry = vec![self.initial_signal.clone()];
        let mut result = None;
        let mut round = 0u64;

        loop {
            round += 1;
            let mut produced = false;
            let mut last_state = RunState::Blocked;

            for (index, stage) in self.stages.iter_mut().enumerate() {
                if stage.status() == Status::Halted {
                    carry.clear();
                    continue;
                }
                stage.input_all(carry.drain(..));
                let state = stage.run()?;
                carry = stage.drain_output();
                produced |= !carry.is_empty();

                if index == last {
                    last_state = state;
                    if let Some(value) = carry.last() {
                        result = Some(value.clone());
                    }
                }
            }

            debug!(round, ?last_state, "Pipeline round finished");

            if !self.feedback || last_state == RunState::Completed {
                break;
            }
            if !produced {
                return Err(Error::InvalidState(format!(
                    "pipeline stalled in round {} with every stage waiting for input",
                    round
                )));
            }
        }

        result.ok_or_else(|| Error::InvalidState("last stage produced no output".to_string()))
    }
}

fn to_word<W: Word>(value: i64, what: &str) -> Result<W> {
    W::from_i64(value)
        .ok_or_else(|| Error::Config(format!("{} {} does not fit in {}", what, value, W::KIND)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    const CHAIN: &str = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0";
    const FEEDBACK: &str = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,\
        4,27,1001,28,-1,28,1005,28,6,99,0,0,5";

    #[test]
    fn test_single_pass() {
        let program = Program::<i64>::parse(CHAIN).unwrap();
        let mut pipeline = Pipeline::new(&program, &[4, 3, 2, 1, 0], false);
        assert_eq!(pipeline.run().unwrap(), 43210);
        assert!(pipeline
            .stages()
            .iter()
            .all(|stage| stage.status() == Status::Halted));
    }

    #[test]
    fn test_feedback_loop() {
        let program = Program::<i64>::parse(FEEDBACK).unwrap();
        let mut pipeline = Pipeline::new(&program, &[9, 8, 7, 6, 5], true);
        assert_eq!(pipeline.run().unwrap(), 139629729);
    }

    #[test]
    fn test_from_config() {
        let program = Program::<BigInt>::parse(CHAIN).unwrap();
        let config = PipelineConfig {
            phases: vec![4, 3, 2, 1, 0],
            feedback: false,
            initial_signal: 0,
        };
        let mut pipeline = Pipeline::from_config(&program, &config).unwrap();
        assert_eq!(pipeline.run().unwrap(), BigInt::from(43210));
    }

    #[test]
    fn test_from_config_rejects_unrepresentable_phase() {
        let program = Program::<i32>::parse(CHAIN).unwrap();
        let config = PipelineConfig {
            phases: vec![i64::MAX],
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::from_config(&program, &config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_stall_is_reported() {
        // Reads forever and never writes
        let program = Program::<i64>::parse("3,10,1105,1,0").unwrap();
        let mut pipeline = Pipeline::new(&program, &[1, 2], true);
        assert!(matches!(pipeline.run(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_no_output_is_an_error() {
        let program = Program::<i64>::parse("3,10,3,10,99").unwrap();
        let mut pipeline = Pipeline::new(&program, &[1], false);
        assert!(pipeline.run().is_err());
    }
}
