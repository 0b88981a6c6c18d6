//! Addressed packet network of machines.
//!
//! Every machine boots with its own address as its first input. Output is
//! read in `(destination, x, y)` triples. Packets for the NAT address are
//! held by the NAT; when a whole round passes without any packet being
//! delivered, the NAT resends the last packet it holds to machine 0.

use intcode_core::{Error, NetworkConfig, Result, Word};
use intcode_ir::Program;
use intcode_runtime::{Interpreter, Status};
use std::collections::VecDeque;
use tracing::{debug, info, instrument, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<W> {
    pub x: W,
    pub y: W,
}

/// Outcome of a network run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReport<W> {
    /// First packet any machine sent to the NAT
    pub first_nat_packet: Packet<W>,
    /// The `y` the NAT delivered to machine 0 twice in a row
    pub repeated_nat_y: W,
    pub rounds: u64,
}

pub struct Network<W: Word = i64> {
    machines: Vec<Interpreter<W>>,
    queues: Vec<VecDeque<Packet<W>>>,
    nat: Option<Packet<W>>,
    first_nat_packet: Option<Packet<W>>,
    idle_input: W,
    nat_address: W,
    max_rounds: u64,
}

impl<W: Word> Network<W> {
    pub fn new(program: &Program<W>, config: &NetworkConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(Error::Config("network needs at least one machine".to_string()));
        }

        let mut machines = Vec::with_capacity(config.size);
        for address in 0..config.size {
            let address = W::from_usize(address).ok_or_else(|| {
                Error::Config(format!("address {} does not fit in {}", address, W::KIND))
            })?;
            let mut machine = Interpreter::new(program.clone());
            machine.input(address);
            machines.push(machine);
        }

        let convert = |value: i64, what: &str| {
            W::from_i64(value).ok_or_else(|| {
                Error::Config(format!("{} {} does not fit in {}", what, value, W::KIND))
            })
        };

        Ok(Self {
            queues: vec![VecDeque::new(); config.size],
            machines,
            nat: None,
            first_nat_packet: None,
            idle_input: convert(config.idle_input, "idle input")?,
            nat_address: convert(config.nat_address, "NAT address")?,
            max_rounds: config.max_rounds,
        })
    }

    pub fn machines(&self) -> &[Interpreter<W>] {
        &self.machines
    }

    /// The packet the NAT currently holds
    pub fn nat(&self) -> Option<&Packet<W>> {
        self.nat.as_ref()
    }

    /// Schedule rounds until the NAT sends the same `y` to machine 0 twice
    /// in a row.
    #[instrument(skip(self), fields(machines = self.machines.len()))]
    pub fn run(&mut self) -> Result<NetworkReport<W>> {
        let mut last_nat_y: Option<W> = None;

        for round in 1..=self.max_rounds {
            self.run_machines()?;

            if self.deliver() {
                continue;
            }

            // Idle round
            let Some(packet) = self.nat.clone() else {
                continue;
            };
            debug!(round, x = %packet.x, y = %packet.y, "NAT wakes machine 0");

            if last_nat_y.as_ref() == Some(&packet.y) {
                let first_nat_packet = self
                    .first_nat_packet
                    .clone()
                    .unwrap_or_else(|| packet.clone());
                info!(round, y = %packet.y, "NAT repeated itself");
                return Ok(NetworkReport {
                    first_nat_packet,
                    repeated_nat_y: packet.y,
                    rounds: round,
                });
            }
            last_nat_y = Some(packet.y.clone());
            self.queues[0].push_back(packet);
        }

        Err(Error::InvalidState(format!(
            "network did not settle within {} rounds",
            self.max_rounds
        )))
    }

    /// Run every live machine until it blocks or halts and route its packets.
    fn run_machines(&mut self) -> Result<()> {
        for source in 0..self.machines.len() {
            let machine = &mut self.machines[source];
            if machine.status() == Status::Halted {
                continue;
            }
            machine.run()?;

            // A partial triple stays queued until the machine finishes it.
            while machine.pending_output() >= 3 {
                let dest = machine.output()?;
                let packet = Packet {
                    x: machine.output()?,
                    y: machine.output()?,
                };
                trace!(source, dest = %dest, x = %packet.x, y = %packet.y, "Packet sent");

                if dest == self.nat_address {
                    if self.first_nat_packet.is_none() {
                        self.first_nat_packet = Some(packet.clone());
                    }
                    self.nat = Some(packet);
                    continue;
                }

                let queue = dest
                    .to_address()
                    .and_then(|address| self.queues.get_mut(address))
                    .ok_or_else(|| {
                        Error::InvalidState(format!(
                            "machine {} sent a packet to unknown address {}",
                            source, dest
                        ))
                    })?;
                queue.push_back(packet);
            }
        }
        Ok(())
    }

    /// Hand queued packets to their machines, or the idle input to machines
    /// with none. Returns true if any packet was delivered.
    fn deliver(&mut self) -> bool {
        let mut delivered = false;
        for (machine, queue) in self.machines.iter_mut().zip(self.queues.iter_mut()) {
            if machine.status() == Status::Halted {
                queue.clear();
                continue;
            }
            if queue.is_empty() {
                machine.input(self.idle_input.clone());
                continue;
            }
            delivered = true;
            for packet in queue.drain(..) {
                machine.input(packet.x);
                machine.input(packet.y);
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    /// Boots by sending (255, address, address + 100), then forwards every
    /// packet it receives to the NAT.
    const NODE: &str = "3,100,1001,100,100,101,104,255,4,100,4,101,\
        3,102,1008,102,-1,103,1005,103,12,3,104,104,255,4,102,4,104,1105,1,12";

    fn config(size: usize) -> NetworkConfig {
        NetworkConfig {
            size,
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_nat_repeats() {
        let program = Program::<i64>::parse(NODE).unwrap();
        let mut network = Network::new(&program, &config(3)).unwrap();
        let report = network.run().unwrap();

        assert_eq!(report.first_nat_packet, Packet { x: 0, y: 100 });
        assert_eq!(report.repeated_nat_y, 102);
        assert_eq!(report.rounds, 3);
        assert_eq!(network.nat(), Some(&Packet { x: 2, y: 102 }));
    }

    #[test]
    fn test_bigint_network() {
        let program = Program::<BigInt>::parse(NODE).unwrap();
        let mut network = Network::new(&program, &config(2)).unwrap();
        let report = network.run().unwrap();
        assert_eq!(report.repeated_nat_y, BigInt::from(101));
    }

    #[test]
    fn test_unknown_destination() {
        let program = Program::<i64>::parse("104,7,104,1,104,2,99").unwrap();
        let mut network = Network::new(&program, &config(2)).unwrap();
        assert!(matches!(network.run(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_round_limit() {
        // Never sends anything
        let program = Program::<i64>::parse("3,100,1105,1,0").unwrap();
        let mut network = Network::new(
            &program,
            &NetworkConfig {
                size: 2,
                max_rounds: 10,
                ..NetworkConfig::default()
            },
        )
        .unwrap();
        assert!(network.run().is_err());
        assert_eq!(network.machines().len(), 2);
        assert!(network.nat().is_none());
    }

    #[test]
    fn test_rejects_empty_network() {
        let program = Program::<i64>::parse("99").unwrap();
        assert!(Network::new(&program, &config(0)).is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_address() {
        let program = Program::<i32>::parse("99").unwrap();
        let config = NetworkConfig {
            nat_address: i64::MAX,
            ..NetworkConfig::default()
        };
        assert!(matches!(Network::new(&program, &config), Err(Error::Config(_))));
    }
}
