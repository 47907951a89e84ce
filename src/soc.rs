//! Minimal System-on-Chip: CPU + RAM + UART wired together
//!
//! `Soc` owns all three and drives one CPU clock edge per `tick`. It exists
//! so a host (test harness, binary loader) can run a whole program and
//! observe UART output without reaching into the CPU's bus plumbing itself.

use crate::cpu::Cpu;
use crate::io::Uart;
use crate::memory::{LoadError, Ram};

pub struct Soc {
    pub cpu: Cpu,
    pub ram: Ram,
    pub uart: Uart,

    /// Interrupt request line. Wired in for future use; no vectoring
    /// protocol is specified, so this is read by nothing today.
    pub irq: bool,
}

impl Soc {
    pub fn new(reset_vector: u16) -> Self {
        Self {
            cpu: Cpu::with_reset_vector(reset_vector),
            ram: Ram::new(),
            uart: Uart::new(),
            irq: false,
        }
    }

    /// Load a program image at `offset` into RAM.
    pub fn load_program(&mut self, bytes: &[u8], offset: usize) -> Result<(), LoadError> {
        self.ram.load(bytes, offset)
    }

    /// Advance one clock edge.
    pub fn tick(&mut self) {
        self.cpu.tick(&mut self.ram, &mut self.uart);
    }

    /// Advance one full instruction; returns the clock edges it took.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.ram, &mut self.uart)
    }

    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    /// Run until HALTED or `max_cycles` retired instructions, draining every
    /// UART TX byte along the way (mirroring a host always ready to receive).
    pub fn run_collecting_tx(&mut self, max_cycles: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..max_cycles {
            if self.halted() {
                break;
            }
            self.step();
            while let Some(byte) = self.uart.take_tx() {
                out.push(byte);
            }
        }
        out
    }
}
