//! CPU test harness for instruction testing
//!
//! Provides a minimal environment for testing CPU instructions without a
//! full SoC: just the CPU plus a bare RAM, no I/O bus. Instructions that
//! touch ports get a `Uart` anyway since [`Cpu::step`] requires some
//! `IoBus` — tests that don't exercise IO simply never observe it.

use crate::cpu::Cpu;
use crate::io::Uart;
use crate::memory::Ram;

/// Test harness for CPU instruction testing.
pub struct CpuHarness {
    pub cpu: Cpu,
    pub mem: Ram,
    pub io: Uart,
}

impl CpuHarness {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mem: Ram::new(),
            io: Uart::new(),
        }
    }

    pub fn with_reset_vector(reset_vector: u16) -> Self {
        Self {
            cpu: Cpu::with_reset_vector(reset_vector),
            mem: Ram::new(),
            io: Uart::new(),
        }
    }

    /// Load a program at `offset`, matching the little-endian instruction
    /// binary format.
    pub fn load_program(&mut self, code: &[u8], offset: usize) {
        self.mem.load(code, offset).expect("program fits in RAM");
    }

    /// Execute one instruction, returning the number of clock edges it took.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.mem, &mut self.io)
    }

    pub fn step_n(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
    }
}

impl Default for CpuHarness {
    fn default() -> Self {
        Self::new()
    }
}
