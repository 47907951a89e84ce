//! Architectural state of the CPU core
//!
//! [`Cpu`] is a plain value: every field here is either sequential state
//! latched at a clock edge, or a pipeline register the engine uses to carry
//! a value from one state to the next. `cpu::engine` is the only thing that
//! mutates it.

use crate::decode::{decode, Decoded};
use crate::opcodes::Flag;
use crate::regfile::RegisterFile;

/// CPU state-machine states (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Reset,
    Fetch,
    FetchExt,
    Decode,
    Execute,
    Memory,
    Writeback,
    Halted,
}

/// Default reset vector: PC at first FETCH.
pub const DEFAULT_RESET_VECTOR: u16 = 0x0100;

#[derive(Debug, Clone)]
pub struct Cpu {
    pub pc: u16,
    pub regs: RegisterFile,
    pub flags: u8,
    pub int_enabled: bool,
    pub cycles: u32,
    pub state: CpuState,

    pub(crate) ir: u16,
    pub(crate) ir_ext: u16,
    pub(crate) alu_res: u16,
    pub(crate) mem_addr_latch: u16,
    pub(crate) mem_data_latch: u16,
    pub(crate) decoded: Decoded,

    reset_vector: u16,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_reset_vector(DEFAULT_RESET_VECTOR)
    }

    pub fn with_reset_vector(reset_vector: u16) -> Self {
        Self {
            pc: reset_vector,
            regs: RegisterFile::new(),
            flags: 0,
            int_enabled: false,
            cycles: 0,
            state: CpuState::Reset,
            ir: 0,
            ir_ext: 0,
            alu_res: 0,
            mem_addr_latch: 0,
            mem_data_latch: 0,
            decoded: decode(0, 0),
            reset_vector,
        }
    }

    /// Return to the RESET state; the next `tick` re-seeds PC/FLAGS/CYCLES.
    pub fn reset(&mut self) {
        self.state = CpuState::Reset;
        self.regs.reset();
        self.ir = 0;
        self.ir_ext = 0;
        self.alu_res = 0;
        self.mem_addr_latch = 0;
        self.mem_data_latch = 0;
        self.decoded = decode(0, 0);
    }

    pub fn halted(&self) -> bool {
        matches!(self.state, CpuState::Halted)
    }

    pub fn flag(&self, bit: u8) -> bool {
        self.flags & (1 << bit) != 0
    }

    pub fn flag_n(&self) -> bool {
        self.flag(Flag::N)
    }

    pub fn flag_z(&self) -> bool {
        self.flag(Flag::Z)
    }

    pub fn flag_c(&self) -> bool {
        self.flag(Flag::C)
    }

    pub fn flag_v(&self) -> bool {
        self.flag(Flag::V)
    }

    pub(crate) fn set_flag(&mut self, bit: u8, value: bool) {
        if value {
            self.flags |= 1 << bit;
        } else {
            self.flags &= !(1 << bit);
        }
    }

    pub(crate) fn reset_vector(&self) -> u16 {
        self.reset_vector
    }

    pub(crate) fn set_alu_flags(&mut self, flags: crate::alu::AluFlags) {
        self.set_flag(Flag::N, flags.n);
        self.set_flag(Flag::Z, flags.z);
        self.set_flag(Flag::C, flags.c);
        self.set_flag(Flag::V, flags.v);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
