//! The fetch/decode/execute/memory/writeback engine
//!
//! One `tick` is one clock edge: it consumes the current [`Cpu`] state plus
//! whatever the memory and I/O buses report, and produces the next state.
//! Nothing here is recursive or multi-cycle from the caller's point of
//! view — a caller wanting a whole instruction retired calls [`Cpu::step`]
//! in a loop until back at FETCH (see `cpu::harness`).

use crate::alu::{self, AluOp};
use crate::cpu::state::{Cpu, CpuState};
use crate::decode::{branch_taken, decode, InstType};
use crate::io::IoBus;
use crate::memory::{byte_enable, MemoryBus};
use crate::opcodes::ExtendedFunc;
use crate::shifter;

impl Cpu {
    /// Advance the engine by exactly one clock edge.
    pub fn tick(&mut self, mem: &mut dyn MemoryBus, io: &mut dyn IoBus) {
        match self.state {
            CpuState::Reset => {
                self.pc = self.reset_vector();
                self.flags = 0;
                self.int_enabled = false;
                self.cycles = 0;
                self.state = CpuState::Fetch;
            }
            CpuState::Fetch => {
                // §5: holds FETCH for as long as the bus reports not ready.
                if mem.ready() {
                    self.ir = mem.read(self.pc);
                    self.state = CpuState::Decode;
                }
            }
            CpuState::Decode => {
                let d = decode(self.ir, 0);
                self.state = if d.is_extended {
                    CpuState::FetchExt
                } else {
                    CpuState::Execute
                };
            }
            CpuState::FetchExt => {
                if mem.ready() {
                    self.ir_ext = mem.read(self.pc.wrapping_add(2));
                    self.state = CpuState::Execute;
                }
            }
            CpuState::Execute => self.execute(io),
            CpuState::Memory => self.run_memory(mem),
            CpuState::Writeback => self.writeback(),
            CpuState::Halted => {}
        }
    }

    /// Run `tick` until the next instruction boundary (back at FETCH) or
    /// until HALTED. Returns the number of clock edges consumed. A no-op
    /// (returns 0) if already halted. The RESET→FETCH edge, if pending,
    /// does not itself count as retiring an instruction.
    pub fn step(&mut self, mem: &mut dyn MemoryBus, io: &mut dyn IoBus) -> u32 {
        if self.halted() {
            return 0;
        }
        let mut ticks = 0u32;
        if matches!(self.state, CpuState::Reset) {
            self.tick(mem, io);
            ticks += 1;
        }
        loop {
            self.tick(mem, io);
            ticks += 1;
            if matches!(self.state, CpuState::Fetch | CpuState::Halted) {
                break;
            }
        }
        ticks
    }

    fn execute(&mut self, io: &mut dyn IoBus) {
        let d = decode(self.ir, self.ir_ext);
        self.decoded = d;

        let old_pc = self.pc;
        self.pc = if d.is_extended {
            old_pc.wrapping_add(4)
        } else {
            old_pc.wrapping_add(2)
        };

        let rs1 = self.regs.read(d.rs1);
        let rs2 = self.regs.read(d.rs2);

        match d.inst_type {
            InstType::AluReg | InstType::MulDiv => {
                let (res, flags) = alu::eval(rs1, rs2, d.alu_op, 0);
                self.alu_res = res;
                self.set_alu_flags(flags);
                self.state = CpuState::Writeback;
            }
            InstType::AluImm => {
                // rs1 read port is re-steered to rd: ADDI reads rd as its
                // left operand for a read-modify-write add.
                let a = self.regs.read(d.rd);
                let b = if d.is_lui {
                    (d.imm8_raw as u16) << 8
                } else {
                    d.imm8 as u16
                };
                let (res, flags) = alu::eval(a, b, d.alu_op, 0);
                self.alu_res = res;
                self.set_alu_flags(flags);
                self.state = CpuState::Writeback;
            }
            InstType::Load => {
                self.mem_addr_latch = rs1;
                self.state = CpuState::Memory;
            }
            InstType::Store => {
                self.mem_addr_latch = rs1;
                self.mem_data_latch = self.regs.read(d.rd);
                self.state = CpuState::Memory;
            }
            InstType::Branch => {
                if branch_taken(d.branch_cond, self.flag_n(), self.flag_z(), self.flag_c(), self.flag_v())
                {
                    let target = old_pc.wrapping_add(((d.offset8 as i32) << 1) as u16);
                    log::trace!("branch taken at {old_pc:#06x} -> {target:#06x}");
                    self.pc = target;
                }
                self.state = CpuState::Fetch;
            }
            InstType::Jump => {
                self.pc = old_pc.wrapping_add(((d.offset12 as i32) << 1) as u16);
                self.state = CpuState::Fetch;
            }
            InstType::JumpReg => {
                self.pc = rs1;
                if d.is_call {
                    self.alu_res = old_pc.wrapping_add(2);
                    self.state = CpuState::Writeback;
                } else {
                    self.state = CpuState::Fetch;
                }
            }
            InstType::Shift => {
                let sr = shifter::eval(rs1, d.shift_func, self.flag_c());
                self.alu_res = sr.value;
                self.set_flag(crate::opcodes::Flag::C, sr.carry_out);
                self.set_flag(crate::opcodes::Flag::N, sr.value & 0x8000 != 0);
                self.set_flag(crate::opcodes::Flag::Z, sr.value == 0);
                self.state = CpuState::Writeback;
            }
            InstType::Misc => {
                if d.is_exx {
                    self.regs.exx();
                    self.state = CpuState::Fetch;
                } else if d.is_cmp || d.is_test {
                    let (_, flags) = alu::eval(rs1, rs2, d.alu_op, 0);
                    self.set_alu_flags(flags);
                    self.state = CpuState::Fetch;
                } else if d.is_mov {
                    self.alu_res = rs1;
                    self.state = CpuState::Writeback;
                } else if d.is_getf {
                    self.alu_res = self.flags as u16;
                    self.state = CpuState::Writeback;
                } else if d.is_setf {
                    self.flags = (rs1 & 0xFF) as u8;
                    self.state = CpuState::Fetch;
                } else {
                    // PUSH/POP and the LDI/LDD/... block-transfer slots are
                    // decoded but not sequenced; they act as NOPs.
                    self.state = CpuState::Fetch;
                }
            }
            InstType::Io => {
                if d.is_io_in {
                    let port = if d.io_port_imm { d.rs1 } else { (rs1 & 0xFF) as u8 };
                    self.alu_res = io.read(port) as u16;
                    self.state = CpuState::Writeback;
                } else if d.is_io_out {
                    let port = if d.io_port_imm { d.rs1 } else { (rs1 & 0xFF) as u8 };
                    let data = (self.regs.read(d.rd) & 0xFF) as u8;
                    io.write(port, data);
                    self.state = CpuState::Fetch;
                } else {
                    self.state = CpuState::Fetch;
                }
            }
            InstType::System => {
                if d.is_halt {
                    log::debug!("HALT at pc={old_pc:#06x}, cycles={}", self.cycles);
                    self.state = CpuState::Halted;
                } else if d.is_ei {
                    log::debug!("EI at pc={old_pc:#06x}");
                    self.int_enabled = true;
                    self.state = CpuState::Fetch;
                } else if d.is_di {
                    log::debug!("DI at pc={old_pc:#06x}");
                    self.int_enabled = false;
                    self.state = CpuState::Fetch;
                } else {
                    // NOP, RETI, SWI, SCF, CCF: recognized, no architectural effect.
                    self.state = CpuState::Fetch;
                }
            }
            InstType::Extended => self.execute_extended(&d, io),
            InstType::Invalid => {
                // Unreachable: every opcode value is explicitly cased.
                // Unknown opcodes act as NOP per the error-handling contract.
                self.state = CpuState::Fetch;
            }
        }

        self.cycles = self.cycles.wrapping_add(1);
    }

    fn execute_extended(&mut self, d: &crate::decode::Decoded, io: &mut dyn IoBus) {
        let rs1 = self.regs.read(d.rs1);
        let old_pc = self.pc.wrapping_sub(4);

        match d.func {
            ExtendedFunc::ADDIX
            | ExtendedFunc::SUBIX
            | ExtendedFunc::ANDIX
            | ExtendedFunc::ORIX
            | ExtendedFunc::XORIX => {
                let (res, flags) = alu::eval(rs1, self.ir_ext, d.alu_op, 0);
                self.alu_res = res;
                self.set_alu_flags(flags);
                self.state = CpuState::Writeback;
            }
            ExtendedFunc::LWX => {
                self.mem_addr_latch = rs1.wrapping_add(self.ir_ext);
                self.state = CpuState::Memory;
            }
            ExtendedFunc::SWX => {
                self.mem_addr_latch = rs1.wrapping_add(self.ir_ext);
                self.mem_data_latch = self.regs.read(d.rd);
                self.state = CpuState::Memory;
            }
            ExtendedFunc::LIX => {
                self.alu_res = self.ir_ext;
                self.state = CpuState::Writeback;
            }
            ExtendedFunc::JX => {
                self.pc = self.ir_ext;
                self.state = CpuState::Fetch;
            }
            ExtendedFunc::JALX => {
                self.pc = self.ir_ext;
                self.alu_res = old_pc.wrapping_add(4);
                self.state = CpuState::Writeback;
            }
            ExtendedFunc::CMPIX => {
                let (_, flags) = alu::eval(rs1, self.ir_ext, AluOp::Sub, 0);
                self.set_alu_flags(flags);
                self.state = CpuState::Fetch;
            }
            ExtendedFunc::INX => {
                let port = (self.ir_ext & 0xFF) as u8;
                self.alu_res = io.read(port) as u16;
                self.state = CpuState::Writeback;
            }
            ExtendedFunc::OUTX => {
                let port = (self.ir_ext & 0xFF) as u8;
                let data = (rs1 & 0xFF) as u8;
                io.write(port, data);
                self.state = CpuState::Fetch;
            }
            // SLLX/SRLX/SRAX and the DAA-equivalent slot: reserved, unreachable
            // from the documented mnemonics. Decoder falls back to an ALU add.
            _ => {
                let (res, flags) = alu::eval(rs1, self.ir_ext, AluOp::Add, 0);
                self.alu_res = res;
                self.set_alu_flags(flags);
                self.state = CpuState::Writeback;
            }
        }
    }

    fn run_memory(&mut self, mem: &mut dyn MemoryBus) {
        // §5: MEMORY holds until the bus asserts ready; a hung bus leaves
        // the CPU here indefinitely, with no timeout.
        if !mem.ready() {
            return;
        }
        let d = self.decoded;
        if d.mem_store {
            let (wdata, be) = if d.mem_byte {
                if self.mem_addr_latch & 1 != 0 {
                    (self.mem_data_latch << 8, byte_enable::HIGH)
                } else {
                    (self.mem_data_latch, byte_enable::LOW)
                }
            } else {
                (self.mem_data_latch, byte_enable::WORD)
            };
            mem.write(self.mem_addr_latch, wdata, be);
            self.state = CpuState::Fetch;
        } else {
            let rdata = mem.read(self.mem_addr_latch);
            self.alu_res = if d.mem_byte {
                let byte = if self.mem_addr_latch & 1 != 0 {
                    (rdata >> 8) as u8
                } else {
                    (rdata & 0xFF) as u8
                };
                if d.mem_signed {
                    byte as i8 as i16 as u16
                } else {
                    byte as u16
                }
            } else {
                rdata
            };
            self.state = CpuState::Writeback;
        }
    }

    fn writeback(&mut self) {
        let d = self.decoded;
        if d.reg_write {
            self.regs.write(d.rd, self.alu_res);
        }
        self.state = CpuState::Fetch;
    }
}
