//! The baseline instruction set: eight general registers, a 4-bit
//! opcode in the top of each word.
use base::prelude::{place, Field};

use super::super::lexer::{shape_of, Shape};
use super::super::operand::{parse_immediate, parse_register, FieldResult, RegisterNames};
use super::super::symtab::Resolver;
use super::super::types::{Arity, ErrorKind};
use super::{check_arity, lookup, InstructionSet, OpcodeSpec};

const IMM5: Field = Field::signed(5);
const OFFSET6: Field = Field::signed(6);
const PC_OFFSET9: Field = Field::signed(9);
const PC_OFFSET11: Field = Field::signed(11);
const TRAP_VECTOR: Field = Field::unsigned(8);

/// Flag selecting the immediate form of `add` and `and`.
const IMMEDIATE_FLAG: u16 = 1 << 5;

#[derive(Debug, Clone, Copy)]
enum Format {
    /// `rd, rs1, rs2` or `rd, rs1, #imm5`
    Operate,
    /// `rd, rs`
    Not,
    /// A label or offset relative to the next instruction.
    PcRelative(Field),
    /// `rd, label`
    RegisterPcRelative(Field),
    /// `rd, base, #offset6`
    BaseOffset(Field),
    /// A single base register in bits 8..6.
    BaseRegister,
    Trap(Field),
    /// No operands.
    Fixed,
}

const fn op(mnemonic: &'static str, bits: u16, operands: usize, format: Format) -> OpcodeSpec<Format> {
    OpcodeSpec::new(mnemonic, bits, Arity::Exactly(operands), format)
}

static OPCODES: [OpcodeSpec<Format>; 30] = [
    op("add", 0x1000, 3, Format::Operate),
    op("and", 0x5000, 3, Format::Operate),
    op("not", 0x903F, 2, Format::Not),
    // Branches; bits 11..9 are the n, z and p condition flags.
    op("br", 0x0E00, 1, Format::PcRelative(PC_OFFSET9)),
    op("brn", 0x0800, 1, Format::PcRelative(PC_OFFSET9)),
    op("brz", 0x0400, 1, Format::PcRelative(PC_OFFSET9)),
    op("brp", 0x0200, 1, Format::PcRelative(PC_OFFSET9)),
    op("brnz", 0x0C00, 1, Format::PcRelative(PC_OFFSET9)),
    op("brnp", 0x0A00, 1, Format::PcRelative(PC_OFFSET9)),
    op("brzp", 0x0600, 1, Format::PcRelative(PC_OFFSET9)),
    op("brnzp", 0x0E00, 1, Format::PcRelative(PC_OFFSET9)),
    op("jmp", 0xC000, 1, Format::BaseRegister),
    op("ret", 0xC1C0, 0, Format::Fixed),
    op("jsr", 0x4800, 1, Format::PcRelative(PC_OFFSET11)),
    op("jsrr", 0x4000, 1, Format::BaseRegister),
    op("ld", 0x2000, 2, Format::RegisterPcRelative(PC_OFFSET9)),
    op("ldi", 0xA000, 2, Format::RegisterPcRelative(PC_OFFSET9)),
    op("lea", 0xE000, 2, Format::RegisterPcRelative(PC_OFFSET9)),
    op("st", 0x3000, 2, Format::RegisterPcRelative(PC_OFFSET9)),
    op("sti", 0xB000, 2, Format::RegisterPcRelative(PC_OFFSET9)),
    op("ldr", 0x6000, 3, Format::BaseOffset(OFFSET6)),
    op("str", 0x7000, 3, Format::BaseOffset(OFFSET6)),
    op("trap", 0xF000, 1, Format::Trap(TRAP_VECTOR)),
    op("rti", 0x8000, 0, Format::Fixed),
    // Trap aliases.
    op("getc", 0xF020, 0, Format::Fixed),
    op("out", 0xF021, 0, Format::Fixed),
    op("puts", 0xF022, 0, Format::Fixed),
    op("in", 0xF023, 0, Format::Fixed),
    op("putsp", 0xF024, 0, Format::Fixed),
    op("halt", 0xF025, 0, Format::Fixed),
];

fn register(token: &str) -> FieldResult<u16> {
    parse_register(token, RegisterNames::LowOnly).map(|r| r.bits())
}

#[derive(Debug, Default)]
pub(crate) struct Baseline;

impl InstructionSet for Baseline {
    fn register_names(&self) -> RegisterNames {
        RegisterNames::LowOnly
    }

    fn is_mnemonic(&self, name: &str) -> bool {
        lookup(&OPCODES, name).is_some()
    }

    fn encode(
        &self,
        mnemonic: &str,
        operands: &[String],
        pc: usize,
        resolver: &mut Resolver<'_>,
    ) -> FieldResult<u16> {
        let spec = lookup(&OPCODES, mnemonic)
            .ok_or_else(|| ErrorKind::UnknownMnemonic(mnemonic.to_string()))?;
        check_arity(mnemonic, spec.arity, operands)?;
        let operand_bits = match (spec.format, operands) {
            (Format::Operate, [rd, rs1, last]) => {
                let last = if shape_of(last) == Some(Shape::LowRegister) {
                    register(last)?
                } else {
                    IMMEDIATE_FLAG | parse_immediate(last, IMM5)?
                };
                place(register(rd)?, 9) | place(register(rs1)?, 6) | last
            }
            (Format::Not, [rd, rs]) => place(register(rd)?, 9) | place(register(rs)?, 6),
            (Format::PcRelative(field), [target]) => resolver.displacement(target, pc, field)?,
            (Format::RegisterPcRelative(field), [r, target]) => {
                place(register(r)?, 9) | resolver.displacement(target, pc, field)?
            }
            (Format::BaseOffset(field), [r, base, offset]) => {
                place(register(r)?, 9) | place(register(base)?, 6) | parse_immediate(offset, field)?
            }
            (Format::BaseRegister, [base]) => place(register(base)?, 6),
            (Format::Trap(field), [vector]) => parse_immediate(vector, field)?,
            (Format::Fixed, []) => 0,
            (format, _) => unreachable!("operand count for {mnemonic} ({format:?}) was checked"),
        };
        Ok(spec.bits | operand_bits)
    }
}
