//! The compressed-register instruction set.
//!
//! Most instructions can only name the low registers `r0`..`r7`; a
//! few (the "hi-reg" forms of `add`, `cmp`, `mov` and `bx`) can also
//! name `h0`..`h7`.  Several mnemonics have more than one encoding,
//! and the operands decide which one is used.
use base::prelude::{place, Field, Register};

use super::super::lexer::rx::REGISTER_RANGE;
use super::super::lexer::{shape_of, ungroup, Shape};
use super::super::operand::{parse_immediate, parse_register, FieldResult, RegisterNames};
use super::super::symtab::Resolver;
use super::super::types::{Arity, ErrorKind};
use super::{check_arity, lookup, InstructionSet, OpcodeSpec, PrologueLine};

const IMM3: Field = Field::unsigned(3);
const IMM5: Field = Field::unsigned(5);
const IMM7: Field = Field::unsigned(7);
const IMM8: Field = Field::unsigned(8);
const PC_OFFSET8: Field = Field::signed(8);
const PC_OFFSET11: Field = Field::signed(11);

const ADD_REGISTER: u16 = 0x1800;
const SUB_REGISTER: u16 = 0x1A00;
const ADD_IMM3: u16 = 0x1C00;
const SUB_IMM3: u16 = 0x1E00;
const MOV_IMM8: u16 = 0x2000;
const CMP_IMM8: u16 = 0x2800;
const ADD_IMM8: u16 = 0x3000;
const SUB_IMM8: u16 = 0x3800;
const CMP_ALU: u16 = 0x4280;
const HI_ADD: u16 = 0x4400;
const HI_CMP: u16 = 0x4500;
const HI_MOV: u16 = 0x4600;
const LOAD_ADDRESS_PC: u16 = 0xA000;
const LOAD_ADDRESS_SP: u16 = 0xA800;
const ADJUST_SP: u16 = 0xB000;
const ADJUST_SP_DOWN: u16 = 0xB080;

/// Bit 7 of a hi-reg instruction: the destination is a high register.
const H1: u16 = 1 << 7;
/// Bit 6 of a hi-reg instruction: the source is a high register.
const H2: u16 = 1 << 6;
/// Bit 8 of push/pop: also transfer `lr` (push) or `pc` (pop).
const EXTRA_REGISTER: u16 = 1 << 8;

const MEMORY_OPERAND: &str = "a memory operand such as [r1, #4] or [r1, r2]";
const REGISTER_LIST: &str = "a register list such as {r0, r2-r4}";

/// The encodings available to a load or store.  `immediate` is the
/// `[rb, #imm5]` form, which every load and store has.
#[derive(Debug, Clone, Copy)]
struct MemoryForms {
    register: Option<u16>,
    immediate: u16,
    sp_relative: Option<u16>,
    pc_relative: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    /// `rd, rs, #imm5`, or with two operands the ALU shift whose
    /// bits are given here.
    Shift { alu: u16 },
    Add,
    Sub,
    Mov,
    Cmp,
    /// `rd, rs`
    Alu,
    BranchExchange,
    Memory(MemoryForms),
    /// `push` and `pop`; the register which sets the R bit.
    RegisterList { extra: Register },
    /// `rb!, {rlist}`
    Multiple,
    /// A label or literal displacement in the low bits.
    Branch(Field),
    Swi(Field),
    /// Assembler-only: `rd, label` loads the address of `label`.
    Adr,
    Fixed,
}

const fn op(mnemonic: &'static str, bits: u16, arity: Arity, format: Format) -> OpcodeSpec<Format> {
    OpcodeSpec::new(mnemonic, bits, arity, format)
}

const fn alu(mnemonic: &'static str, number: u16) -> OpcodeSpec<Format> {
    op(mnemonic, 0x4000 | (number << 6), Arity::Exactly(2), Format::Alu)
}

const fn cond(mnemonic: &'static str, condition: u16) -> OpcodeSpec<Format> {
    op(
        mnemonic,
        0xD000 | (condition << 8),
        Arity::Exactly(1),
        Format::Branch(PC_OFFSET8),
    )
}

const fn memory(mnemonic: &'static str, forms: MemoryForms) -> OpcodeSpec<Format> {
    op(mnemonic, 0, Arity::Between(2, 3), Format::Memory(forms))
}

static OPCODES: [OpcodeSpec<Format>; 51] = [
    op("lsl", 0x0000, Arity::Between(2, 3), Format::Shift { alu: 0x4080 }),
    op("lsr", 0x0800, Arity::Between(2, 3), Format::Shift { alu: 0x40C0 }),
    op("asr", 0x1000, Arity::Between(2, 3), Format::Shift { alu: 0x4100 }),
    op("add", 0, Arity::Between(2, 3), Format::Add),
    op("sub", 0, Arity::Between(2, 3), Format::Sub),
    op("mov", 0, Arity::Exactly(2), Format::Mov),
    op("cmp", 0, Arity::Exactly(2), Format::Cmp),
    alu("and", 0),
    alu("eor", 1),
    alu("adc", 5),
    alu("sbc", 6),
    alu("ror", 7),
    alu("tst", 8),
    alu("neg", 9),
    alu("cmn", 11),
    alu("orr", 12),
    alu("mul", 13),
    alu("bic", 14),
    alu("mvn", 15),
    op("bx", 0x4700, Arity::Exactly(1), Format::BranchExchange),
    memory(
        "ldr",
        MemoryForms {
            register: Some(0x5800),
            immediate: 0x6800,
            sp_relative: Some(0x9800),
            pc_relative: Some(0x4800),
        },
    ),
    memory(
        "str",
        MemoryForms {
            register: Some(0x5000),
            immediate: 0x6000,
            sp_relative: Some(0x9000),
            pc_relative: None,
        },
    ),
    memory(
        "ldrb",
        MemoryForms {
            register: Some(0x5C00),
            immediate: 0x7800,
            sp_relative: None,
            pc_relative: None,
        },
    ),
    memory(
        "strb",
        MemoryForms {
            register: Some(0x5400),
            immediate: 0x7000,
            sp_relative: None,
            pc_relative: None,
        },
    ),
    memory(
        "ldrh",
        MemoryForms {
            register: None,
            immediate: 0x8800,
            sp_relative: None,
            pc_relative: None,
        },
    ),
    memory(
        "strh",
        MemoryForms {
            register: None,
            immediate: 0x8000,
            sp_relative: None,
            pc_relative: None,
        },
    ),
    op(
        "push",
        0xB400,
        Arity::Between(1, 9),
        Format::RegisterList {
            extra: Register::LR,
        },
    ),
    op(
        "pop",
        0xBC00,
        Arity::Between(1, 9),
        Format::RegisterList {
            extra: Register::PC,
        },
    ),
    op("stmia", 0xC000, Arity::Between(2, 9), Format::Multiple),
    op("ldmia", 0xC800, Arity::Between(2, 9), Format::Multiple),
    cond("beq", 0),
    cond("bne", 1),
    cond("bcs", 2),
    cond("bhs", 2),
    cond("bcc", 3),
    cond("blo", 3),
    cond("bmi", 4),
    cond("bpl", 5),
    cond("bvs", 6),
    cond("bvc", 7),
    cond("bhi", 8),
    cond("bls", 9),
    cond("bge", 10),
    cond("blt", 11),
    cond("bgt", 12),
    cond("ble", 13),
    op("swi", 0xDF00, Arity::Exactly(1), Format::Swi(IMM8)),
    op("b", 0xE000, Arity::Exactly(1), Format::Branch(PC_OFFSET11)),
    // Only the low half of the two-word long branch with link.
    op("bl", 0xF800, Arity::Exactly(1), Format::Branch(PC_OFFSET11)),
    op("adr", LOAD_ADDRESS_PC, Arity::Exactly(2), Format::Adr),
    // mov h0, h0
    op("nop", 0x46C0, Arity::Exactly(0), Format::Fixed),
];

fn is_register(token: &str) -> bool {
    match shape_of(token) {
        Some(Shape::LowRegister | Shape::HighRegister) => true,
        Some(Shape::Name) => matches!(token, "sp" | "lr" | "pc"),
        _ => false,
    }
}

fn any_register(token: &str) -> FieldResult<Register> {
    parse_register(token, RegisterNames::LowAndHigh)
}

fn low_bits(register: Register, token: &str) -> FieldResult<u16> {
    if register.is_high() {
        Err(ErrorKind::MalformedOperand {
            token: token.to_string(),
            expected: "a low register (r0 to r7)",
        })
    } else {
        Ok(register.bits())
    }
}

fn low(token: &str) -> FieldResult<u16> {
    low_bits(any_register(token)?, token)
}

fn hi_reg(bits: u16, rd: Register, rs: Register) -> u16 {
    let h1 = if rd.is_high() { H1 } else { 0 };
    let h2 = if rs.is_high() { H2 } else { 0 };
    bits | h1 | h2 | place(rs.bits(), 3) | rd.bits()
}

fn unsupported(token: &str) -> ErrorKind {
    ErrorKind::MalformedOperand {
        token: token.to_string(),
        expected: "an addressing form this instruction supports",
    }
}

/// `rd, rs, rn` and `rd, rs, #imm3`.
fn three_operand(register_form: u16, immediate_form: u16, rd: &str, rs: &str, last: &str) -> FieldResult<u16> {
    let operands = place(low(rs)?, 3) | low(rd)?;
    if is_register(last) {
        Ok(register_form | place(low(last)?, 6) | operands)
    } else {
        Ok(immediate_form | place(parse_immediate(last, IMM3)?, 6) | operands)
    }
}

fn encode_add(operands: &[String]) -> FieldResult<u16> {
    match operands {
        [rd, base, imm] if base == "sp" || base == "pc" => {
            let bits = if base == "sp" {
                LOAD_ADDRESS_SP
            } else {
                LOAD_ADDRESS_PC
            };
            Ok(bits | place(low(rd)?, 8) | parse_immediate(imm, IMM8)?)
        }
        [rd, rs, last] => three_operand(ADD_REGISTER, ADD_IMM3, rd, rs, last),
        [rd, rs] if is_register(rs) => {
            let (d, s) = (any_register(rd)?, any_register(rs)?);
            if d.is_high() || s.is_high() {
                Ok(hi_reg(HI_ADD, d, s))
            } else {
                // add rd, rd, rs
                Ok(ADD_REGISTER | place(s.bits(), 6) | place(d.bits(), 3) | d.bits())
            }
        }
        [rd, imm] if rd == "sp" => Ok(ADJUST_SP | parse_immediate(imm, IMM7)?),
        [rd, imm] => Ok(ADD_IMM8 | place(low(rd)?, 8) | parse_immediate(imm, IMM8)?),
        _ => unreachable!("add takes 2 or 3 operands"),
    }
}

fn encode_sub(operands: &[String]) -> FieldResult<u16> {
    match operands {
        [rd, rs, last] => three_operand(SUB_REGISTER, SUB_IMM3, rd, rs, last),
        [rd, imm] if rd == "sp" => Ok(ADJUST_SP_DOWN | parse_immediate(imm, IMM7)?),
        [rd, rs] if is_register(rs) => {
            let d = low(rd)?;
            Ok(SUB_REGISTER | place(low(rs)?, 6) | place(d, 3) | d)
        }
        [rd, imm] => Ok(SUB_IMM8 | place(low(rd)?, 8) | parse_immediate(imm, IMM8)?),
        _ => unreachable!("sub takes 2 or 3 operands"),
    }
}

fn encode_mov(rd: &str, source: &str) -> FieldResult<u16> {
    if is_register(source) {
        let (d, s) = (any_register(rd)?, any_register(source)?);
        if d.is_high() || s.is_high() {
            Ok(hi_reg(HI_MOV, d, s))
        } else {
            // Between low registers this is add rd, rs, #0.
            Ok(ADD_IMM3 | place(s.bits(), 3) | d.bits())
        }
    } else {
        Ok(MOV_IMM8 | place(low(rd)?, 8) | parse_immediate(source, IMM8)?)
    }
}

fn encode_cmp(rd: &str, source: &str) -> FieldResult<u16> {
    if is_register(source) {
        let (d, s) = (any_register(rd)?, any_register(source)?);
        if d.is_high() || s.is_high() {
            Ok(hi_reg(HI_CMP, d, s))
        } else {
            Ok(CMP_ALU | place(s.bits(), 3) | d.bits())
        }
    } else {
        Ok(CMP_IMM8 | place(low(rd)?, 8) | parse_immediate(source, IMM8)?)
    }
}

fn encode_memory(
    forms: MemoryForms,
    operands: &[String],
    pc: usize,
    resolver: &mut Resolver<'_>,
) -> FieldResult<u16> {
    let (rd, rest) = match operands.split_first() {
        Some((rd, rest)) => (low(rd)?, rest),
        None => unreachable!("loads and stores take 2 or 3 operands"),
    };
    if let [target] = rest {
        if !target.starts_with('[') {
            let bits = forms.pc_relative.ok_or_else(|| unsupported(target))?;
            return Ok(bits | place(rd, 8) | resolver.displacement(target, pc, PC_OFFSET8)?);
        }
    }
    let malformed = || ErrorKind::MalformedOperand {
        token: rest.join(", "),
        expected: MEMORY_OPERAND,
    };
    let inner = ungroup(rest, '[', ']').ok_or_else(malformed)?;
    let (base_token, offset) = match inner.as_slice() {
        [base] => (base.as_str(), "#0"),
        [base, offset] => (base.as_str(), offset.as_str()),
        _ => return Err(malformed()),
    };
    let base = any_register(base_token)?;
    if base == Register::SP {
        let bits = forms.sp_relative.ok_or_else(|| unsupported(base_token))?;
        Ok(bits | place(rd, 8) | parse_immediate(offset, IMM8)?)
    } else if base == Register::PC {
        let bits = forms.pc_relative.ok_or_else(|| unsupported(base_token))?;
        Ok(bits | place(rd, 8) | resolver.displacement(offset, pc, PC_OFFSET8)?)
    } else if is_register(offset) {
        let bits = forms.register.ok_or_else(|| unsupported(offset))?;
        Ok(bits | place(low(offset)?, 6) | place(low_bits(base, base_token)?, 3) | rd)
    } else {
        Ok(forms.immediate
            | place(parse_immediate(offset, IMM5)?, 6)
            | place(low_bits(base, base_token)?, 3)
            | rd)
    }
}

/// The bit mask for the entries of a register list such as
/// `{r0, r2-r4, lr}`, plus [`EXTRA_REGISTER`] if `extra` appears.
fn register_list(tokens: &[String], extra: Option<Register>) -> FieldResult<u16> {
    let malformed = || ErrorKind::MalformedOperand {
        token: tokens.join(", "),
        expected: REGISTER_LIST,
    };
    let entries = ungroup(tokens, '{', '}').ok_or_else(malformed)?;
    if entries.is_empty() {
        return Err(malformed());
    }
    let mut mask: u16 = 0;
    for entry in &entries {
        if let Some(caps) = REGISTER_RANGE.captures(entry) {
            let number = |m: Option<regex::Match<'_>>| -> Option<u8> { m?.as_str().parse().ok() };
            let first = number(caps.name("first"));
            let last = caps.name("last").map_or(first, |m| number(Some(m)));
            match (first, last) {
                (Some(first), Some(last)) if first <= last && last < Register::COUNT => {
                    for n in first..=last {
                        mask |= 1 << n;
                    }
                }
                _ => return Err(ErrorKind::MalformedRegister(entry.clone())),
            }
        } else {
            match (any_register(entry)?, extra) {
                (r, Some(extra)) if r == extra => mask |= EXTRA_REGISTER,
                _ => return Err(ErrorKind::MalformedRegister(entry.clone())),
            }
        }
    }
    Ok(mask)
}

#[derive(Debug, Default)]
pub(crate) struct Compact;

impl InstructionSet for Compact {
    fn register_names(&self) -> RegisterNames {
        RegisterNames::LowAndHigh
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
        match (spec.format, operands) {
            (Format::Shift { .. }, [rd, rs, imm]) => Ok(spec.bits
                | place(parse_immediate(imm, IMM5)?, 6)
                | place(low(rs)?, 3)
                | low(rd)?),
            (Format::Shift { alu }, [rd, rs]) => Ok(alu | place(low(rs)?, 3) | low(rd)?),
            (Format::Alu, [rd, rs]) => Ok(spec.bits | place(low(rs)?, 3) | low(rd)?),
            (Format::Add, _) => encode_add(operands),
            (Format::Sub, _) => encode_sub(operands),
            (Format::Mov, [rd, source]) => encode_mov(rd, source),
            (Format::Cmp, [rd, source]) => encode_cmp(rd, source),
            (Format::BranchExchange, [rs]) => {
                let rs = any_register(rs)?;
                let h2 = if rs.is_high() { H2 } else { 0 };
                Ok(spec.bits | h2 | place(rs.bits(), 3))
            }
            (Format::Memory(forms), _) => encode_memory(forms, operands, pc, resolver),
            (Format::RegisterList { extra }, _) => Ok(spec.bits | register_list(operands, Some(extra))?),
            (Format::Multiple, [base, list @ ..]) => {
                let base_register = base.strip_suffix('!').ok_or_else(|| ErrorKind::MalformedOperand {
                    token: base.clone(),
                    expected: "a base register with write-back, such as r0!",
                })?;
                Ok(spec.bits | place(low(base_register)?, 8) | register_list(list, None)?)
            }
            (Format::Branch(field), [target]) => Ok(spec.bits | resolver.displacement(target, pc, field)?),
            (Format::Swi(field), [number]) => Ok(spec.bits | parse_immediate(number, field)?),
            (Format::Adr, [rd, target]) => {
                Ok(spec.bits | place(low(rd)?, 8) | resolver.displacement(target, pc, PC_OFFSET8)?)
            }
            (Format::Fixed, []) => Ok(spec.bits),
            (format, _) => unreachable!("operand count for {mnemonic} ({format:?}) was checked"),
        }
    }

    fn has_sections(&self) -> bool {
        true
    }

    fn prologue(&self) -> &'static [PrologueLine] {
        &[
            PrologueLine::Text,
            PrologueLine::GlobalEntry,
            PrologueLine::EntryLabel,
        ]
    }
}
