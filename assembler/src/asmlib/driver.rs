//! The two-pass assembly algorithm.
//!
//! The first pass scans the source one line at a time, binding labels
//! and assembling each statement as soon as it is seen.  Statements
//! which refer to labels defined later are assembled with placeholder
//! values and recorded as fixups.  The second pass assembles each
//! fixup again, now that every label is known, and patches the
//! memory image.  Finally every cell of the image is checked and the
//! binary is emitted.
//!
//! The scan does not stop at the first error; everything wrong with
//! the program is reported in one run.  Only a few problems (listed
//! by [`ErrorKind::aborts_scan`]) stop the scan early.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use tracing::{event, span, Level};

use base::prelude::Address;

use super::ast::Statement;
use super::binary::Binary;
use super::diagnostics::{render, Diagnostic, Diagnostics};
use super::directive::{data_length, encode_data, parse_origin, Directive, DIRECTIVE_PREFIX};
use super::lexer::tokenize;
use super::listing::Listing;
use super::memorymap::{Cell, MemoryImage};
use super::operand::{looks_numeric, FieldResult};
use super::profile::{check_arity, InstructionSet, PrologueLine, Profile};
use super::source::{self, normalize, SourceLine};
use super::symtab::{FinalSymbolTable, Fixup, FixupLedger, Pass, Resolver, SymbolTable};
use super::types::{AssemblerFailure, ErrorKind, IoAction, IoFailed};

mod output;
#[cfg(test)]
mod tests;

/// Whether the program being assembled is the user's program or
/// supporting code (such as an operating system image) which will
/// be loaded alongside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Primary,
    Library,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub profile: Profile,
    pub role: Role,
}

/// What to produce besides the object file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    // TODO: allow the listing to be written to a file.
    pub list: bool,
    pub symbols: Option<PathBuf>,
    pub hex: Option<PathBuf>,
}

/// The result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    binary: Binary,
    source_lines: BTreeMap<Address, String>,
    symbols: FinalSymbolTable,
    warnings: Vec<Diagnostic>,
}

impl Assembly {
    #[must_use]
    pub fn binary(&self) -> &Binary {
        &self.binary
    }

    /// The source line of each instruction word, by address.
    #[must_use]
    pub fn source_lines(&self) -> &BTreeMap<Address, String> {
        &self.source_lines
    }

    #[must_use]
    pub fn symbols(&self) -> &FinalSymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    #[must_use]
    pub fn listing(&self) -> Listing {
        Listing::new(&self.binary, &self.source_lines, self.symbols.clone())
    }
}

/// The result of an assembly which found errors.  No usable binary
/// is produced, but when the scan got past `.orig` the image (with
/// zeroes in place of anything which could not be assembled) is
/// available to callers which only want to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAssembly {
    diagnostics: Vec<Diagnostic>,
    image: Option<Binary>,
}

impl FailedAssembly {
    /// Every error and warning, in the order they were found.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn image(&self) -> Option<&Binary> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Display for FailedAssembly {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let errors = self.diagnostics.iter().filter(|d| d.is_error()).count();
        write!(f, "assembly failed with {errors} error(s)")
    }
}

impl Error for FailedAssembly {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitOrigin,
    /// Waiting for the given line of the prologue.
    Prologue(usize),
    Scanning,
}

/// The state of one assembly run.
struct Run {
    isa: &'static dyn InstructionSet,
    role: Role,
    diagnostics: Diagnostics,
    symbols: SymbolTable,
    fixups: FixupLedger,
    image: MemoryImage,
    origin: Option<Address>,
    /// `None` until the first section directive; instructions are
    /// allowed but data is not.
    section: Option<Section>,
    ended: bool,
}

fn is_label(isa: &dyn InstructionSet, token: &str) -> bool {
    !token.starts_with(DIRECTIVE_PREFIX) && !isa.is_mnemonic(token)
}

impl Run {
    fn new(options: &AssemblyOptions) -> Run {
        Run {
            isa: options.profile.instruction_set(),
            role: options.role,
            diagnostics: Diagnostics::default(),
            symbols: SymbolTable::default(),
            fixups: FixupLedger::default(),
            image: MemoryImage::default(),
            origin: None,
            section: None,
            ended: false,
        }
    }

    fn origin(&self) -> Address {
        self.origin.unwrap_or(Address::ZERO)
    }

    /// Record a problem with `line`, stopping the scan if the problem
    /// is severe.
    fn fail(&mut self, line: &SourceLine<'_>, kind: ErrorKind) -> ControlFlow<()> {
        let stop = kind.aborts_scan();
        self.diagnostics.error_at(line, kind);
        if stop {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn scan(&mut self, lines: &[SourceLine<'_>]) {
        let prologue: &[PrologueLine] = match self.role {
            Role::Primary => self.isa.prologue(),
            Role::Library => &[],
        };
        let mut stage = Stage::AwaitOrigin;
        for line in lines {
            let normalized = normalize(line.text);
            if normalized.is_empty() {
                continue;
            }
            let tokens = tokenize(&normalized);
            let flow = match stage {
                Stage::AwaitOrigin => match first_line(&tokens) {
                    Ok(start) => {
                        event!(Level::DEBUG, "program starts at {start}");
                        self.origin = Some(start);
                        stage = if prologue.is_empty() {
                            Stage::Scanning
                        } else {
                            Stage::Prologue(0)
                        };
                        ControlFlow::Continue(())
                    }
                    Err(kind) => {
                        self.diagnostics.error_at(line, kind);
                        ControlFlow::Break(())
                    }
                },
                Stage::Prologue(n) => {
                    let expected = prologue[n];
                    if expected.matches(&normalized, &tokens) {
                        stage = if n + 1 == prologue.len() {
                            Stage::Scanning
                        } else {
                            Stage::Prologue(n + 1)
                        };
                        self.statement(line, tokens)
                    } else {
                        self.fail(
                            line,
                            ErrorKind::MissingPrologue {
                                expected: expected.expected(),
                            },
                        )
                    }
                }
                Stage::Scanning => self.statement(line, tokens),
            };
            if flow.is_break() {
                return;
            }
        }
        match stage {
            Stage::AwaitOrigin => self.diagnostics.error(ErrorKind::EmptySource),
            Stage::Prologue(n) => self.diagnostics.error(ErrorKind::MissingPrologue {
                expected: prologue[n].expected(),
            }),
            Stage::Scanning if !self.ended => self.diagnostics.warning(ErrorKind::MissingEnd),
            Stage::Scanning => (),
        }
    }

    fn statement(&mut self, line: &SourceLine<'_>, mut tokens: Vec<String>) -> ControlFlow<()> {
        let Some(first) = tokens.first() else {
            // Nothing but punctuation.
            return ControlFlow::Continue(());
        };
        if is_label(self.isa, first) {
            if let Some(next) = tokens.get(1) {
                if is_label(self.isa, next) && self.is_operand(next) {
                    // A misspelled mnemonic followed by its operands.
                    let mnemonic = tokens.remove(0);
                    return self.instruction(line, mnemonic, tokens);
                }
            }
            let label = tokens.remove(0);
            if let Err(kind) = self.bind_label(&label, line) {
                self.diagnostics.error_at(line, kind);
            }
            if tokens.is_empty() {
                return ControlFlow::Continue(());
            }
        }
        let name = tokens.remove(0);
        let operands = tokens;
        if name.starts_with(DIRECTIVE_PREFIX) {
            match Directive::from_name(&name).filter(|d| !d.needs_sections() || self.isa.has_sections()) {
                Some(directive) => self.directive(line, directive, operands),
                None => self.fail(line, ErrorKind::UnknownMnemonic(name)),
            }
        } else {
            self.instruction(line, name, operands)
        }
    }

    /// True for a token which can only be an operand, never a label
    /// or a mnemonic.
    fn is_operand(&self, token: &str) -> bool {
        self.isa.is_register_name(token) || looks_numeric(token)
    }

    fn bind_label(&mut self, name: &str, line: &SourceLine<'_>) -> Result<(), ErrorKind> {
        if !SymbolTable::is_valid_name(name) || self.isa.is_register_name(name) {
            return Err(ErrorKind::InvalidSymbol(name.to_string()));
        }
        self.symbols.define(name, self.image.len(), line.number)
    }

    fn instruction(
        &mut self,
        line: &SourceLine<'_>,
        mnemonic: String,
        operands: Vec<String>,
    ) -> ControlFlow<()> {
        if self.section == Some(Section::Data) {
            return self.fail(line, ErrorKind::InstructionInDataSection(mnemonic));
        }
        let pc = self.image.len();
        let result = {
            let mut resolver = Resolver::new(&self.symbols, self.origin(), Pass::First);
            self.isa
                .encode(&mnemonic, &operands, pc, &mut resolver)
                .map(|word| (word, resolver.deferred()))
        };
        match result {
            Ok((word, deferred)) => {
                self.image.push_instruction(Cell::Word(u32::from(word)), line.number);
                if deferred {
                    self.fixups.record(Fixup {
                        line: line.number,
                        offset: pc,
                        length: 1,
                        statement: Statement::Instruction { mnemonic, operands },
                    });
                }
                ControlFlow::Continue(())
            }
            Err(kind) => {
                self.image.push_instruction(Cell::Invalid, line.number);
                self.fail(line, kind)
            }
        }
    }

    fn directive(
        &mut self,
        line: &SourceLine<'_>,
        directive: Directive,
        operands: Vec<String>,
    ) -> ControlFlow<()> {
        if let Err(kind) = check_arity(directive.name(), directive.arity(), &operands) {
            return self.fail(line, kind);
        }
        match directive {
            Directive::Orig => self.fail(line, ErrorKind::DuplicateOrigin),
            Directive::End => {
                self.ended = true;
                ControlFlow::Break(())
            }
            Directive::Text => self.enter_section(line, directive, Section::Text),
            Directive::Data => self.enter_section(line, directive, Section::Data),
            Directive::Global => match operands.first() {
                Some(symbol) if SymbolTable::is_valid_name(symbol) => ControlFlow::Continue(()),
                Some(symbol) => self.fail(line, ErrorKind::InvalidSymbol(symbol.clone())),
                None => unreachable!(".global operand count was checked"),
            },
            Directive::Fill | Directive::Blkw | Directive::Stringz => {
                self.data(line, directive, operands)
            }
        }
    }

    fn enter_section(
        &mut self,
        line: &SourceLine<'_>,
        directive: Directive,
        section: Section,
    ) -> ControlFlow<()> {
        match (self.section, section) {
            (None, _) | (Some(Section::Text), Section::Data) => {
                self.section = Some(section);
                ControlFlow::Continue(())
            }
            _ => self.fail(line, ErrorKind::SectionOrder(directive.name().to_string())),
        }
    }

    fn data(
        &mut self,
        line: &SourceLine<'_>,
        directive: Directive,
        operands: Vec<String>,
    ) -> ControlFlow<()> {
        if self.isa.has_sections() && self.section != Some(Section::Data) {
            return self.fail(line, ErrorKind::DataInTextSection(directive.name().to_string()));
        }
        let offset = self.image.len();
        let result = {
            let mut resolver = Resolver::new(&self.symbols, self.origin(), Pass::First);
            encode_data(directive, &operands, &mut resolver).map(|words| (words, resolver.deferred()))
        };
        match result {
            Ok((words, deferred)) => {
                self.image.push_data(&words, line.number);
                if deferred {
                    self.fixups.record(Fixup {
                        line: line.number,
                        offset,
                        length: words.len(),
                        statement: Statement::Directive {
                            directive,
                            operands,
                        },
                    });
                }
                ControlFlow::Continue(())
            }
            Err(kind) => {
                if let Some(count) = data_length(directive, &operands) {
                    self.image.push_invalid_data(count, line.number);
                }
                self.fail(line, kind)
            }
        }
    }

    fn reassemble(&self, fixup: &Fixup) -> FieldResult<Vec<u32>> {
        let mut resolver = Resolver::new(&self.symbols, self.origin(), Pass::Second);
        match &fixup.statement {
            Statement::Instruction { mnemonic, operands } => self
                .isa
                .encode(mnemonic, operands, fixup.offset, &mut resolver)
                .map(|word| vec![u32::from(word)]),
            Statement::Directive {
                directive,
                operands,
            } => encode_data(*directive, operands, &mut resolver),
        }
    }

    fn resolve_fixups(&mut self, lines: &[SourceLine<'_>]) {
        let span = span!(Level::DEBUG, "fixups", count = self.fixups.len());
        let _enter = span.enter();
        for fixup in std::mem::take(&mut self.fixups) {
            let result = self.reassemble(&fixup);
            match (result, lines.get(fixup.line)) {
                (Ok(words), _) => {
                    event!(
                        Level::DEBUG,
                        "patching {} word(s) at offset {} for '{}'",
                        words.len(),
                        fixup.offset,
                        fixup.statement
                    );
                    self.image.patch(fixup.offset, &words);
                }
                (Err(kind), Some(line)) => {
                    self.diagnostics.error_at(line, kind);
                    self.image.invalidate(fixup.offset, fixup.length);
                }
                (Err(_), None) => {
                    match self.origin().checked_offset(fixup.offset) {
                        Some(address) => self
                            .diagnostics
                            .error_at_address(address, ErrorKind::MissingLineInfo),
                        None => self.diagnostics.error(ErrorKind::MissingLineInfo),
                    }
                    self.image.invalidate(fixup.offset, fixup.length);
                }
            }
        }
    }

    /// Check every cell and build the binary.
    fn emit(mut self, lines: &[SourceLine<'_>]) -> Result<Assembly, FailedAssembly> {
        let Some(origin) = self.origin else {
            return Err(FailedAssembly {
                diagnostics: self.diagnostics.into_vec(),
                image: None,
            });
        };
        let length = self.image.len();
        if length > 0 && origin.checked_offset(length - 1).is_none() {
            self.diagnostics.error(ErrorKind::ProgramTooLarge {
                start: origin,
                length,
            });
        }
        let mut words: Vec<u16> = Vec::with_capacity(length);
        let mut source_lines: BTreeMap<Address, String> = BTreeMap::new();
        for (offset, cell) in self.image.cells() {
            let address = origin.checked_offset(offset);
            let line = self.image.line_at(offset).and_then(|n| lines.get(n));
            let instruction_line = self.image.instruction_line(offset).and_then(|n| lines.get(n));
            let word = match cell {
                Cell::Word(value) => u16::try_from(value).unwrap_or_else(|_| {
                    let kind = ErrorKind::ValueTooLarge(value);
                    match (line, address) {
                        (Some(line), _) => self.diagnostics.error_at(line, kind),
                        (None, Some(address)) => self.diagnostics.error_at_address(address, kind),
                        (None, None) => self.diagnostics.error(kind),
                    }
                    0
                }),
                Cell::Invalid => 0,
            };
            words.push(word);
            if let (Some(line), Some(address)) = (instruction_line, address) {
                source_lines.insert(address, line.text.to_string());
            }
        }
        let binary = Binary::new(origin, words);
        event!(
            Level::DEBUG,
            "emitted {} words starting at {origin}",
            binary.words().len()
        );
        if self.diagnostics.has_errors() {
            Err(FailedAssembly {
                diagnostics: self.diagnostics.into_vec(),
                image: Some(binary),
            })
        } else {
            Ok(Assembly {
                binary,
                source_lines,
                symbols: self.symbols.finalise(origin),
                warnings: self.diagnostics.into_vec(),
            })
        }
    }
}

/// The first non-blank line must be `.orig` with one operand.
fn first_line(tokens: &[String]) -> FieldResult<Address> {
    match tokens.split_first() {
        Some((first, operands)) if Directive::from_name(first) == Some(Directive::Orig) => {
            parse_origin(operands)
        }
        _ => Err(ErrorKind::MissingOrigin),
    }
}

/// Assemble a whole program.
///
/// # Errors
///
/// Returns every diagnostic (errors and warnings) if any error was
/// found.
pub fn assemble(source_text: &str, options: &AssemblyOptions) -> Result<Assembly, FailedAssembly> {
    let span = span!(Level::INFO, "assemble", profile = %options.profile, role = ?options.role);
    let _enter = span.enter();
    let lines = source::lines(source_text);
    let mut run = Run::new(options);
    run.scan(&lines);
    event!(
        Level::DEBUG,
        "first pass complete: {} words, {} fixups",
        run.image.len(),
        run.fixups.len()
    );
    run.resolve_fixups(&lines);
    run.emit(&lines)
}

/// Assemble the file `input_file`, writing the object file to
/// `output_file`.  Diagnostics are written to standard error.
///
/// # Errors
///
/// Fails if the input cannot be read, the program contains errors,
/// or an output file cannot be written.
pub fn assemble_file(
    input_file: &Path,
    output_file: &Path,
    options: &AssemblyOptions,
    outputs: &OutputOptions,
) -> Result<(), AssemblerFailure> {
    let source_text = std::fs::read_to_string(input_file).map_err(|e| {
        AssemblerFailure::Io(IoFailed {
            action: IoAction::Read,
            target: input_file.to_path_buf(),
            error: e,
        })
    })?;
    let assembly = match assemble(&source_text, options) {
        Ok(assembly) => assembly,
        Err(failed) => {
            eprint!("{}", render(failed.diagnostics()));
            return Err(AssemblerFailure::BadInput {
                filename: input_file.to_path_buf(),
                diagnostics: failed.into_diagnostics(),
            });
        }
    };
    eprint!("{}", render(assembly.warnings()));

    output::write_binary(assembly.binary(), output_file)?;
    if let Some(path) = outputs.symbols.as_deref() {
        output::write_text(path, &assembly.symbols().to_string())?;
    }
    if let Some(path) = outputs.hex.as_deref() {
        output::write_text(path, &assembly.binary().object_listing().to_string())?;
    }
    if outputs.list {
        print!("{}", assembly.listing());
    }
    Ok(())
}
