use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{event, span, Level};

use super::super::binary::Binary;
use super::super::types::{AssemblerFailure, IoAction, IoFailed};

fn write_failed(output_file_name: &Path, error: std::io::Error) -> AssemblerFailure {
    AssemblerFailure::Io(IoFailed {
        action: IoAction::Write,
        target: output_file_name.to_path_buf(),
        error,
    })
}

fn write_data(output_file_name: &Path, data: &[u8]) -> Result<(), AssemblerFailure> {
    let inner = || -> Result<(), std::io::Error> {
        const OUTPUT_CHUNK_SIZE: usize = 1024;
        let mut writer = BufWriter::new(File::create(output_file_name)?);
        for chunk in data.chunks(OUTPUT_CHUNK_SIZE) {
            writer.write_all(chunk)?;
        }
        writer.flush()
    };
    inner().map_err(|e| write_failed(output_file_name, e))
}

/// Write the program as an object file: the start address followed
/// by the memory contents, each a big-endian 16-bit word.
///
/// # Errors
///
/// Failure to write the output file.
pub(super) fn write_binary(binary: &Binary, output_file_name: &Path) -> Result<(), AssemblerFailure> {
    let span = span!(Level::ERROR, "write binary program");
    let _enter = span.enter();
    event!(
        Level::DEBUG,
        "writing {} words starting at {} to {}",
        binary.words().len(),
        binary.start(),
        output_file_name.display()
    );
    write_data(output_file_name, &binary.to_be_bytes())
}

/// Write one of the text artifacts (symbol table or object listing).
pub(super) fn write_text(output_file_name: &Path, text: &str) -> Result<(), AssemblerFailure> {
    write_data(output_file_name, text.as_bytes())
}
