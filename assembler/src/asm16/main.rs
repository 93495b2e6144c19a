use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::ArgAction::{Set, SetTrue};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use assembler::{
    assemble_file, AssemblerFailure, AssemblyOptions, OutputOptions, Profile, Role,
};

/// Assembler for two related 16-bit instruction sets
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File from which assembly source is read.
    #[clap(action = Set)]
    input: PathBuf,

    /// File to which the object code is written
    #[clap(action = Set, short = 'o', long)]
    output: PathBuf,

    /// Instruction set of the program ("baseline" or "compact").
    #[clap(action = Set, long, default_value_t = Profile::Baseline)]
    profile: Profile,

    /// Assemble system or library code rather than a user program
    /// (user programs for the compact instruction set must start
    /// with a fixed prologue).
    #[clap(action = SetTrue, long)]
    library: bool,

    /// File to which the symbol table is written.
    #[clap(action = Set, long)]
    symbols: Option<PathBuf>,

    /// File to which the object code is written as hexadecimal text.
    #[clap(action = Set, long)]
    hex: Option<PathBuf>,

    /// When set, print a listing of the assembler output.
    #[clap(action = SetTrue, long)]
    list: bool,
}

#[derive(Debug)]
enum Fail {
    /// We initialised the assembler but then it failed.
    AsmFail(AssemblerFailure),
    /// We were not able to correctly initialise the assembler.
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::AsmFail(assembler_failure) => assembler_failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_assembler() -> Result<(), Fail> {
    let cli = Cli::parse();

    // See
    // https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::ERROR, "assemble file", input=?cli.input, output=?cli.output);
    let _enter = span.enter();
    let options = AssemblyOptions {
        profile: cli.profile,
        role: if cli.library {
            Role::Library
        } else {
            Role::Primary
        },
    };
    let outputs = OutputOptions {
        list: cli.list,
        symbols: cli.symbols,
        hex: cli.hex,
    };
    let result = assemble_file(&cli.input, &cli.output, &options, &outputs).map_err(Fail::AsmFail);
    if let Err(e) = &result {
        event!(Level::ERROR, "assembly failed: {e}");
    } else {
        event!(Level::INFO, "assembly succeeded");
    }
    result
}

fn main() {
    match run_assembler() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_to_baseline() {
        let cli = Cli::try_parse_from(["asm16", "in.asm", "-o", "out.obj"]).expect("valid command line");
        assert_eq!(cli.profile, Profile::Baseline);
        assert!(!cli.library);
    }

    #[test]
    fn test_profile_is_parsed_by_name() {
        let cli = Cli::try_parse_from(["asm16", "--profile", "compact", "in.asm", "-o", "out.obj"])
            .expect("valid command line");
        assert_eq!(cli.profile, Profile::Compact);
        assert!(Cli::try_parse_from(["asm16", "--profile", "arm", "in.asm", "-o", "out.obj"]).is_err());
    }
}
