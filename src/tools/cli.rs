use clap::{ArgAction, Parser};
use log::{info, LevelFilter};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::compression::reader::DEFAULT_CHUNK_SIZE;

/// Verbosity of user information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Warnings,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Off,
            Verbosity::Warnings => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
            Verbosity::Trace => LevelFilter::Trace,
        }
    }
}

/// Unzip or Test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unzip,
    Test,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Define the two output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    File,
    Stdout,
}
impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub struct BzOpts {
    /// Files to read for input. Standard input when empty.
    pub files: Vec<PathBuf>,
    /// Silently overwrite existing files with the same name
    pub force_overwrite: bool,
    /// Don't remove input files after processing
    pub keep_input_files: bool,
    /// Decompress/Test
    pub op_mode: Mode,
    /// Location where output is sent
    pub output: Output,
    /// Verbosity of user information
    pub verbose: Verbosity,
    /// Compressed bytes handed to the decompressor per call
    pub chunk_size: usize,
}

impl BzOpts {
    pub fn new() -> Self {
        Self {
            files: vec![],
            force_overwrite: false,
            keep_input_files: false,
            op_mode: Mode::Unzip,
            output: Output::File,
            verbose: Verbosity::Warnings,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for BzOpts {
    fn default() -> Self {
        Self::new()
    }
}

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    name = "bzip2-stream",
    version,
    about = "Streaming bzip2 decompressor",
    long_about = "
    Decompresses bzip2 files a chunk at a time, without ever holding the whole compressed
    or decompressed file in memory.

    If no file names are given, decompresses from standard input to standard output."
)]
pub struct Args {
    /// Files to decompress
    #[clap(value_parser)]
    files: Vec<PathBuf>,

    /// Decompress (the default, accepted for compatibility)
    #[clap(short = 'd', long = "decompress")]
    #[allow(dead_code)]
    decompress: bool,

    /// Send output to the terminal
    #[clap(short = 'c', long = "stdout")]
    stdout: bool,

    /// Test compressed file integrity
    #[clap(short = 't', long = "test")]
    test: bool,

    /// Keep input files
    #[clap(short = 'k', long = "keep")]
    keep: bool,

    ///Force overwriting output files
    #[clap(short = 'f', long = "force")]
    force: bool,

    /// Be verbose (a 2nd -v gives more)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Suppress noncritical messages
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Compressed bytes fed to the decompressor per call
    #[clap(long = "chunk-size", value_parser, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

impl From<Args> for BzOpts {
    fn from(args: Args) -> Self {
        let mut opts = BzOpts::new();
        opts.files = args.files;
        opts.force_overwrite = args.force;
        opts.keep_input_files = args.keep;
        if args.test {
            opts.op_mode = Mode::Test;
        }
        if args.stdout || opts.files.is_empty() {
            opts.output = Output::Stdout;
        }
        opts.verbose = match (args.quiet, args.verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Warnings,
            (false, 1) => Verbosity::Info,
            (false, 2) => Verbosity::Debug,
            (false, _) => Verbosity::Trace,
        };
        opts.chunk_size = args.chunk_size.max(1);
        opts
    }
}

/// Put command line information from CLAP into our internal structure and set the log level.
pub fn bzopts_init() -> BzOpts {
    let opts = BzOpts::from(Args::parse());
    log::set_max_level(opts.verbose.level_filter());

    info!("---- Initialization Start ----");
    info!("Verbosity set to {}", log::max_level());
    info!("Operational mode set to {}", opts.op_mode);
    info!("Output set to {}", opts.output);
    info!("Chunk size set to {}", opts.chunk_size);
    if opts.force_overwrite {
        info!("Forcing file overwriting")
    };
    if opts.keep_input_files {
        info!("Keeping input files")
    };
    info!("---- Initialization End ----");
    opts
}

/// Name of the file to decompress `input` into: `.bz2` and `.bz` are stripped, `.tbz2` and
/// `.tbz` become `.tar`, anything else gets `.out` appended.
pub fn output_name(input: &Path) -> PathBuf {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some("bz2") | Some("bz") => input.with_extension(""),
        Some("tbz2") | Some("tbz") => input.with_extension("tar"),
        _ => {
            let mut name = input.as_os_str().to_owned();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> BzOpts {
        BzOpts::from(Args::try_parse_from(args).unwrap())
    }

    #[test]
    fn output_name_test() {
        assert_eq!(output_name(Path::new("data.txt.bz2")), PathBuf::from("data.txt"));
        assert_eq!(output_name(Path::new("dir/data.bz")), PathBuf::from("dir/data"));
        assert_eq!(output_name(Path::new("backup.tbz2")), PathBuf::from("backup.tar"));
        assert_eq!(output_name(Path::new("backup.tbz")), PathBuf::from("backup.tar"));
        assert_eq!(output_name(Path::new("notes.txt")), PathBuf::from("notes.txt.out"));
        assert_eq!(output_name(Path::new("noext")), PathBuf::from("noext.out"));
    }

    #[test]
    fn defaults_test() {
        let opts = parse(&["bzip2-stream", "a.bz2"]);
        assert_eq!(opts.files, vec![PathBuf::from("a.bz2")]);
        assert_eq!(opts.op_mode, Mode::Unzip);
        assert_eq!(opts.output, Output::File);
        assert_eq!(opts.verbose, Verbosity::Warnings);
        assert_eq!(opts.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!opts.keep_input_files);
        assert!(!opts.force_overwrite);
    }

    #[test]
    fn stdin_goes_to_stdout_test() {
        let opts = parse(&["bzip2-stream"]);
        assert!(opts.files.is_empty());
        assert_eq!(opts.output, Output::Stdout);
    }

    #[test]
    fn flags_test() {
        let opts = parse(&["bzip2-stream", "-kf", "-t", "-vv", "--chunk-size", "512", "a", "b"]);
        assert!(opts.keep_input_files);
        assert!(opts.force_overwrite);
        assert_eq!(opts.op_mode, Mode::Test);
        assert_eq!(opts.verbose, Verbosity::Debug);
        assert_eq!(opts.chunk_size, 512);
        assert_eq!(opts.files.len(), 2);

        let opts = parse(&["bzip2-stream", "-c", "-q", "-vvvv", "a.bz2"]);
        assert_eq!(opts.output, Output::Stdout);
        assert_eq!(opts.verbose, Verbosity::Quiet);
    }

    #[test]
    fn bad_chunk_size_test() {
        assert!(Args::try_parse_from(["bzip2-stream", "--chunk-size", "lots"]).is_err());
    }
}
