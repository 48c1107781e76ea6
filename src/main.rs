//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use bzip2_stream::tools::cli::{bzopts_init, output_name, BzOpts, Mode, Output};
use bzip2_stream::DecompressReader;

use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() {
    // Available log levels are Error, Warn, Info, Debug, Trace. The command line narrows this.
    if TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("Unable to start the terminal logger.");
    }

    let options = bzopts_init();

    let failures = if options.files.is_empty() {
        match decompress_stream(&options, io::stdin().lock(), io::stdout().lock()) {
            Ok(()) => 0,
            Err(e) => {
                error!("(stdin): {}", e);
                1
            }
        }
    } else {
        options
            .files
            .iter()
            .filter(|file| {
                let result = decompress_file(&options, file);
                if let Err(e) = &result {
                    error!("{}: {}", file.display(), e);
                }
                result.is_err()
            })
            .count()
    };

    info!("Done.");
    if failures > 0 {
        std::process::exit(if options.op_mode == Mode::Test { 2 } else { 1 });
    }
}

/// Decompress (or test) one file according to the options.
fn decompress_file(opts: &BzOpts, path: &Path) -> io::Result<()> {
    let f_in = File::open(path)?;

    match (opts.op_mode, opts.output) {
        (Mode::Test, _) => {
            decompress_stream(opts, f_in, io::sink())?;
            info!("{}: ok", path.display());
        }
        (Mode::Unzip, Output::Stdout) => {
            decompress_stream(opts, f_in, io::stdout().lock())?;
        }
        (Mode::Unzip, Output::File) => {
            let out_path = output_name(path);
            if out_path.exists() && !opts.force_overwrite {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("output file {} already exists", out_path.display()),
                ));
            }
            let f_out = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&out_path)?;
            if let Err(e) = decompress_stream(opts, f_in, f_out) {
                // Don't leave a partial file behind
                if fs::remove_file(&out_path).is_err() {
                    warn!("Unable to remove partial output {}", out_path.display());
                }
                return Err(e);
            }
            info!("{} -> {}", path.display(), out_path.display());
            if !opts.keep_input_files {
                fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

/// Decompress everything from `source` into `sink`.
fn decompress_stream<R: Read, W: Write>(opts: &BzOpts, source: R, sink: W) -> io::Result<()> {
    let mut reader = DecompressReader::with_chunk_size(source, opts.chunk_size);
    let mut writer = BufWriter::new(sink);
    let written = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    info!("Decompressed {} bytes.", written);
    Ok(())
}
