// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// File name standing for stdin/stdout
pub const STDIO: &str = "-";

/// Destination of a backup stream
///
/// Call [`OutputStream::finish`] when done: a gzip stream is not complete
/// until its trailer is written.
pub enum OutputStream {
    Plain(Box<dyn Write>),
    Gzip(GzEncoder<Box<dyn Write>>),
}

impl OutputStream {
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputStream::Plain(mut out) => out.flush(),
            OutputStream::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::Plain(out) => out.write(buf),
            OutputStream::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::Plain(out) => out.flush(),
            OutputStream::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Open `file` (or stdout for `-`) for writing
pub fn open_output(file: &str, compress: bool) -> Result<OutputStream> {
    let out: Box<dyn Write> = if file == STDIO {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let handle =
            File::create(file).with_context(|| format!("Failed to create '{file}'"))?;
        Box::new(BufWriter::new(handle))
    };

    Ok(if compress {
        OutputStream::Gzip(GzEncoder::new(out, Compression::default()))
    } else {
        OutputStream::Plain(out)
    })
}

/// Open `file` (or stdin for `-`) for reading
pub fn open_input(file: &str, compress: bool) -> Result<Box<dyn Read>> {
    let input: Box<dyn Read> = if file == STDIO {
        Box::new(BufReader::new(io::stdin().lock()))
    } else {
        let handle = File::open(file).with_context(|| format!("Failed to open '{file}'"))?;
        Box::new(BufReader::new(handle))
    };

    Ok(if compress {
        Box::new(GzDecoder::new(input))
    } else {
        input
    })
}
