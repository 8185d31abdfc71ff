//! Streaming MD5 digest engine
//!
//! Bytes are hashed while they are copied, so inputs of any size are
//! fingerprinted in a single pass with a bounded buffer.

use crate::fingerprint::Fingerprint;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

/// Copy buffer size
const BUFFER_SIZE: usize = 64 * 1024;

/// Copy `input` to `output` until EOF, returning the MD5 fingerprint of the bytes
///
/// Neither stream is closed; the caller owns both.
pub fn store_and_digest<R, W>(input: &mut R, output: &mut W) -> io::Result<Fingerprint>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let n = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        output.write_all(&buffer[..n])?;
    }
    output.flush()?;
    Ok(Fingerprint::from_digest(&hasher.finalize()))
}

/// MD5 fingerprint of everything `input` yields
pub fn digest_reader<R: Read + ?Sized>(input: &mut R) -> io::Result<Fingerprint> {
    store_and_digest(input, &mut io::sink())
}

/// MD5 fingerprint of a file on disk
pub fn md5_file(path: &Path) -> io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    digest_reader(&mut file)
}
