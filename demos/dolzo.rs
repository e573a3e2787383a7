use fehler::throws;
use lzo_fear::CompressionSettings;
use std::fs;
use std::{env, io};

/// Compress a file into a raw LZO1X stream and print the original size,
/// which is needed to decompress it again.
#[throws(io::Error)]
fn main() {
    let filename_in = env::args().nth(1).expect("usage: dolzo <input> <output>");
    let filename_out = env::args().nth(2).expect("usage: dolzo <input> <output>");
    let data = fs::read(filename_in)?;

    let compressed = CompressionSettings::default().max_chain(512).compress(&data)?;
    fs::write(filename_out, &compressed)?;
    println!("{}", data.len());
}
