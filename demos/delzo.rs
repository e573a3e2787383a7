use lzo_fear::decompress_to_vec;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::env;

fn main() -> io::Result<()> {
    let filename_in = env::args().nth(1).expect("usage: delzo <input> <output> <size>");
    let filename_out = env::args().nth(2).expect("usage: delzo <input> <output> <size>");
    let size = env::args()
        .nth(3)
        .and_then(|s| s.parse::<usize>().ok())
        .expect("usage: delzo <input> <output> <size>");

    let compressed = fs::read(filename_in)?;
    let decompressed = decompress_to_vec(&compressed, size)?;
    let mut buf_writer = BufWriter::with_capacity(32 * 1024, fs::File::create(filename_out)?);
    buf_writer.write_all(&decompressed)?;
    buf_writer.flush()?;

    Ok(())
}
