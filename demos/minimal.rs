use lzo_fear::{compress, decompress};
use rand::prelude::*;
use std::time::Instant;

fn main() {
    let mut data = vec![0u8; 10_000_000];
    thread_rng().fill(&mut data[..5_000_000]);

    let pre = Instant::now();
    let compressed = compress(&data).unwrap();
    println!("compressed {} -> {} bytes in {:?}", data.len(), compressed.len(), pre.elapsed());

    let mut decompressed = vec![0u8; data.len()];
    let pre = Instant::now();
    for _ in 0..100 {
        decompress(&compressed, &mut decompressed).unwrap();
    }
    println!("{:?}", pre.elapsed() / 100);
    assert_eq!(decompressed, data);
}
