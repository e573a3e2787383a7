#![no_main]
use libfuzzer_sys::fuzz_target;
use lzo_fear::{compress, compress_worst_size, decompress_to_vec};

fuzz_target!(|data: &[u8]| {
    let compressed = compress(data).expect("Could not compress input data");
    assert!(compressed.len() <= compress_worst_size(data.len()), "Worst case size exceeded");

    let roundtripped = decompress_to_vec(&compressed, data.len()).expect("Could not decompress data");
    assert!(roundtripped == data, "Decompression result did not match the original input");
});
