#![no_main]
use libfuzzer_sys::fuzz_target;
use lzo_fear::decompress;

fuzz_target!(|data: &[u8]| {
    // the first two bytes pick the output size, the rest is the stream
    if data.len() < 2 {
        return;
    }
    let size = u16::from_le_bytes([data[0], data[1]]) as usize;
    let mut output = vec![0u8; size];
    // random bytes are not valid LZO data, errors are expected
    if let Ok(written) = decompress(&data[2..], &mut output) {
        assert!(written <= size);
    }
});
