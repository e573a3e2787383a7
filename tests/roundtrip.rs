use lzo_fear::{
    compress, compress_into, compress_worst_size, decompress, decompress_to_vec, CompressionSettings, Compressor,
    Error, MAX_DISTANCE,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill(&mut data[..]);
    data
}

/// Random data drawn from a tiny alphabet, so it is full of short matches.
fn lumpy_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"abcd"[rng.gen_range(0, 4)]).collect()
}

fn assert_roundtrip(data: &[u8]) -> Vec<u8> {
    let compressed = compress(data).unwrap();
    assert!(compressed.len() <= compress_worst_size(data.len()));
    let decompressed = decompress_to_vec(&compressed, data.len()).unwrap();
    assert!(decompressed == data, "roundtrip of {} bytes failed", data.len());
    compressed
}

#[test]
fn incompressible_stays_within_bound() {
    for &len in &[0, 1, 2, 3, 4, 17, 18, 19, 238, 239, 240, 1000, 65_536, 200_000] {
        assert_roundtrip(&random_bytes(len as u64, len));
    }
}

#[test]
fn lumpy_data_compresses() {
    for &len in &[10, 100, 5_000, 100_000] {
        let data = lumpy_bytes(len as u64, len);
        let compressed = assert_roundtrip(&data);
        if len >= 5_000 {
            assert!(compressed.len() < data.len());
        }
    }
}

#[test]
fn long_runs() {
    assert_roundtrip(&vec![0u8; 100_000]);
    assert_roundtrip(&vec![0xffu8; MAX_DISTANCE * 3 + 7]);

    let mut data = random_bytes(1, 300);
    data.extend(std::iter::repeat(9u8).take(5_000));
    data.extend(random_bytes(2, 300));
    assert_roundtrip(&data);
}

#[test]
fn match_at_the_edge_of_the_window() {
    let mut data = random_bytes(3, MAX_DISTANCE + 4096);
    let (head, tail) = data.split_at_mut(MAX_DISTANCE);
    tail.copy_from_slice(&head[..4096]);
    let compressed = assert_roundtrip(&data);
    assert!(compressed.len() < data.len());
}

#[test]
fn repeats_beyond_the_window() {
    let mut data = random_bytes(4, 100_000);
    let copy = data[..50_000].to_vec();
    data.extend_from_slice(&copy);
    assert_roundtrip(&data);
}

#[test]
fn every_truncation_is_detected() {
    let data = b"Hello World, Hello World, Hello World! Hello hello hello hello.".to_vec();
    let compressed = compress(&data).unwrap();
    for end in 0..compressed.len() {
        let mut dst = vec![0u8; data.len()];
        assert_eq!(decompress(&compressed[..end], &mut dst), Err(Error::InputOverrun), "prefix of {} bytes", end);
    }
}

#[test]
fn trailing_garbage_is_soft() {
    let data = lumpy_bytes(5, 2_000);
    let mut compressed = compress(&data).unwrap();
    compressed.extend_from_slice(&[1, 2, 3]);

    let mut dst = vec![0u8; data.len()];
    let err = decompress(&compressed, &mut dst).unwrap_err();
    assert_eq!(err, Error::InputNotConsumed);
    assert!(err.is_soft());
    assert_eq!(dst, data);
}

#[test]
fn small_output_buffers() {
    let data = lumpy_bytes(6, 3_000);
    let compressed = compress(&data).unwrap();

    let mut dst = vec![0u8; data.len() - 1];
    assert_eq!(decompress(&compressed, &mut dst), Err(Error::OutputOverrun));

    let mut dst = vec![0u8; compressed.len() - 1];
    assert_eq!(compress_into(&data, &mut dst), Err(Error::OutputOverrun));
    let mut dst = vec![0u8; compressed.len()];
    assert_eq!(compress_into(&data, &mut dst), Ok(compressed.len()));
    assert_eq!(dst, compressed);
}

#[test]
fn extreme_settings_still_roundtrip() {
    let data = lumpy_bytes(7, 20_000);
    for &(chain, len) in &[(0, 0), (1, 3), (1, 100_000), (4096, 2048)] {
        let compressed = CompressionSettings::default().max_chain(chain).max_match_len(len).compress(&data).unwrap();
        assert_eq!(decompress_to_vec(&compressed, data.len()).unwrap(), data);
    }
}

#[test]
fn compressor_reuse_across_inputs() {
    let mut compressor = Compressor::new();
    for seed in 0..8 {
        let data = lumpy_bytes(seed, 1_000 + seed as usize * 997);
        let compressed = compressor.compress(&data).unwrap();
        assert_eq!(compressed, compress(&data).unwrap());
        assert_eq!(decompress_to_vec(&compressed, data.len()).unwrap(), data);
    }
}

proptest! {
    #[test]
    fn roundtrips_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let compressed = compress(&data).unwrap();
        prop_assert!(compressed.len() <= compress_worst_size(data.len()));
        prop_assert_eq!(decompress_to_vec(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn roundtrips_repetitive_bytes(data in proptest::collection::vec(0u8..3, 0..8192)) {
        let compressed = compress(&data).unwrap();
        prop_assert!(compressed.len() <= compress_worst_size(data.len()));
        prop_assert_eq!(decompress_to_vec(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512), size in 0usize..2048) {
        let mut dst = vec![0u8; size];
        if let Ok(written) = decompress(&data, &mut dst) {
            prop_assert!(written <= size);
        }
    }
}
