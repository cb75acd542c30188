use super::*;

#[test]
fn test_with_capacity_uses_optimal_formulas() {
    // n=1000, p=0.01: m = ceil(-1000·ln(0.01)/ln(2)²) = 9586, k = ceil(m/n·ln2) = 7.
    let filter = BloomFilter::with_capacity(1000, 0.01);
    assert_eq!(filter.size_bits(), 9586);
    assert_eq!(filter.hash_functions(), 7);
}

#[test]
fn test_no_false_negatives() {
    let mut filter = BloomFilter::with_capacity(500, 0.01);
    let keys: Vec<String> = (0..500).map(|i| format!("term-{i}")).collect();
    for key in &keys {
        filter.insert(key);
    }
    for key in &keys {
        assert!(filter.might_contain(key), "false negative for {key}");
    }
}

#[test]
fn test_false_positive_rate_stays_bounded() {
    let mut filter = BloomFilter::with_capacity(500, 0.01);
    for i in 0..500 {
        filter.insert(&format!("present-{i}"));
    }

    let probes = 2000;
    let positives = (0..probes)
        .filter(|i| filter.might_contain(&format!("absent-{i}")))
        .count();
    let rate = positives as f64 / probes as f64;
    // Generous tolerance over the configured 1% target.
    assert!(rate < 0.05, "false positive rate {rate} too high");
}

#[test]
fn test_empty_filter_contains_nothing() {
    let filter = BloomFilter::with_capacity(100, 0.01);
    assert!(!filter.might_contain("anything"));
    assert_eq!(filter.item_count(), 0);
}

#[test]
fn test_bilingual_keys() {
    let mut filter = BloomFilter::with_capacity(100, 0.01);
    filter.insert("كرسي");
    filter.insert("wheelchair");
    assert!(filter.might_contain("كرسي"));
    assert!(filter.might_contain("wheelchair"));
}

#[test]
fn test_roundtrip_preserves_membership() {
    let mut filter = BloomFilter::with_capacity(200, 0.01);
    for i in 0..200 {
        filter.insert(&format!("key-{i}"));
    }

    let bytes = filter.to_bytes();
    let restored = BloomFilter::from_bytes(&bytes).unwrap();
    assert_eq!(restored, filter);
    for i in 0..200 {
        assert!(restored.might_contain(&format!("key-{i}")));
    }
}

#[test]
fn test_from_bytes_rejects_short_header() {
    let err = BloomFilter::from_bytes(&[0u8; 7]).unwrap_err();
    assert!(err.to_string().contains("Corrupt artifact"));
}

#[test]
fn test_from_bytes_rejects_truncated_body() {
    let filter = BloomFilter::with_capacity(100, 0.01);
    let mut bytes = filter.to_bytes();
    bytes.truncate(bytes.len() - 3);
    assert!(BloomFilter::from_bytes(&bytes).is_err());
}

#[test]
fn test_from_bytes_rejects_inconsistent_header() {
    let filter = BloomFilter::with_capacity(100, 0.01);
    let mut bytes = filter.to_bytes();
    // Claim a different bit-array size than the body actually covers.
    bytes[0] = bytes[0].wrapping_add(8);
    assert!(BloomFilter::from_bytes(&bytes).is_err());
}
