//! Tests for block-data identifiers

use ballot_blockdata::{
    data_id, encode_transactions, parse_data_id, verify_block_data, BlockDataError, DataId,
    DataIdError, ZERO_HASH, ZERO_HASH_BYTES, ZERO_HASH_SUFFIX,
};
use ballot_types::{Transaction, H256};

fn txs(payloads: &[&str]) -> Vec<Transaction> {
    payloads
        .iter()
        .map(|p| Transaction::new(p.as_bytes().to_vec()))
        .collect()
}

#[test]
fn test_encode_parse_encode() {
    let hash = H256::keccak256(b"batch");
    let cases = [
        (0u64, 0u32, 1usize, 1usize),
        (10, 0, 1, 37),
        (u64::MAX, u32::MAX, 500, 1 << 20),
    ];

    for (height, round, n_txs, data_len) in cases {
        let encoded = data_id(height, round, n_txs, data_len, hash);
        let parsed = parse_data_id(&encoded).unwrap();
        assert_eq!(parsed, DataId::new(height, round, n_txs, data_len, hash));
        assert_eq!(parsed.to_string(), encoded);
    }
}

#[test]
fn test_format() {
    let hash = H256::keccak256(b"batch");
    let id = data_id(10, 3, 2, 12, hash);
    assert_eq!(id, format!("10:3:2:12:{}", hash.to_plain_hex()));
}

#[test]
fn test_empty_batch_is_canonical() {
    for (height, round) in [(0u64, 0u32), (1, 0), (10, 7), (u64::MAX, u32::MAX)] {
        let id = DataId::empty(height, round);
        assert_eq!(id.hash, ZERO_HASH_BYTES);
        assert_eq!(id.to_string(), format!("{height}:{round}{ZERO_HASH_SUFFIX}"));
        assert!(id.is_empty());
    }

    let (id, encoded) = DataId::for_transactions(4, 1, &[]);
    assert_eq!(id, DataId::empty(4, 1));
    assert!(encoded.is_empty());
}

#[test]
fn test_zero_hash_suffix_literal() {
    assert_eq!(
        ZERO_HASH,
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
    assert!(ZERO_HASH_SUFFIX.ends_with(ZERO_HASH));
}

#[test]
fn test_for_transactions_hashes_encoding() {
    let batch = txs(&["a", "b", "c"]);
    let (id, encoded) = DataId::for_transactions(7, 2, &batch);

    assert_eq!(encoded, encode_transactions(&batch));
    assert_eq!(id.n_txs, 3);
    assert_eq!(id.data_len, encoded.len());
    assert_eq!(id.hash, H256::keccak256(&encoded));
}

#[test]
fn test_data_id_depends_on_order() {
    let (a, _) = DataId::for_transactions(1, 0, &txs(&["x", "y"]));
    let (b, _) = DataId::for_transactions(1, 0, &txs(&["y", "x"]));
    assert_ne!(a, b);
}

#[test]
fn test_parse_rejects_bad_field_count() {
    assert_eq!(parse_data_id(""), Err(DataIdError::FieldCount(1)));
    assert_eq!(parse_data_id("1:2:3:4"), Err(DataIdError::FieldCount(4)));
    let too_many = format!("1:0:1:1:{}:x", "a".repeat(64));
    assert_eq!(parse_data_id(&too_many), Err(DataIdError::FieldCount(6)));
}

#[test]
fn test_parse_rejects_bad_numbers() {
    let hash = "a".repeat(64);
    for bad in [
        format!("-1:0:1:1:{hash}"),
        format!("01:0:1:1:{hash}"),
        format!("1:+0:1:1:{hash}"),
        format!("1:0:x:1:{hash}"),
        format!("1:0:1: 1:{hash}"),
        format!("1:4294967296:1:1:{hash}"),
    ] {
        assert!(
            matches!(parse_data_id(&bad), Err(DataIdError::InvalidNumber { .. })),
            "accepted {bad}"
        );
    }
}

#[test]
fn test_parse_rejects_bad_hash() {
    for bad in [
        "1:0:1:1:abc".to_string(),
        format!("1:0:1:1:{}", "A".repeat(64)),
        format!("1:0:1:1:0x{}", "a".repeat(62)),
        format!("1:0:1:1:{}", "g".repeat(64)),
    ] {
        assert!(matches!(parse_data_id(&bad), Err(DataIdError::InvalidHash(_))));
    }
}

#[test]
fn test_parse_rejects_inconsistent_counts() {
    let other = "a".repeat(64);
    assert_eq!(
        parse_data_id(&format!("1:0:0:5:{ZERO_HASH}")),
        Err(DataIdError::NonCanonicalEmpty)
    );
    assert_eq!(
        parse_data_id(&format!("1:0:0:0:{other}")),
        Err(DataIdError::NonCanonicalEmpty)
    );
    assert_eq!(
        parse_data_id(&format!("1:0:3:0:{other}")),
        Err(DataIdError::MissingLength(3))
    );
}

#[test]
fn test_parse_bytes() {
    let id = DataId::empty(3, 0);
    assert_eq!(DataId::parse_bytes(id.to_string().as_bytes()).unwrap(), id);
    assert_eq!(DataId::parse_bytes(&[0xff, 0xfe]), Err(DataIdError::NotUtf8));
}

#[test]
fn test_verify_block_data() {
    let batch = txs(&["one", "two"]);
    let (id, encoded) = DataId::for_transactions(5, 0, &batch);

    let data = verify_block_data(&id, encoded.clone()).unwrap();
    assert_eq!(data.transactions, batch);
    assert_eq!(data.encoded, encoded);

    let truncated = encoded.slice(..encoded.len() - 1);
    assert!(matches!(
        verify_block_data(&id, truncated),
        Err(BlockDataError::LengthMismatch { .. })
    ));

    let mut flipped = encoded.to_vec();
    let last = flipped.len() - 1;
    flipped[last] ^= 0x01;
    assert!(matches!(
        verify_block_data(&id, flipped.into()),
        Err(BlockDataError::HashMismatch { .. })
    ));

    let wrong_count = DataId::new(5, 0, 3, id.data_len, id.hash);
    assert_eq!(
        verify_block_data(&wrong_count, encoded),
        Err(BlockDataError::CountMismatch { expected: 3, actual: 2 })
    );
}
