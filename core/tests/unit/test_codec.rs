//! Codec property tests

use nucleus_core::codec::{self, ContentEncoding};

#[test]
fn test_verify_holds_for_encoded_content() {
    for data in [
        b"".as_slice(),
        b"plain text".as_slice(),
        b"{\"json\": true}".as_slice(),
        &[0u8, 1, 2, 255, 254],
    ] {
        let encoded = codec::encode(data);
        assert!(
            codec::verify(encoded.content(), encoded.encoding(), encoded.checksum()),
            "verify must hold for {:?}",
            data
        );
    }
}

#[test]
fn test_different_bytes_different_checksums() {
    let a = codec::checksum(b"content a");
    let b = codec::checksum(b"content b");
    assert_ne!(a, b);

    // Same decoded bytes, same checksum, independent of carrier encoding.
    let text = codec::encode(b"same bytes");
    let hinted = codec::encode_with_hint("same bytes", ContentEncoding::Utf8).unwrap();
    assert_eq!(text.checksum(), hinted.checksum());
}

#[test]
fn test_utf8_roundtrip() {
    let data = "fn main() { println!(\"ok\"); }\n".as_bytes();
    let encoded = codec::encode(data);
    assert_eq!(encoded.encoding(), ContentEncoding::Utf8);
    assert_eq!(encoded.decode().unwrap(), data);
}

#[test]
fn test_binary_roundtrip() {
    let data: Vec<u8> = (0u8..=255).collect();
    let encoded = codec::encode(&data);
    assert_eq!(encoded.encoding(), ContentEncoding::Base64);
    assert_eq!(encoded.decode().unwrap(), data);
    assert_eq!(encoded.size(), 256);
}

#[test]
fn test_zero_length_roundtrip() {
    let encoded = codec::encode(b"");
    assert_eq!(encoded.size(), 0);
    assert_eq!(encoded.decode().unwrap(), Vec::<u8>::new());
    assert!(codec::verify(
        encoded.content(),
        encoded.encoding(),
        encoded.checksum()
    ));
}

#[test]
fn test_authoritative_hint_is_trusted() {
    // A remote label wins over re-detection: this payload decodes as base64
    // but the API said it is literal text.
    let payload = "c2VjcmV0";
    let encoded = codec::encode_with_hint(payload, ContentEncoding::Utf8).unwrap();
    assert_eq!(encoded.encoding(), ContentEncoding::Utf8);
    assert_eq!(encoded.decode().unwrap(), payload.as_bytes());

    // And the base64 label is honored when given.
    let encoded = codec::encode_with_hint(payload, ContentEncoding::Base64).unwrap();
    assert_eq!(encoded.encoding(), ContentEncoding::Base64);
    assert_eq!(encoded.decode().unwrap(), b"secret");
    assert_eq!(encoded.size(), 6);
}

#[test]
fn test_verify_rejects_wrong_checksum() {
    let encoded = codec::encode(b"original");
    assert!(!codec::verify(
        "mutated",
        ContentEncoding::Utf8,
        encoded.checksum()
    ));
    assert!(!codec::verify(
        encoded.content(),
        encoded.encoding(),
        &codec::checksum(b"something else")
    ));
}

#[test]
fn test_verify_rejects_undecodable_payload() {
    let encoded = codec::encode(&[0u8, 200, 13]);
    assert!(!codec::verify(
        "!!! not base64 !!!",
        ContentEncoding::Base64,
        encoded.checksum()
    ));
}
