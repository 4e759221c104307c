use std::time::{Duration, UNIX_EPOCH};

use super::*;

#[test]
fn small_tags_fit_one_byte() {
    let mut enc = Encoder::new();
    enc.begin(dtag::NAME).end();
    assert_eq!(enc.finish(), vec![0xF2, 0x00]);
}

#[test]
fn large_tags_use_continuation_bytes() {
    let mut enc = Encoder::new();
    enc.begin(dtag::CONTENT_OBJECT).end();
    assert_eq!(enc.finish(), vec![0x04, 0x82, 0x00]);

    let mut enc = Encoder::new();
    enc.begin(dtag::SYNC_CONFIG_SLICE).end();
    assert_eq!(enc.finish(), vec![0x07, 0xE2, 0x00]);
}

#[test]
fn blob_and_udata_headers() {
    let mut enc = Encoder::new();
    enc.tagged_blob(dtag::COMPONENT, b"abc");
    assert_eq!(enc.finish(), vec![0xFA, 0x9D, b'a', b'b', b'c', 0x00]);

    let mut enc = Encoder::new();
    enc.tagged_udata(dtag::SYNC_VERSION, "20120325");
    let bytes = enc.finish();
    assert_eq!(&bytes[..3], &[0x07, 0xB2, 0xC6]);
    assert_eq!(&bytes[3..11], b"20120325");
    assert_eq!(bytes[11], 0x00);
}

#[test]
fn empty_blob_writes_no_token() {
    let mut enc = Encoder::new();
    enc.tagged_blob(dtag::COMPONENT, b"");
    assert_eq!(enc.finish(), vec![0xFA, 0x00]);
}

#[test]
fn long_blob_roundtrips() {
    let payload = vec![0xAB; 300];
    let mut enc = Encoder::new();
    enc.begin(dtag::CONTENT).blob(&payload).end();
    let bytes = enc.finish();

    let (element, used) = Element::decode(&bytes).unwrap();
    assert_eq!(used, bytes.len());
    assert_eq!(element.dtag, dtag::CONTENT);
    assert_eq!(element.blob(), payload);

    let mut again = Encoder::new();
    element.encode(&mut again);
    assert_eq!(again.finish(), bytes);
}

#[test]
fn nested_children_are_found() {
    let mut enc = Encoder::new();
    enc.begin(dtag::NAME)
        .tagged_blob(dtag::COMPONENT, b"a")
        .tagged_blob(dtag::COMPONENT, b"b")
        .end();
    let bytes = enc.finish();
    let (name, _) = Element::decode_as(&bytes, dtag::NAME, "Name").unwrap();
    let parts: Vec<_> = name.children_with(dtag::COMPONENT).map(Element::blob).collect();
    assert_eq!(parts, vec![b"a".to_vec(), b"b".to_vec()]);
    assert!(name.child(dtag::CONTENT).is_none());
    assert_eq!(
        name.require(dtag::CONTENT, "Content"),
        Err(DecodeError::Missing("Content"))
    );
}

#[test]
fn truncated_input_is_incomplete() {
    let mut enc = Encoder::new();
    enc.tagged_blob(dtag::COMPONENT, b"abcdef");
    let bytes = enc.finish();
    for cut in 0..bytes.len() {
        assert_eq!(
            Element::decode(&bytes[..cut]).unwrap_err(),
            DecodeError::Incomplete,
            "cut at {cut}"
        );
    }
}

#[test]
fn decode_as_rejects_other_tags() {
    let mut enc = Encoder::new();
    enc.begin(dtag::INTEREST).end();
    let bytes = enc.finish();
    assert_eq!(
        Element::decode_as(&bytes, dtag::CONTENT_OBJECT, "ContentObject").unwrap_err(),
        DecodeError::Unexpected("ContentObject")
    );
}

#[test]
fn trailing_bytes_are_left_alone() {
    let mut enc = Encoder::new();
    enc.begin(dtag::NAME).end().begin(dtag::NAME).end();
    let bytes = enc.finish();
    let (_, used) = Element::decode(&bytes).unwrap();
    assert_eq!(used, 2);
}

#[test]
fn ccn_time_scales_by_4096() {
    let at = UNIX_EPOCH + Duration::from_millis(1_500);
    // 1 second << 12 plus half of 4096
    assert_eq!(ccn_time(at), vec![0x18, 0x00]);
    assert_eq!(ccn_time(UNIX_EPOCH), vec![0x00]);
}

#[test]
fn nesting_is_bounded() {
    let deep = vec![0xF2; 2_000_000];
    assert_eq!(Element::decode(&deep).unwrap_err(), DecodeError::TooDeep);

    let mut enc = Encoder::new();
    for _ in 0..MAX_DEPTH {
        enc.begin(dtag::NAME);
    }
    for _ in 0..MAX_DEPTH {
        enc.end();
    }
    let bytes = enc.finish();
    let (_, used) = Element::decode(&bytes).unwrap();
    assert_eq!(used, bytes.len());

    let mut nested = vec![0xF2; MAX_DEPTH + 1];
    nested.extend(vec![0x00; MAX_DEPTH + 1]);
    assert_eq!(Element::decode(&nested).unwrap_err(), DecodeError::TooDeep);
}
