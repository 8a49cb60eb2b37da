//! Container-level scenarios: state machine enforcement, byte-exact
//! round-trips, fix-up corrections, metadata handling.

mod common;

use common::{unit_quant, BitSink, JpegBuilder};
use jpeg_probe::{parse, Encoding, Error, ParseOptions};

/// ECS for one data unit: DC size 0, then EOB (tables where both Huffman
/// codes are the single bit 0).
fn trivial_unit_ecs() -> Vec<u8> {
    let mut sink = BitSink::new();
    sink.push(0, 1).push(0, 1);
    sink.bytes()
}

/// The minimal grayscale baseline stream: 8x8, flat tables.
fn minimal_gray() -> Vec<u8> {
    JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1)], &[0x00]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&trivial_unit_ecs())
        .eoi()
}

#[test]
fn test_minimal_gray_parses_completely() {
    let bytes = minimal_gray();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    assert!(model.is_complete());
    assert_eq!(model.num_frames(), 1);
    // DQT, SOF, DHT, SOS.
    assert_eq!(model.num_segments(), 4);

    let info = model.frame_info(0).expect("frame info");
    assert_eq!(info.encoding, Encoding::BaselineSequential);
    assert_eq!(info.precision, 8);
    assert_eq!(info.width, 8);
    assert_eq!(info.height, 8);
    assert_eq!(info.components.len(), 1);
}

#[test]
fn test_roundtrip_is_byte_exact() {
    // A richer stream: APP0, COM, combined DHT, DRI with restarts.
    let mut unit = BitSink::new();
    unit.push(0b10, 2).push(16, 5).push(0, 1); // DC +16, EOB
    let ecs = unit.bytes();

    let bytes = JpegBuilder::new()
        .jfif_app0()
        .com("round trip me")
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 16, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1), (2, 1)], &[0x00, 0x05]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .dri(1)
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&ecs)
        .rst(0)
        .raw(&ecs)
        .eoi();

    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let mut out = Vec::new();
    let n = model.serialize(&mut out).expect("serialize");
    assert_eq!(n, out.len());
    assert_eq!(out, bytes);
}

#[test]
fn test_roundtrip_survives_reparse() {
    let bytes = minimal_gray();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let mut once = Vec::new();
    model.serialize(&mut once).unwrap();

    let again = parse(&once, ParseOptions::default()).expect("reparse");
    let mut twice = Vec::new();
    again.serialize(&mut twice).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_trailing_rst_removed_with_tidy_up() {
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1)], &[0x00]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&trivial_unit_ecs())
        .rst(5)
        .eoi();

    // Without tidy-up the redundant marker is preserved.
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let mut out = Vec::new();
    model.serialize(&mut out).unwrap();
    assert_eq!(out, bytes);

    // With tidy-up it vanishes and only it.
    let model = parse(&bytes, ParseOptions::default().tidy_up(true)).expect("parse");
    let mut fixed = Vec::new();
    model.serialize(&mut fixed).unwrap();
    assert_eq!(fixed.len() + 2, bytes.len());
    let mut expected = bytes.clone();
    let eoi = expected.split_off(expected.len() - 2);
    expected.truncate(expected.len() - 2); // drop FF D5
    expected.extend_from_slice(&eoi);
    assert_eq!(fixed, expected);

    // Tidy output is a fixed point of tidy parsing.
    let again = parse(&fixed, ParseOptions::default().tidy_up(true)).expect("reparse");
    let mut twice = Vec::new();
    again.serialize(&mut twice).unwrap();
    assert_eq!(twice, fixed);
}

fn dnl_stream() -> Vec<u8> {
    // Height undeclared (0); two MCU rows of one unit each, then DNL 16.
    let mut sink = BitSink::new();
    sink.push(0, 1).push(0, 1); // row 0: DC, EOB
    sink.push(0, 1).push(0, 1); // row 1
    JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 0, 8, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1)], &[0x00]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&sink.bytes())
        .dnl(16)
        .eoi()
}

#[test]
fn test_dnl_preserved_without_tidy_up() {
    let bytes = dnl_stream();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let mut out = Vec::new();
    model.serialize(&mut out).unwrap();
    assert_eq!(out, bytes);
    // The DNL height is still believed for reconstruction.
    assert_eq!(model.frame_info(0).unwrap().height, 16);
}

#[test]
fn test_dnl_folds_into_frame_with_tidy_up() {
    let bytes = dnl_stream();
    let model = parse(&bytes, ParseOptions::default().tidy_up(true)).expect("parse");
    let mut fixed = Vec::new();
    model.serialize(&mut fixed).unwrap();

    // The DNL segment (6 bytes) is gone and the SOF carries its value.
    assert_eq!(fixed.len() + 6, bytes.len());
    let reparsed = parse(&fixed, ParseOptions::default().tidy_up(true)).expect("reparse");
    assert_eq!(reparsed.frame_info(0).unwrap().height, 16);

    // Fixed point.
    let mut twice = Vec::new();
    reparsed.serialize(&mut twice).unwrap();
    assert_eq!(twice, fixed);

    // The reconstructor uses the folded height.
    let px = model.reconstruct(0, true).expect("reconstruct");
    assert_eq!(px.height, 16);
    assert_eq!(px.width, 8);
}

#[test]
fn test_progressive_container_roundtrip() {
    // DC-initial scan decodes; the AC scan is preserved untouched.
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC2, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[(0, 0, &[(1, 1)], &[0x00])])
        .sos(&[(1, 0, 0)], 0, 0, 0, 0)
        .raw(&[0x7F]) // single DC bit, 1-padded
        .dht(&[(1, 0, &[(1, 1)], &[0x00])])
        .sos(&[(1, 0, 0)], 1, 63, 0, 0)
        .raw(&[0x12, 0x34])
        .eoi();

    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    assert!(model.is_complete());
    let mut out = Vec::new();
    model.serialize(&mut out).unwrap();
    assert_eq!(out, bytes);

    // Progressive pixels are out of scope.
    match model.reconstruct(0, true) {
        Err(Error::UnsupportedKind(_)) => {}
        other => panic!("expected UnsupportedKind, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_signature_mismatch() {
    let err = parse(b"\x89PNG", ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::SignatureMismatch { .. }));
}

#[test]
fn test_eoi_in_wrong_state() {
    let bytes = JpegBuilder::new().eoi();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::WrongStateForMarker { marker: 0xD9, .. }));
}

#[test]
fn test_restart_marker_at_top_level() {
    let bytes = JpegBuilder::new().rst(0).build();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::WrongStateForMarker { marker: 0xD0, .. }));
}

#[test]
fn test_second_frame_rejected() {
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .build();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::WrongStateForMarker { marker: 0xC0, .. }));
}

#[test]
fn test_segment_truncated() {
    let mut bytes = JpegBuilder::new().build();
    bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]); // DQT claims 67
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(
        err.error,
        Error::SegmentTruncated { marker: 0xDB, declared: 0x43, .. }
    ));
}

#[test]
fn test_missing_huffman_table() {
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&[0x3F])
        .eoi();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::TableMissing { .. }));
}

#[test]
fn test_missing_quant_table() {
    let bytes = JpegBuilder::new()
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1)], &[0x00]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .sos(&[(1, 0, 0)], 0, 63, 0, 0)
        .raw(&[0x3F])
        .eoi();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::QuantTableMissing { dest: 0 }));
}

#[test]
fn test_scan_references_unknown_component() {
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[
            (0, 0, &[(1, 1)], &[0x00]),
            (1, 0, &[(1, 1)], &[0x00]),
        ])
        .sos(&[(9, 0, 0)], 0, 63, 0, 0)
        .raw(&[0x3F])
        .eoi();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::BadSegment { marker: 0xDA, .. }));
}

#[test]
fn test_arithmetic_conditioning_rejected() {
    let bytes = JpegBuilder::new().segment(0xCC, &[0x00, 0x10]).build();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::UnsupportedKind(_)));
}

#[test]
fn test_hierarchical_rejected() {
    let bytes = JpegBuilder::new()
        .segment(0xDE, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0])
        .build();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::UnsupportedKind(_)));
}

#[test]
fn test_malformed_huffman_table() {
    // Three codes of length one cannot exist.
    let bytes = JpegBuilder::new()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .dht(&[(0, 0, &[(1, 3)], &[0x00, 0x01, 0x02])])
        .build();
    let err = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(err.error, Error::MalformedTable(_)));
}

#[test]
fn test_partial_model_survives_failure() {
    let bytes = JpegBuilder::new()
        .jfif_app0()
        .dqt(0, &unit_quant())
        .sof(0xC0, 8, 8, 8, &[(1, 1, 1, 0)])
        .build(); // no scan, no EOI; then garbage marker
    let mut bytes = bytes;
    bytes.extend_from_slice(&[0xFF, 0x01]); // TEM
    let failure = parse(&bytes, ParseOptions::default()).unwrap_err();
    assert!(matches!(failure.error, Error::BadMarker(0x01)));
    assert_eq!(failure.model.num_segments(), 3);
    assert_eq!(failure.model.num_frames(), 1);
    assert!(!failure.model.is_complete());
    // Serializing the torso is refused.
    let mut out = Vec::new();
    assert!(matches!(
        failure.model.serialize(&mut out),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn test_truncated_input_is_incomplete_not_fatal() {
    let bytes = JpegBuilder::new().jfif_app0().build();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    assert!(!model.is_complete());
    assert_eq!(model.actual_lengths(), (0, bytes.len()));
}

#[test]
fn test_remove_metadata() {
    let bytes = minimal_gray();
    let with_app = JpegBuilder::new()
        .jfif_app0()
        .raw(&bytes[2..]) // splice the rest after our APP0
        .build();
    let mut model = parse(&with_app, ParseOptions::default()).expect("parse");
    assert_eq!(model.remove_metadata(Some(0)), 1);
    let mut out = Vec::new();
    model.serialize(&mut out).unwrap();
    assert_eq!(out, bytes);
    // Nothing left to remove.
    assert_eq!(model.remove_metadata(None), 0);
}

#[test]
fn test_actual_lengths_track_fixups() {
    let bytes = dnl_stream();
    let model = parse(&bytes, ParseOptions::default().tidy_up(true)).expect("parse");
    let (actual, original) = model.actual_lengths();
    assert_eq!(original, bytes.len());
    assert_eq!(actual + 6, original); // the folded DNL segment
}

#[test]
fn test_describe_mentions_segments() {
    let bytes = minimal_gray();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let mut out = Vec::new();
    let n = model.describe(&mut out).expect("describe");
    assert_eq!(n, out.len());
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("DQT"));
    assert!(text.contains("SOF0"));
    assert!(text.contains("DHT"));
    assert!(text.contains("SOS"));
    assert!(text.contains("complete"));
}

#[test]
fn test_thumbnail_recursion() {
    // A JFXX baseline thumbnail that is itself a complete JPEG.
    let thumb = minimal_gray();
    let mut body = b"JFXX\0".to_vec();
    body.push(0x10);
    body.extend_from_slice(&thumb);
    let rest = minimal_gray();
    let bytes = JpegBuilder::new()
        .segment(0xE0, &body)
        .raw(&rest[2..])
        .build();

    // Without recursion only the byte range surfaces.
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    assert_eq!(model.thumbnail(), Some(&thumb[..]));
    assert!(model.thumbnail_model().is_none());

    // With recursion the embedded stream is parsed too.
    let model = parse(&bytes, ParseOptions::default().recurse(true)).expect("parse");
    let tm = model.thumbnail_model().expect("thumbnail model");
    assert!(tm.is_complete());
    assert_eq!(tm.num_frames(), 1);
}

#[test]
fn test_orientation_surfaces_from_exif() {
    let rest = minimal_gray();
    let bytes = JpegBuilder::new().exif_app1(6).raw(&rest[2..]).build();
    let model = parse(&bytes, ParseOptions::default()).expect("parse");
    let o = model.orientation().expect("orientation");
    assert_eq!(o.exif_code(), Some(6));
}
