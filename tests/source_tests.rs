// Scrape output parsing and SNMP counter decoding

use ratewatch::source::{SourceError, decode_counter_bytes, parse_monitor_output};

#[test]
fn parses_explicit_bits_per_second_fields() {
    let output = "rx-bits-per-second: 5000000 tx-bits-per-second: 2000000";
    let (rx, tx) = parse_monitor_output(output).expect("parse");
    assert_eq!(rx, 5_000_000.0);
    assert_eq!(tx, 2_000_000.0);
}

#[test]
fn parses_full_monitor_traffic_output() {
    let output = r#"
                       name: ether1
    rx-packets-per-second: 1 244
       rx-bits-per-second: 1460984
    tx-packets-per-second: 801
       tx-bits-per-second: 592736
"#;
    let (rx, tx) = parse_monitor_output(output).expect("parse");
    assert_eq!(rx, 1_460_984.0);
    assert_eq!(tx, 592_736.0);
}

#[test]
fn parses_human_readable_megabit_fields_with_decimal_point() {
    let output = "rx-rate: 5.2Mbps tx-rate: 1.5Mbps";
    let (rx, tx) = parse_monitor_output(output).expect("parse");
    assert!((rx - 5_200_000.0).abs() < 1e-3);
    assert!((tx - 1_500_000.0).abs() < 1e-3);
}

#[test]
fn parses_human_readable_megabit_fields_with_decimal_comma() {
    let output = "rx-rate: 5,2Mbps tx-rate: 0,8Mbps";
    let (rx, tx) = parse_monitor_output(output).expect("parse");
    assert!((rx - 5_200_000.0).abs() < 1e-3);
    assert!((tx - 800_000.0).abs() < 1e-3);
}

#[test]
fn unrecognized_output_fails_with_raw_output_attached() {
    let output = "failure: unknown interface name";
    let err = parse_monitor_output(output).expect_err("must not parse");
    match err {
        SourceError::Parse { raw, .. } => assert_eq!(raw, output),
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[test]
fn non_numeric_rate_fields_fail_to_parse() {
    let output = "rx-bits-per-second: lots tx-bits-per-second: many";
    assert!(parse_monitor_output(output).is_err());
}

#[test]
fn decodes_full_eight_byte_counter() {
    let bytes = [0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(decode_counter_bytes(&bytes), 1 << 32);
}

#[test]
fn short_encoding_is_left_zero_padded() {
    // A 3-byte wire value is a small-magnitude counter, not garbage.
    assert_eq!(decode_counter_bytes(&[0x01, 0x02, 0x03]), 0x010203);
    assert_eq!(decode_counter_bytes(&[0x7f]), 127);
}

#[test]
fn empty_encoding_decodes_to_zero() {
    assert_eq!(decode_counter_bytes(&[]), 0);
}

#[test]
fn oversized_encoding_keeps_trailing_bytes() {
    let bytes = [0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a];
    assert_eq!(decode_counter_bytes(&bytes), 0x2a);
}
