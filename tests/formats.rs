//! Decoder behaviour through the public API

use approx::assert_relative_eq;
use opl3_replayer::formats::{
    decode_auto, DecodeOptions, DroV1Decoder, DroV2Decoder, FileFormat, FormatDecoder,
    ImfDecoder, RawDecoder, VgmDecoder,
};
use opl3_replayer::{Command, FormatError};

fn dro_v1(body: &[u8]) -> Vec<u8> {
    let mut data = b"DBRAWOPL".to_vec();
    data.extend_from_slice(&[0, 0, 1, 0]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&(body.len() as u32).to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // OPL2, 4-byte hardware field
    data.extend_from_slice(body);
    data
}

fn dro_v2(hardware: u8, codemap: &[u8], body: &[u8]) -> Vec<u8> {
    let mut data = b"DBRAWOPL".to_vec();
    data.extend_from_slice(&[2, 0, 0, 0]);
    data.extend_from_slice(&((body.len() / 2) as u32).to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&[hardware, 0, 0, 0xF0, 0xF1, codemap.len() as u8]);
    data.extend_from_slice(codemap);
    data.extend_from_slice(body);
    data
}

fn raw(body: &[u8]) -> Vec<u8> {
    let mut data = b"RAWADATA".to_vec();
    data.extend_from_slice(&0x1000u16.to_le_bytes());
    data.extend_from_slice(body);
    data
}

fn vgm(body: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 0x100];
    data[0..4].copy_from_slice(b"Vgm ");
    data[0x08..0x0C].copy_from_slice(&0x171u32.to_le_bytes());
    data[0x34..0x38].copy_from_slice(&(0x100u32 - 0x34).to_le_bytes());
    data[0x5C..0x60].copy_from_slice(&14_318_180u32.to_le_bytes());
    data.extend_from_slice(body);
    data
}

#[test]
fn empty_data_region_decodes_to_empty_stream_for_every_format() {
    let cases: Vec<(Box<dyn FormatDecoder>, Vec<u8>)> = vec![
        (Box::new(ImfDecoder::new(560.0)), Vec::new()),
        (Box::new(ImfDecoder::new(700.0)), vec![0, 0]),
        (Box::new(RawDecoder), raw(&[])),
        (Box::new(DroV1Decoder), dro_v1(&[])),
        (Box::new(DroV2Decoder), dro_v2(0, &[0x20], &[])),
        (Box::new(VgmDecoder::default()), vgm(&[])),
        (Box::new(VgmDecoder::default()), vgm(&[0x66])),
    ];

    for (decoder, data) in cases {
        let decoded = decoder.decode(&data);
        assert!(decoded.is_ok(), "{}: {:?}", decoder.name(), decoded.diagnostic);
        assert!(decoded.stream.is_empty(), "{}", decoder.name());
        assert_eq!(decoded.stream.total_seconds(), 0.0, "{}", decoder.name());
    }
}

#[test]
fn imf_headerless_example() {
    let decoded = ImfDecoder::new(560.0).decode(&[0, 0, 0, 0, 0x20, 0x01, 0x05, 0x00]);
    assert!(decoded.is_ok());
    assert_eq!(decoded.stream.commands, vec![Command::new(0, 0x20, 0x01)]);
    assert_eq!(decoded.stream.cmd_rate, 560.0);
}

#[test]
fn raw_without_magic_is_empty_with_diagnostic() {
    for data in [&b"RAWXDATA\x10\x00\x01\x20"[..], &b"RAWADATX\x10\x00\x01\x20"[..], &b""[..]] {
        let decoded = RawDecoder.decode(data);
        assert!(decoded.stream.is_empty());
        assert!(matches!(
            decoded.diagnostic,
            Some(FormatError::BadMagic { format: "RAW", .. })
        ));
    }
}

#[test]
fn dro_v2_hardware_ids_differ_from_v1() {
    // v2 hardware 1 is dual OPL2, which v1 calls OPL3
    let data = dro_v2(1, &[0x00, 0x00, 0x20], &[0x02, 0x01]);
    let stream = DroV2Decoder.decode(&data).into_result().unwrap();
    assert!(stream.dual_chip_mode);

    let mut v1 = dro_v1(&[0x20, 0x01]);
    v1[0x14] = 1;
    let stream = DroV1Decoder.decode(&v1).into_result().unwrap();
    assert!(!stream.dual_chip_mode);
}

#[test]
fn dro_hardware_outside_known_ids_is_unsupported() {
    let decoded = DroV2Decoder.decode(&dro_v2(3, &[0x20], &[]));
    assert!(matches!(decoded.diagnostic, Some(FormatError::Unsupported { .. })));
}

#[test]
fn dro_v2_delays_in_milliseconds() {
    let data = dro_v2(0, &[0x20, 0xA0], &[0x00, 0x01, 0xF0, 0x63, 0x01, 0x44, 0xF1, 0x01, 0x00, 0x02]);
    let stream = DroV2Decoder.decode(&data).into_result().unwrap();
    assert_eq!(
        stream.commands,
        vec![
            Command::new(0, 0x20, 0x01),
            Command::new(100, 0xA0, 0x44),
            Command::new(612, 0x20, 0x02),
        ]
    );
    assert_relative_eq!(stream.total_seconds(), 0.612);
}

#[test]
fn vgm_unknown_opcode_reports_offset() {
    let decoded = VgmDecoder::default().decode(&vgm(&[0x62, 0x67, 0x66]));
    assert!(decoded.stream.is_empty());
    assert_eq!(
        decoded.diagnostic,
        Some(FormatError::UnknownOpcode {
            format: "VGM",
            opcode: 0x67,
            offset: 0x101,
        })
    );
}

#[test]
fn vgm_total_time_uses_44100_hz() {
    let stream = VgmDecoder::default()
        .decode(&vgm(&[0x5E, 0x20, 0x01, 0x63, 0x63, 0x62, 0x62, 0x5E, 0x20, 0x00, 0x66]))
        .into_result()
        .unwrap();
    assert_relative_eq!(stream.total_seconds(), (882.0 * 2.0 + 735.0 * 2.0) / 44_100.0);
}

#[test]
fn decode_auto_detects_each_format() {
    let options = DecodeOptions::default();
    let cases = [
        (raw(&[0x01, 0x20]), FileFormat::Raw),
        (dro_v1(&[0x20, 0x01]), FileFormat::DroV1),
        (dro_v2(0, &[0x20], &[0x00, 0x01]), FileFormat::DroV2),
        (vgm(&[0x5E, 0x20, 0x01, 0x66]), FileFormat::Vgm),
        (vec![0, 0, 0, 0, 0x20, 0x01, 0x00, 0x00], FileFormat::Imf),
    ];

    for (data, expected) in cases {
        let (format, decoded) = decode_auto(&data, &options);
        assert_eq!(format, Some(expected));
        assert!(decoded.is_ok(), "{}: {:?}", expected, decoded.diagnostic);
        assert_eq!(decoded.stream.len(), 1, "{}", expected);
    }
}

#[test]
fn decode_auto_unwraps_gzip() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&vgm(&[0x5E, 0x20, 0x01, 0x66])).unwrap();
    let packed = encoder.finish().unwrap();

    let (format, decoded) = decode_auto(&packed, &DecodeOptions::default());
    assert_eq!(format, Some(FileFormat::Vgm));
    assert_eq!(decoded.stream.commands, vec![Command::new(0, 0x20, 0x01)]);
}

#[test]
fn decode_auto_reports_broken_gzip() {
    let (format, decoded) = decode_auto(b"\x1F\x8B\x01\x00broken", &DecodeOptions::default());
    assert_eq!(format, None);
    assert!(matches!(
        decoded.diagnostic,
        Some(FormatError::Corrupt { format: "gzip", .. })
    ));
}

#[test]
fn newer_dro_version_is_rejected() {
    let mut data = dro_v2(0, &[0x20], &[]);
    data[8] = 3;
    let (format, decoded) = decode_auto(&data, &DecodeOptions::default());
    assert_eq!(format, Some(FileFormat::DroV2));
    assert!(matches!(
        decoded.diagnostic,
        Some(FormatError::UnsupportedVersion { version: 3, .. })
    ));
}
