//! Opcode Codec
//!
//! Pure encode/decode between `OpcodeRecord` and the on-chain byte layout.
//! `decode` takes untrusted chain data: every failure is an `OpcodeError`,
//! it never indexes past the input and never returns a partial record.

use borsh::{BorshDeserialize, BorshSerialize};

use super::opcode::{
    MalformedOpcode, OpcodeError, OpcodeResult, TypeTag, HEADER_LEN, MAX_OPCODE_BYTES,
    OPCODE_PREFIX, OPCODE_VERSION,
};
use super::records::{
    EventPatchRecord, EventRecord, MappingHeader, MappingRecord, MoneylineRecord, OpcodeRecord,
    ResultRecord, SpreadRecord, TotalRecord, MAPPING_HEADER_LEN,
};

// ============================================================================
// ENCODE
// ============================================================================

/// Serialize a record to `[prefix][version][type_tag][body]`
pub fn encode(record: &OpcodeRecord) -> OpcodeResult<Vec<u8>> {
    let tag = record.type_tag();
    let mut bytes = Vec::with_capacity(HEADER_LEN + tag.min_body_len());
    bytes.extend_from_slice(&[OPCODE_PREFIX, OPCODE_VERSION, tag.as_byte()]);

    match record {
        OpcodeRecord::Mapping(mapping) => {
            let header = MappingHeader {
                index: mapping.index,
                mapping_id: mapping.mapping_id,
            };
            write_body(&header, &mut bytes)?;
            bytes.extend_from_slice(mapping.name.as_bytes());
        }
        OpcodeRecord::Event(body) => write_body(body, &mut bytes)?,
        OpcodeRecord::EventPatch(body) => write_body(body, &mut bytes)?,
        OpcodeRecord::Result(body) => write_body(body, &mut bytes)?,
        OpcodeRecord::Moneyline(body) => write_body(body, &mut bytes)?,
        OpcodeRecord::Spread(body) => write_body(body, &mut bytes)?,
        OpcodeRecord::Total(body) => write_body(body, &mut bytes)?,
    }

    if bytes.len() > MAX_OPCODE_BYTES {
        return Err(OpcodeError::range(
            "name",
            format!(
                "opcode would be {} bytes, limit is {}",
                bytes.len(),
                MAX_OPCODE_BYTES
            ),
        ));
    }

    Ok(bytes)
}

/// Encode and render as lowercase hex (the form node RPCs expect)
pub fn encode_hex(record: &OpcodeRecord) -> OpcodeResult<String> {
    encode(record).map(hex::encode)
}

fn write_body<T: BorshSerialize>(body: &T, out: &mut Vec<u8>) -> OpcodeResult<()> {
    body.serialize(out)
        .map_err(|e| OpcodeError::range("body", e.to_string()))
}

// ============================================================================
// DECODE
// ============================================================================

/// Cheap pre-filter for scanners: does this data output claim to be an opcode?
pub fn looks_like_opcode(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes.first() == Some(&OPCODE_PREFIX)
}

/// Parse untrusted bytes into a record
pub fn decode(bytes: &[u8]) -> OpcodeResult<OpcodeRecord> {
    let [prefix, version, tag_byte, body @ ..] = bytes else {
        return Err(MalformedOpcode::Truncated {
            needed: HEADER_LEN,
            found: bytes.len(),
        }
        .into());
    };

    if bytes.len() > MAX_OPCODE_BYTES {
        return Err(MalformedOpcode::TooLong {
            found: bytes.len(),
            max: MAX_OPCODE_BYTES,
        }
        .into());
    }

    if *prefix != OPCODE_PREFIX {
        return Err(MalformedOpcode::BadPrefix(*prefix).into());
    }

    if *version == 0 {
        return Err(MalformedOpcode::InvalidVersion(*version).into());
    }
    if *version > OPCODE_VERSION {
        return Err(OpcodeError::UnknownVersion {
            found: *version,
            supported: OPCODE_VERSION,
        });
    }

    let tag = TypeTag::from_byte(*tag_byte)
        .ok_or(MalformedOpcode::UnknownTypeTag(*tag_byte))?;

    check_body_len(tag, body)?;

    let record = match tag {
        TypeTag::Mapping => OpcodeRecord::Mapping(read_mapping(body)?),
        TypeTag::Event => OpcodeRecord::Event(read_body::<EventRecord>(tag, body)?),
        TypeTag::EventPatch => OpcodeRecord::EventPatch(read_body::<EventPatchRecord>(tag, body)?),
        TypeTag::Result => OpcodeRecord::Result(read_body::<ResultRecord>(tag, body)?),
        TypeTag::Moneyline => OpcodeRecord::Moneyline(read_body::<MoneylineRecord>(tag, body)?),
        TypeTag::Spread => OpcodeRecord::Spread(read_body::<SpreadRecord>(tag, body)?),
        TypeTag::Total => OpcodeRecord::Total(read_body::<TotalRecord>(tag, body)?),
    };

    Ok(record)
}

/// Decode a hex string, as found in RPC output
pub fn decode_hex(data: &str) -> OpcodeResult<OpcodeRecord> {
    let bytes = hex::decode(data.trim()).map_err(|e| MalformedOpcode::InvalidField {
        field: "hex",
        detail: e.to_string(),
    })?;
    decode(&bytes)
}

fn check_body_len(tag: TypeTag, body: &[u8]) -> OpcodeResult<()> {
    let min = tag.min_body_len();
    if body.len() < min {
        return Err(MalformedOpcode::Truncated {
            needed: HEADER_LEN + min,
            found: HEADER_LEN + body.len(),
        }
        .into());
    }
    if let Some(expected) = tag.body_len() {
        if body.len() != expected {
            return Err(MalformedOpcode::LengthMismatch {
                tag,
                expected,
                found: body.len(),
            }
            .into());
        }
    }
    Ok(())
}

fn read_body<T: BorshDeserialize>(tag: TypeTag, body: &[u8]) -> OpcodeResult<T> {
    T::try_from_slice(body).map_err(|e| {
        MalformedOpcode::InvalidField {
            field: tag.name(),
            detail: e.to_string(),
        }
        .into()
    })
}

fn read_mapping(body: &[u8]) -> OpcodeResult<MappingRecord> {
    let (head, name) = body.split_at(MAPPING_HEADER_LEN);
    let header = MappingHeader::try_from_slice(head).map_err(|e| MalformedOpcode::InvalidField {
        field: "mapping_type",
        detail: e.to_string(),
    })?;
    let name = std::str::from_utf8(name).map_err(|e| MalformedOpcode::InvalidField {
        field: "name",
        detail: e.to_string(),
    })?;

    Ok(MappingRecord {
        index: header.index,
        mapping_id: header.mapping_id,
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::records::{MappingIndex, ResultType};

    fn moneyline() -> OpcodeRecord {
        OpcodeRecord::Moneyline(MoneylineRecord {
            event_id: 111,
            home_odds: 19_000,
            away_odds: 21_000,
            draw_odds: 34_000,
        })
    }

    #[test]
    fn test_moneyline_layout() {
        let bytes = encode(&moneyline()).unwrap();
        assert_eq!(
            hex::encode(&bytes),
            "2a0105\
             6f000000\
             384a0000\
             08520000\
             d0840000"
        );
        assert_eq!(decode(&bytes).unwrap(), moneyline());
    }

    #[test]
    fn test_result_layout() {
        let record = OpcodeRecord::Result(ResultRecord {
            event_id: 42,
            result_type: ResultType::EventRefund,
            home_score: 30,
            away_score: 0x0102,
        });
        let bytes = encode(&record).unwrap();
        assert_eq!(bytes, vec![0x2a, 0x01, 0x04, 42, 0, 0, 0, 0x02, 30, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_spread_points_are_signed() {
        let record = OpcodeRecord::Spread(SpreadRecord {
            event_id: 1,
            spread_points: -35,
            home_odds: 18_500,
            away_odds: 19_500,
        });
        let bytes = encode(&record).unwrap();
        // -35 as i16 little-endian
        assert_eq!(&bytes[7..9], &[0xdd, 0xff]);
        assert_eq!(decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_mapping_name_fills_remaining_bytes() {
        let record = OpcodeRecord::Mapping(MappingRecord {
            index: MappingIndex::Sports,
            mapping_id: 111,
            name: "Football".to_string(),
        });
        let bytes = encode(&record).unwrap();
        assert_eq!(&bytes[..8], &[0x2a, 0x01, 0x01, 0x01, 111, 0, 0, 0]);
        assert_eq!(&bytes[8..], b"Football");
        assert_eq!(decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_oversized_mapping_name_is_range_error() {
        let record = OpcodeRecord::Mapping(MappingRecord {
            index: MappingIndex::Teams,
            mapping_id: 1,
            name: "x".repeat(MAX_OPCODE_BYTES),
        });
        let err = encode(&record).unwrap_err();
        assert!(matches!(err, OpcodeError::EncodingRange { field: "name", .. }));
    }

    #[test]
    fn test_empty_input() {
        let err = decode(&[]).unwrap_err();
        assert_eq!(
            err,
            OpcodeError::Malformed(MalformedOpcode::Truncated { needed: 3, found: 0 })
        );
    }

    #[test]
    fn test_bad_prefix() {
        let mut bytes = encode(&moneyline()).unwrap();
        bytes[0] = 0x42;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            OpcodeError::Malformed(MalformedOpcode::BadPrefix(0x42))
        );
    }

    #[test]
    fn test_version_zero_is_malformed() {
        let mut bytes = encode(&moneyline()).unwrap();
        bytes[1] = 0;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            OpcodeError::Malformed(MalformedOpcode::InvalidVersion(0))
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&moneyline()).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            OpcodeError::Malformed(MalformedOpcode::LengthMismatch { expected: 16, found: 17, .. })
        ));
    }

    #[test]
    fn test_invalid_result_type_rejected() {
        let mut bytes = encode(&OpcodeRecord::Result(ResultRecord {
            event_id: 1,
            result_type: ResultType::Payout,
            home_score: 0,
            away_score: 0,
        }))
        .unwrap();
        bytes[7] = 9;
        let err = decode(&bytes).unwrap_err();
        assert!(err.is_malformed());
        assert!(matches!(err, OpcodeError::Malformed(MalformedOpcode::InvalidField { field: "result", .. })));
    }

    #[test]
    fn test_invalid_utf8_name_rejected() {
        let bytes = [0x2a, 0x01, 0x01, 0x03, 1, 0, 0, 0, 0xff, 0xfe];
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            OpcodeError::Malformed(MalformedOpcode::InvalidField { field: "name", .. })
        ));
    }

    #[test]
    fn test_hex_helpers() {
        let hex_str = encode_hex(&moneyline()).unwrap();
        assert_eq!(decode_hex(&hex_str).unwrap(), moneyline());
        assert!(decode_hex("zz").unwrap_err().is_malformed());
    }

    #[test]
    fn test_looks_like_opcode() {
        assert!(looks_like_opcode(&[0x2a, 0x01, 0x05]));
        assert!(!looks_like_opcode(&[0x2a, 0x01]));
        assert!(!looks_like_opcode(&[0x6a, 0x01, 0x05]));
    }
}
