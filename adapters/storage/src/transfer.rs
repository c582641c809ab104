//! Single-line share string for an editor board.
//!
//! The encoded form is `fox:v1:<width>x<height>:<payload>` where the payload
//! is the base64 of the JSON tiles listing. Dimensions travel outside the
//! payload so a receiving client can show them before decoding anything.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use foxtrot_core::{BoardRecord, TileRecord, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TRANSFER_DOMAIN: &str = "fox";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded board payload.
pub const TRANSFER_HEADER: &str = "fox:v1";
/// Delimiter separating the prefix, board dimensions and payload.
const FIELD_DELIMITER: char = ':';

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct TransferPayload {
    tiles: Vec<TileRecord>,
}

/// Encodes a board record into a single-line string suitable for clipboard
/// transfer.
#[must_use]
pub fn encode_board(record: &BoardRecord) -> String {
    let payload = TransferPayload {
        tiles: record.tiles.clone(),
    };
    let json = serde_json::to_vec(&payload).expect("board payload serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    format!(
        "{TRANSFER_HEADER}:{}x{}:{encoded}",
        record.width, record.height
    )
}

/// Decodes a board record from its string representation.
///
/// Dimensions are validated against the editor bounds so a decoded board is
/// always usable as-is.
pub fn decode_board(value: &str) -> Result<BoardRecord, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
    let version = parts.next().ok_or(TransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(TransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(TransferError::InvalidEncoding)?;
    let decoded: TransferPayload =
        serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

    Ok(BoardRecord {
        tiles: decoded.tiles,
        width,
        height,
    })
}

/// Errors that can occur while decoding board transfer strings.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer payload was empty")]
    EmptyPayload,
    /// The encoded board was missing the prefix segment.
    #[error("transfer string is missing the prefix")]
    MissingPrefix,
    /// The encoded board did not contain a version segment.
    #[error("transfer string is missing the version")]
    MissingVersion,
    /// The encoded board did not include board dimensions.
    #[error("transfer string is missing the board dimensions")]
    MissingDimensions,
    /// The encoded board did not include the payload segment.
    #[error("transfer string is missing the payload")]
    MissingPayload,
    /// The encoded board used an unexpected prefix segment.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded board used an unsupported version identifier.
    #[error("transfer version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The board dimensions could not be parsed from the encoded string.
    #[error("could not parse board dimensions '{0}'")]
    InvalidDimensions(String),
    /// The board dimensions fall outside the editor bounds.
    #[error("board dimensions {width}x{height} fall outside {MIN_BOARD_SIZE}..={MAX_BOARD_SIZE}")]
    DimensionsOutOfBounds {
        /// Width carried by the transfer string.
        width: u32,
        /// Height carried by the transfer string.
        height: u32,
    },
    /// The base64 payload could not be decoded.
    #[error("could not decode transfer payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse transfer payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let (width, height) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    let in_bounds = |value: u32| (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&value);
    if !in_bounds(width) || !in_bounds(height) {
        return Err(TransferError::DimensionsOutOfBounds { width, height });
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::{decode_board, encode_board, TransferError, TRANSFER_HEADER};
    use foxtrot_core::{BoardRecord, Pawn, TileRecord, TileType};

    fn sample_record() -> BoardRecord {
        BoardRecord {
            tiles: vec![
                TileRecord {
                    tile_type: TileType::Empty,
                    pawn: Some(Pawn::Fox),
                    edges: 0b1010,
                    x: 0,
                    y: 0,
                },
                TileRecord {
                    tile_type: TileType::Goal,
                    pawn: None,
                    edges: 0,
                    x: 2,
                    y: 1,
                },
            ],
            width: 4,
            height: 3,
        }
    }

    #[test]
    fn round_trip_empty_board() {
        let record = BoardRecord {
            tiles: Vec::new(),
            width: 3,
            height: 3,
        };

        let encoded = encode_board(&record);
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:3x3:")));

        let decoded = decode_board(&encoded).expect("board decodes");
        assert_eq!(decoded, record);
    }

    #[test]
    fn round_trip_populated_board() {
        let record = sample_record();

        let encoded = encode_board(&record);
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:4x3:")));

        let decoded = decode_board(&encoded).expect("board decodes");
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_blank_input() {
        assert!(matches!(decode_board("   "), Err(TransferError::EmptyPayload)));
    }

    #[test]
    fn decode_rejects_foreign_prefixes_and_versions() {
        assert!(matches!(
            decode_board("owl:v1:3x3:e30"),
            Err(TransferError::InvalidPrefix(prefix)) if prefix == "owl",
        ));
        assert!(matches!(
            decode_board("fox:v2:3x3:e30"),
            Err(TransferError::UnsupportedVersion(version)) if version == "v2",
        ));
    }

    #[test]
    fn decode_rejects_malformed_or_out_of_bounds_dimensions() {
        assert!(matches!(
            decode_board("fox:v1:3by3:e30"),
            Err(TransferError::InvalidDimensions(_)),
        ));
        assert!(matches!(
            decode_board("fox:v1:2x3:e30"),
            Err(TransferError::DimensionsOutOfBounds { width: 2, height: 3 }),
        ));
        assert!(matches!(
            decode_board("fox:v1:3x40:e30"),
            Err(TransferError::DimensionsOutOfBounds { width: 3, height: 40 }),
        ));
    }

    #[test]
    fn decode_rejects_broken_payloads() {
        assert!(matches!(
            decode_board("fox:v1:3x3:!!!"),
            Err(TransferError::InvalidEncoding(_)),
        ));
        // "bm90anNvbg" is base64 for "notjson".
        assert!(matches!(
            decode_board("fox:v1:3x3:bm90anNvbg"),
            Err(TransferError::InvalidPayload(_)),
        ));
        assert!(matches!(
            decode_board("fox:v1:3x3"),
            Err(TransferError::MissingPayload),
        ));
    }
}
