//! Binary server status payload served by the status endpoint.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! [online: u32][max: u32] { [id: u32][len: u16][name: len & 0x7FFF bytes][skin: 192 bytes if len & 0x8000] }*
//! ```
//!
//! A payload shorter than the 8-byte header means the server is offline.

use crate::format;
use crate::skin::{SkinBlock, SKIN_BYTES};
use icu_collator::{Collator, CollatorOptions};
use thiserror::Error;
use tracing::debug;

/// Size of the `online`/`max` header.
pub const STATUS_HEADER_LEN: usize = 8;

/// Size of the per-player `id`/`len` header.
pub const PLAYER_HEADER_LEN: usize = 6;

/// Bit of the length field flagging a trailing skin block.
pub const SKIN_FLAG: u16 = 0x8000;

/// Mask extracting the name byte length from the length field.
pub const NAME_LEN_MASK: u16 = 0x7FFF;

/// Historical "unlimited capacity" marker. It does not fit the 32-bit field, so
/// [`ServerStatus::is_unlimited`] compares against [`UNLIMITED_THRESHOLD`] instead.
pub const UNLIMITED_CAPACITY: u64 = 4_294_967_296;

/// Any capacity at or above this value is treated as unlimited.
pub const UNLIMITED_THRESHOLD: u64 = u32::MAX as u64;

/// One entry of the player list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    /// Server-assigned id, unique within one snapshot.
    pub id: u32,
    /// Player name, may contain markup codes.
    pub name: String,
    /// Optional 8x8 thumbnail.
    pub skin: Option<SkinBlock>,
}

impl PlayerSummary {
    /// Entries with an empty name are not shown.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// Name with markup removed.
    pub fn plain_name(&self) -> String {
        format::strip(&self.name)
    }
}

/// One decoded status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerStatus {
    /// Players currently online.
    pub online: u32,
    /// Server capacity.
    pub max: u32,
    /// Player list in wire order.
    pub players: Vec<PlayerSummary>,
}

impl ServerStatus {
    /// Whether the capacity should be shown as unlimited.
    pub fn is_unlimited(&self) -> bool {
        u64::from(self.max) >= UNLIMITED_THRESHOLD
    }

    /// `"online/max"`, or just `"online"` when the capacity is unlimited.
    pub fn player_count_label(&self) -> String {
        if self.is_unlimited() {
            self.online.to_string()
        } else {
            format!("{}/{}", self.online, self.max)
        }
    }

    /// Valid players sorted by their plain name with root-locale collation, so case and
    /// accents only break ties (`Ålex` sorts before `bob`).
    pub fn display_players(&self) -> Vec<&PlayerSummary> {
        let mut players: Vec<(String, &PlayerSummary)> = self
            .players
            .iter()
            .filter(|player| player.is_valid())
            .map(|player| (player.plain_name(), player))
            .collect();
        match Collator::try_new(&Default::default(), CollatorOptions::new()) {
            Ok(collator) => players.sort_by(|(a, _), (b, _)| collator.compare(a, b)),
            Err(err) => {
                debug!(%err, "Collation data unavailable, sorting by lowercase name");
                players.sort_by_cached_key(|(name, _)| name.to_lowercase());
            }
        }
        players.into_iter().map(|(_, player)| player).collect()
    }

    /// Whether a valid player with `id` is part of this snapshot.
    pub fn contains_player(&self, id: u32) -> bool {
        self.players
            .iter()
            .any(|player| player.id == id && player.is_valid())
    }
}

/// Reasons a status payload could not be fully decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusDecodeError {
    /// Fewer than [`PLAYER_HEADER_LEN`] bytes left for the next player header.
    #[error("truncated player header at offset {offset}: {available} bytes left")]
    TruncatedPlayerHeader {
        /// Offset of the incomplete header.
        offset: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
    /// The declared name length runs past the end of the buffer.
    #[error("player {id}: name needs {needed} bytes, {available} available")]
    TruncatedName {
        /// Id of the player being decoded.
        id: u32,
        /// Declared name length.
        needed: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
    /// The skin flag was set but fewer than 192 bytes follow the name.
    #[error("player {id}: skin needs {needed} bytes, {available} available")]
    TruncatedSkin {
        /// Id of the player being decoded.
        id: u32,
        /// Required skin length.
        needed: usize,
        /// Bytes remaining in the buffer.
        available: usize,
    },
}

/// Result of decoding a payload that had a complete header.
///
/// When the player stream is truncated, `status` still holds the header and every player
/// decoded before the failure, and `error` says what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDecode {
    /// Everything decoded up to the end of the buffer or the first error.
    pub status: ServerStatus,
    /// Set when the player stream ended early.
    pub error: Option<StatusDecodeError>,
}

impl StatusDecode {
    /// Whether the whole buffer was consumed without error.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discard partial results: a truncated payload is an error.
    pub fn into_result(self) -> Result<ServerStatus, StatusDecodeError> {
        match self.error {
            None => Ok(self.status),
            Some(err) => Err(err),
        }
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    fn u32_le(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Decode a status payload.
///
/// Returns `None` when the buffer is shorter than the 8-byte header (server offline).
pub fn decode_status(bytes: &[u8]) -> Option<StatusDecode> {
    let mut cursor = Cursor::new(bytes);
    let online = cursor.u32_le()?;
    let max = cursor.u32_le()?;

    let mut status = ServerStatus {
        online,
        max,
        players: Vec::new(),
    };

    while cursor.remaining() > 0 {
        match decode_player(&mut cursor) {
            Ok(player) => status.players.push(player),
            Err(err) => {
                return Some(StatusDecode {
                    status,
                    error: Some(err),
                })
            }
        }
    }

    Some(StatusDecode {
        status,
        error: None,
    })
}

fn decode_player(cursor: &mut Cursor<'_>) -> Result<PlayerSummary, StatusDecodeError> {
    let offset = cursor.pos;
    let available = cursor.remaining();
    let header = cursor
        .take(PLAYER_HEADER_LEN)
        .ok_or(StatusDecodeError::TruncatedPlayerHeader { offset, available })?;
    let id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length_field = u16::from_le_bytes([header[4], header[5]]);

    let has_skin = length_field & SKIN_FLAG != 0;
    let name_len = usize::from(length_field & NAME_LEN_MASK);

    let available = cursor.remaining();
    let name_bytes = cursor.take(name_len).ok_or(StatusDecodeError::TruncatedName {
        id,
        needed: name_len,
        available,
    })?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    let skin = if has_skin {
        let available = cursor.remaining();
        let truncated = StatusDecodeError::TruncatedSkin {
            id,
            needed: SKIN_BYTES,
            available,
        };
        let bytes = cursor.take(SKIN_BYTES).ok_or(truncated.clone())?;
        Some(SkinBlock::from_slice(bytes).map_err(|_| truncated)?)
    } else {
        None
    };

    Ok(PlayerSummary { id, name, skin })
}

/// Errors produced while encoding a status payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusEncodeError {
    /// Names are limited to 15 bits of length.
    #[error("player {id}: name is {len} bytes, limit is 32767")]
    NameTooLong {
        /// Id of the offending player.
        id: u32,
        /// Name length in bytes.
        len: usize,
    },
}

/// Encode a status snapshot into the wire layout understood by [`decode_status`].
pub fn encode_status(status: &ServerStatus) -> Result<Vec<u8>, StatusEncodeError> {
    let body: usize = status
        .players
        .iter()
        .map(|p| PLAYER_HEADER_LEN + p.name.len() + p.skin.as_ref().map_or(0, |_| SKIN_BYTES))
        .sum();
    let mut out = Vec::with_capacity(STATUS_HEADER_LEN + body);
    out.extend_from_slice(&status.online.to_le_bytes());
    out.extend_from_slice(&status.max.to_le_bytes());

    for player in &status.players {
        let len = player.name.len();
        let mut length_field = u16::try_from(len)
            .ok()
            .filter(|len| *len <= NAME_LEN_MASK)
            .ok_or(StatusEncodeError::NameTooLong { id: player.id, len })?;
        if player.skin.is_some() {
            length_field |= SKIN_FLAG;
        }
        out.extend_from_slice(&player.id.to_le_bytes());
        out.extend_from_slice(&length_field.to_le_bytes());
        out.extend_from_slice(player.name.as_bytes());
        if let Some(skin) = &player.skin {
            out.extend_from_slice(skin.as_bytes());
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_bytes(id: u32, name: &str, skin: Option<&[u8]>) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        let mut len = name.len() as u16;
        if skin.is_some() {
            len |= SKIN_FLAG;
        }
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        if let Some(skin) = skin {
            out.extend_from_slice(skin);
        }
        out
    }

    #[test]
    fn short_buffer_is_offline() {
        for len in 0..STATUS_HEADER_LEN {
            assert!(decode_status(&vec![0; len]).is_none(), "len {len}");
        }
    }

    #[test]
    fn header_only_payload() {
        let decoded = decode_status(&[2, 0, 0, 0, 10, 0, 0, 0]).unwrap();
        assert!(decoded.is_complete());
        assert_eq!(
            decoded.status,
            ServerStatus {
                online: 2,
                max: 10,
                players: vec![],
            }
        );
    }

    #[test]
    fn decodes_players_with_and_without_skin() {
        let skin: Vec<u8> = (0..SKIN_BYTES as u32).map(|i| (i % 251) as u8).collect();
        let mut buf = vec![2, 0, 0, 0, 20, 0, 0, 0];
        buf.extend(player_bytes(7, "Steve", None));
        buf.extend(player_bytes(0x0102_0304, "Ålex", Some(&skin)));

        let status = decode_status(&buf).unwrap().into_result().unwrap();
        assert_eq!(status.players.len(), 2);
        assert_eq!(status.players[0].id, 7);
        assert_eq!(status.players[0].name, "Steve");
        assert!(status.players[0].skin.is_none());
        assert_eq!(status.players[1].id, 0x0102_0304);
        assert_eq!(status.players[1].name, "Ålex");
        assert_eq!(status.players[1].skin.as_ref().unwrap().as_bytes()[..], skin[..]);
    }

    #[test]
    fn truncated_name_keeps_earlier_players() {
        let mut buf = vec![2, 0, 0, 0, 20, 0, 0, 0];
        buf.extend(player_bytes(1, "first", None));
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&10u16.to_le_bytes());
        buf.extend_from_slice(b"abc");

        let decoded = decode_status(&buf).unwrap();
        assert_eq!(decoded.status.players.len(), 1);
        assert_eq!(
            decoded.error,
            Some(StatusDecodeError::TruncatedName {
                id: 2,
                needed: 10,
                available: 3,
            })
        );
        assert!(decoded.into_result().is_err());
    }

    #[test]
    fn truncated_skin_is_an_error() {
        let mut buf = vec![1, 0, 0, 0, 20, 0, 0, 0];
        buf.extend(player_bytes(1, "a", Some(&[9; 100])));
        let decoded = decode_status(&buf).unwrap();
        assert!(decoded.status.players.is_empty());
        assert!(matches!(
            decoded.error,
            Some(StatusDecodeError::TruncatedSkin { id: 1, needed: 192, available: 100 })
        ));
    }

    #[test]
    fn trailing_garbage_shorter_than_header() {
        let decoded = decode_status(&[0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3]).unwrap();
        assert!(matches!(
            decoded.error,
            Some(StatusDecodeError::TruncatedPlayerHeader { offset: 8, available: 3 })
        ));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut buf = vec![1, 0, 0, 0, 1, 0, 0, 0];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&[0xFF, b'x']);
        let status = decode_status(&buf).unwrap().into_result().unwrap();
        assert_eq!(status.players[0].name, "\u{FFFD}x");
    }

    #[test]
    fn unlimited_capacity_hides_max() {
        let mut status = ServerStatus {
            online: 3,
            max: u32::MAX,
            players: vec![],
        };
        assert!(status.is_unlimited());
        assert_eq!(status.player_count_label(), "3");

        status.max = 50;
        assert_eq!(status.player_count_label(), "3/50");
        assert!(UNLIMITED_CAPACITY > UNLIMITED_THRESHOLD);
    }

    #[test]
    fn display_order_ignores_case_and_markup() {
        let status = ServerStatus {
            online: 4,
            max: 10,
            players: vec![
                PlayerSummary { id: 1, name: "zed".into(), skin: None },
                PlayerSummary { id: 2, name: "\u{a7}cAlice".into(), skin: None },
                PlayerSummary { id: 3, name: String::new(), skin: None },
                PlayerSummary { id: 4, name: "{bold}bob".into(), skin: None },
            ],
        };
        let ids: Vec<u32> = status.display_players().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert!(status.contains_player(4));
        assert!(!status.contains_player(3));
    }

    #[test]
    fn display_order_places_accented_names_by_base_letter() {
        let status = ServerStatus {
            online: 4,
            max: 10,
            players: vec![
                PlayerSummary { id: 1, name: "Zed".into(), skin: None },
                PlayerSummary { id: 2, name: "\u{c5}lex".into(), skin: None },
                PlayerSummary { id: 3, name: "bob".into(), skin: None },
                PlayerSummary { id: 4, name: "{red}\u{e9}mile".into(), skin: None },
            ],
        };
        let names: Vec<String> = status
            .display_players()
            .iter()
            .map(|p| p.plain_name())
            .collect();
        assert_eq!(names, vec!["\u{c5}lex", "bob", "\u{e9}mile", "Zed"]);
    }

    #[test]
    fn encode_rejects_oversized_name() {
        let status = ServerStatus {
            online: 1,
            max: 1,
            players: vec![PlayerSummary {
                id: 9,
                name: "x".repeat(0x8000),
                skin: None,
            }],
        };
        assert_eq!(
            encode_status(&status),
            Err(StatusEncodeError::NameTooLong { id: 9, len: 0x8000 })
        );
    }
}
