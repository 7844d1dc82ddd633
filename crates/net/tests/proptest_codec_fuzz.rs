//! Fuzz-style property tests for the status payload and hub frame decoders
//!
//! These tests validate that decoders handle arbitrary network input
//! gracefully and that well-formed payloads survive a round trip.

use mcdash_net::{
    decode_frame, decode_status, encode_status, PlayerSummary, ServerStatus, SkinBlock,
    StatusDecodeError, SKIN_BYTES,
};
use proptest::prelude::*;

fn player_strategy() -> impl Strategy<Value = PlayerSummary> {
    (
        any::<u32>(),
        "\\PC{0,40}",
        prop::option::of(prop::collection::vec(any::<u8>(), SKIN_BYTES)),
    )
        .prop_map(|(id, name, skin)| PlayerSummary {
            id,
            name,
            skin: skin.map(|bytes| SkinBlock::from_slice(&bytes).unwrap()),
        })
}

fn status_strategy() -> impl Strategy<Value = ServerStatus> {
    (
        any::<u32>(),
        any::<u32>(),
        prop::collection::vec(player_strategy(), 0..12),
    )
        .prop_map(|(online, max, players)| ServerStatus {
            online,
            max,
            players,
        })
}

proptest! {
    /// Property: Arbitrary bytes don't crash the status decoder
    #[test]
    fn arbitrary_bytes_dont_crash_status(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_status(&random_bytes);
        // No panic = success
    }

    /// Property: Arbitrary text doesn't crash the hub decoder
    #[test]
    fn arbitrary_text_doesnt_crash_hub(text in "\\PC{0,200}") {
        let _result = decode_frame(&text);
    }

    /// Property: Buffers shorter than the header mean offline
    #[test]
    fn short_buffers_are_offline(
        random_bytes in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        prop_assert!(decode_status(&random_bytes).is_none());
    }

    /// Property: Status snapshots roundtrip
    #[test]
    fn status_roundtrips(status in status_strategy()) {
        let encoded = encode_status(&status).unwrap();
        let decoded = decode_status(&encoded).unwrap().into_result().unwrap();
        prop_assert_eq!(status, decoded);
    }

    /// Property: N skinless players decode to N players with the exact names
    #[test]
    fn skinless_players_keep_names(
        names in prop::collection::vec("\\PC{1,64}", 0..20),
    ) {
        let status = ServerStatus {
            online: names.len() as u32,
            max: 100,
            players: names
                .iter()
                .enumerate()
                .map(|(i, name)| PlayerSummary { id: i as u32, name: name.clone(), skin: None })
                .collect(),
        };
        let decoded = decode_status(&encode_status(&status).unwrap()).unwrap();
        prop_assert!(decoded.is_complete());
        prop_assert_eq!(decoded.status.players.len(), names.len());
        for (player, name) in decoded.status.players.iter().zip(&names) {
            prop_assert_eq!(&player.name, name);
        }
    }

    /// Property: Truncated payloads keep the header and never over-read
    #[test]
    fn truncated_payloads_fail_closed(
        status in status_strategy(),
        cut in 0usize..4000,
    ) {
        let encoded = encode_status(&status).unwrap();
        let cut = cut.min(encoded.len());
        match decode_status(&encoded[..cut]) {
            None => {
                prop_assert!(cut < 8);
            }
            Some(decoded) => {
                prop_assert_eq!(decoded.status.online, status.online);
                prop_assert!(decoded.status.players.len() <= status.players.len());
                for (got, want) in decoded.status.players.iter().zip(&status.players) {
                    prop_assert_eq!(got, want);
                }
                if decoded.is_complete() {
                    // A clean stop can only happen on a player boundary.
                    let reencoded = encode_status(&decoded.status).unwrap();
                    prop_assert_eq!(&reencoded[..], &encoded[..cut]);
                }
            }
        }
    }

    /// Property: Skin flag without skin bytes is reported
    #[test]
    fn missing_skin_is_reported(id in any::<u32>(), extra in 0usize..SKIN_BYTES) {
        let mut buf = vec![1, 0, 0, 0, 1, 0, 0, 0];
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&(0x8000u16 | 1).to_le_bytes());
        buf.push(b'x');
        buf.extend(std::iter::repeat(0u8).take(extra));
        let decoded = decode_status(&buf).unwrap();
        prop_assert_eq!(
            decoded.error,
            Some(StatusDecodeError::TruncatedSkin { id, needed: SKIN_BYTES, available: extra })
        );
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn header_only_scenario() {
        let decoded = decode_status(&[2, 0, 0, 0, 10, 0, 0, 0]).unwrap();
        assert_eq!(
            decoded.into_result().unwrap(),
            ServerStatus { online: 2, max: 10, players: vec![] }
        );
    }

    #[test]
    fn empty_inputs() {
        assert!(decode_status(&[]).is_none());
        assert!(decode_frame("").is_err());
    }
}
