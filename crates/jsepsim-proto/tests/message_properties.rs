//! Property-based tests for descriptions and the signaling envelope.
//!
//! Decoding must be total over arbitrary input, and the origin a peer embeds in
//! a description must be recoverable whichever path the description takes.

use jsepsim_proto::{
    DescriptionKind, IceCandidate, PeerId, SessionDescription, SignalingMessage,
};
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = DescriptionKind> {
    prop_oneof![Just(DescriptionKind::Offer), Just(DescriptionKind::Answer)]
}

proptest! {
    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn prop_decode_is_total(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = SignalingMessage::decode(&bytes);
    }

    /// Text produced by a peer always yields the same origin when re-parsed,
    /// even after candidates are appended.
    #[test]
    fn prop_origin_survives_text_and_candidates(
        kind in kind_strategy(),
        raw_id in any::<u64>(),
        streams in 0usize..64,
        candidates in 0usize..4,
    ) {
        let mut desc = SessionDescription::new(kind, PeerId::new(raw_id), streams);
        for _ in 0..candidates {
            desc.add_candidate(&IceCandidate::fake());
        }

        let reparsed = SessionDescription::from_sdp(kind, desc.to_sdp());
        prop_assert_eq!(reparsed.origin(), Some(PeerId::new(raw_id)));
        prop_assert_eq!(reparsed.stream_count(), streams);
    }

    /// Text without an origin marker never produces an origin.
    #[test]
    fn prop_text_without_marker_has_no_origin(text in "[a-z=:\\r\\n ]{0,80}") {
        prop_assume!(!text.contains(" from "));
        let desc = SessionDescription::from_sdp(DescriptionKind::Offer, text);
        prop_assert_eq!(desc.origin(), None);
    }
}
