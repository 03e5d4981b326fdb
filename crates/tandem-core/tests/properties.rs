//! Property-based tests for the clock, the priority order and the codec.
//!
//!  - The clock never decreases and always ends up past every timestamp seen
//!  - Priority is a strict total order: exactly one of two distinct stamps wins
//!  - Every encodable message decodes back to itself
//!  - A timestamp that decodes can always be observed without saturating

use proptest::prelude::*;
use tandem_core::{LamportClock, Message, NodeId, ParseError, RequestStamp, MAX_TIMESTAMP};

#[derive(Clone, Debug)]
enum ClockEvent {
    Tick,
    Observe(u64),
}

fn clock_event_strategy() -> impl Strategy<Value = ClockEvent> {
    prop_oneof![
        Just(ClockEvent::Tick),
        (0u64..10_000).prop_map(ClockEvent::Observe),
    ]
}

fn stamp_strategy() -> impl Strategy<Value = RequestStamp> {
    (0u64..50, 1u32..4).prop_map(|(ts, id)| RequestStamp::new(ts, NodeId(id)))
}

fn message_strategy() -> impl Strategy<Value = Message> {
    prop_oneof![
        (0..=MAX_TIMESTAMP, any::<u32>()).prop_map(|(timestamp, id)| Message::Request {
            timestamp,
            from: NodeId(id)
        }),
        (0..=MAX_TIMESTAMP, any::<u32>()).prop_map(|(timestamp, id)| Message::Reply {
            timestamp,
            from: NodeId(id)
        }),
        (proptest::option::of(0..=MAX_TIMESTAMP), any::<u32>()).prop_map(|(timestamp, id)| {
            Message::Release {
                timestamp,
                from: NodeId(id),
            }
        }),
    ]
}

proptest! {
    #[test]
    fn prop_clock_monotonic_and_past_every_seen(events in prop::collection::vec(clock_event_strategy(), 0..64)) {
        let mut clock = LamportClock::new();
        let mut max_seen = 0u64;
        let mut previous = clock.now();

        for event in events {
            match event {
                ClockEvent::Tick => {
                    let sent = clock.tick();
                    prop_assert_eq!(sent, clock.now());
                }
                ClockEvent::Observe(ts) => {
                    max_seen = max_seen.max(ts);
                    clock.observe(ts);
                    prop_assert!(clock.now() > max_seen);
                }
            }
            prop_assert!(clock.now() > previous);
            previous = clock.now();
        }
    }

    #[test]
    fn prop_priority_is_strict_total_order(a in stamp_strategy(), b in stamp_strategy()) {
        if a == b {
            prop_assert!(!a.has_priority_over(&b));
        } else {
            prop_assert!(a.has_priority_over(&b) ^ b.has_priority_over(&a));
        }
    }

    #[test]
    fn prop_priority_compares_timestamp_first(ts_a in 0u64..100, ts_b in 0u64..100, id_a in 1u32..10, id_b in 1u32..10) {
        let a = RequestStamp::new(ts_a, NodeId(id_a));
        let b = RequestStamp::new(ts_b, NodeId(id_b));
        let expected = ts_a < ts_b || (ts_a == ts_b && id_a < id_b);
        prop_assert_eq!(a.has_priority_over(&b), expected);
    }

    #[test]
    fn prop_codec_decodes_what_it_encodes(msg in message_strategy()) {
        let line = format!("{}\n", msg);
        prop_assert_eq!(Message::parse(&line).unwrap(), msg);
    }

    #[test]
    fn prop_decoded_timestamps_keep_clock_ahead(ts in any::<u64>(), start in 0u64..1_000_000) {
        let line = format!("REQUEST {} 2", ts);
        match Message::parse(&line) {
            Ok(msg) => {
                let mut clock = LamportClock::starting_at(start);
                clock.observe(msg.timestamp().unwrap());
                prop_assert!(clock.now() > ts);
            }
            Err(e) => {
                prop_assert!(ts > MAX_TIMESTAMP);
                prop_assert_eq!(e, ParseError::TimestampOutOfRange { tag: "REQUEST", value: ts });
            }
        }
    }

    #[test]
    fn prop_parse_never_panics(line in "\\PC{0,40}") {
        let _ = Message::parse(&line);
    }
}
