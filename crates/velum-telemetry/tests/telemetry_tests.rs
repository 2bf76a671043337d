//! Integration tests for velum-telemetry.

use velum_telemetry::bus::EventBus;
use velum_telemetry::events::{EventKind, TrackerEvent};
use velum_telemetry::sinks::{EventSink, TallySink, TracingSink};

#[test]
fn emit_dispatches_synchronously() {
    let mut bus = EventBus::new();
    let sink = TallySink::new();
    let tally = sink.tally();
    bus.add_sink(Box::new(sink));

    bus.emit(TrackerEvent::new(
        0,
        EventKind::ProximityPass {
            candidates: 12,
            impulses: 3,
        },
    ));
    bus.emit(TrackerEvent::new(
        0,
        EventKind::CollisionPass {
            pass: 0,
            resolved: 2,
            overflow: false,
        },
    ));

    // No flush step: the sink saw both events as they were emitted.
    let tally = tally.borrow();
    assert_eq!(tally.proximity_candidates, 12);
    assert_eq!(tally.proximity_impulses, 3);
    assert_eq!(tally.collision_passes, 1);
    assert_eq!(tally.collisions_resolved, 2);
}

#[test]
fn disabled_bus_drops_events() {
    let mut bus = EventBus::new();
    let sink = TallySink::new();
    let tally = sink.tally();
    bus.add_sink(Box::new(sink));
    bus.set_enabled(false);

    bus.emit(TrackerEvent::new(
        0,
        EventKind::CandidateOverflow {
            queue_len: 1_000_001,
        },
    ));

    assert!(!bus.is_enabled());
    assert_eq!(tally.borrow().candidate_overflows, 0);
}

#[test]
fn tally_aggregates_across_steps() {
    let mut sink = TallySink::new();
    let shared = sink.tally();

    sink.handle(&TrackerEvent::new(
        3,
        EventKind::PinchAttempt {
            vertex: 9,
            components: 2,
            committed: true,
        },
    ));
    sink.handle(&TrackerEvent::new(
        4,
        EventKind::PinchAttempt {
            vertex: 9,
            components: 2,
            committed: false,
        },
    ));
    sink.handle(&TrackerEvent::new(
        4,
        EventKind::IntersectionCheck {
            intersections: 0,
            predicted: true,
        },
    ));

    assert_eq!(sink.name(), "tally_sink");
    let tally = shared.borrow();
    assert_eq!(tally.pinches_attempted, 2);
    assert_eq!(tally.pinches_committed, 1);
    assert_eq!(tally.intersection_checks, 1);
    assert_eq!(tally.intersections_found, 0);
}

#[test]
fn multiple_sinks_each_receive() {
    let mut bus = EventBus::new();
    let first = TallySink::new();
    let second = TallySink::new();
    let tally_a = first.tally();
    let tally_b = second.tally();
    bus.add_sink(Box::new(first));
    bus.add_sink(Box::new(second));
    assert_eq!(bus.sink_count(), 2);

    bus.emit(TrackerEvent::new(
        1,
        EventKind::CandidateOverflow { queue_len: 7 },
    ));

    assert_eq!(tally_a.borrow().candidate_overflows, 1);
    assert_eq!(tally_b.borrow().candidate_overflows, 1);
    bus.finish();
}

#[test]
fn tracing_sink_handles_every_kind() {
    // Smoke test: severity routing must not panic for any variant.
    let mut sink = TracingSink;
    for kind in [
        EventKind::ProximityPass {
            candidates: 1,
            impulses: 1,
        },
        EventKind::CollisionPass {
            pass: 0,
            resolved: 1,
            overflow: true,
        },
        EventKind::CandidateOverflow { queue_len: 2 },
        EventKind::PinchAttempt {
            vertex: 0,
            components: 2,
            committed: false,
        },
        EventKind::IntersectionCheck {
            intersections: 1,
            predicted: false,
        },
    ] {
        sink.handle(&TrackerEvent::new(0, kind));
    }
    assert_eq!(sink.name(), "tracing_sink");
}

#[test]
fn event_serialization() {
    let event = TrackerEvent::new(
        5,
        EventKind::IntersectionCheck {
            intersections: 0,
            predicted: true,
        },
    );
    let json = serde_json::to_string(&event).unwrap();
    let recovered: TrackerEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered.step, 5);
    assert!(json.contains("predicted"));
}
