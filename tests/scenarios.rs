use exposure::{Engine, EngineConfig, Event, EventKind, EventLog, PolicyKind, Timestamp};

fn encounter(human: &str, other: &str, day: i64) -> Event {
    Event {
        human: human.to_string(),
        time: Timestamp::from_days(day),
        kind: EventKind::Encounter {
            duration_min: 15,
            distance_m: 1.5,
            counterpart: Some(other.to_string()),
        },
    }
}

fn encounter_pair(a: &str, b: &str, day: i64) -> Vec<Event> {
    vec![encounter(a, b, day), encounter(b, a, day)]
}

fn symptoms(human: &str, day: i64, reported: &[&str]) -> Event {
    Event {
        human: human.to_string(),
        time: Timestamp::from_days(day),
        kind: EventKind::SymptomStart {
            reported_symptoms: reported.iter().map(|s| s.to_string()).collect(),
        },
    }
}

fn positive_test(human: &str, day: i64) -> Event {
    Event {
        human: human.to_string(),
        time: Timestamp::from_days(day),
        kind: EventKind::Test { positive: true },
    }
}

fn engine(events: Vec<Event>, config: EngineConfig) -> Engine {
    Engine::new(EventLog::partition(events).unwrap(), config).unwrap()
}

fn overwrite_config() -> EngineConfig {
    EngineConfig {
        policy: PolicyKind::Overwrite,
        transmission_probability: 0.5,
        ..EngineConfig::default()
    }
}

#[test]
fn encounter_messages_arrive_with_one_day_latency() {
    // Bob reports moderate symptoms, so his shared risk quantizes to
    // exactly 0.5. Alice meets him on day 0 and must not see the message
    // before day 1.
    let mut events = vec![symptoms("bob", 0, &["moderate"])];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("carol", "dave", 2)); // extends the replay span
    let mut engine = engine(events, overwrite_config());
    engine.run();

    let table = engine.risk_table();
    let alice_day0 = table.day(0).find(|r| r.human == "alice").unwrap();
    assert_eq!(alice_day0.risk, 0.0, "day-0 row must predate the message");
    let alice_day1 = table.day(1).find(|r| r.human == "alice").unwrap();
    assert_eq!(alice_day1.risk, 0.25, "0.5 quantized × 0.5 transmission");
}

#[test]
fn risk_table_covers_every_human_every_day() {
    let mut events = Vec::new();
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("bob", "carol", 1));
    events.extend(encounter_pair("alice", "carol", 3));
    let mut engine = engine(events, EngineConfig::default());
    engine.run();

    assert_eq!(engine.days(), (0, 3));
    assert_eq!(engine.population(), 3);
    assert_eq!(engine.risk_table().len(), 9);
    for day in 0..3 {
        assert_eq!(engine.risk_table().day(day).count(), 3);
    }
}

#[test]
fn gossip_fires_on_a_large_swing_and_reaches_past_contacts() {
    // A positive test jumps Bob's risk from 0.0 to 1.0 on day 0, well over
    // the 0.1 threshold. His day-0 contact Alice gets both the reciprocal
    // encounter message and the gossip notification.
    let mut events = vec![positive_test("bob", 0), symptoms("bob", 0, &["cough"])];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 1)); // extends the replay span
    let mut engine = engine(events, EngineConfig::default());
    assert_eq!(engine.step(), Some(0));

    assert_eq!(engine.human("alice").unwrap().inbox_len(), 2);
    assert_eq!(engine.human("bob").unwrap().inbox_len(), 1);
}

#[test]
fn swing_of_exactly_the_threshold_does_not_gossip() {
    // Two untagged symptoms put Bob's local risk at exactly 0.1, the
    // significance threshold. The trigger is strict, so no gossip.
    let mut events = vec![symptoms("bob", 0, &["cough", "fatigue"])];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 1));
    let mut engine = engine(events, EngineConfig::default());
    assert_eq!(engine.step(), Some(0));

    assert_eq!(engine.human("alice").unwrap().inbox_len(), 1);
}

#[test]
fn gossip_requires_a_plausible_symptom_window() {
    // Same jump as the positive-test scenario, but Bob never reported
    // symptoms, so no contact passes the plausibility gate.
    let mut events = vec![positive_test("bob", 0)];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 1));
    let mut engine = engine(events, EngineConfig::default());
    assert_eq!(engine.step(), Some(0));

    assert_eq!(engine.human("alice").unwrap().inbox_len(), 1);
}

#[test]
fn severe_symptoms_hold_until_an_inbox_update_changes_them() {
    let mut events = vec![symptoms("carol", 0, &["severe"])];
    events.extend(encounter_pair("carol", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 2));
    let mut engine = engine(events, EngineConfig::default());
    engine.run();

    let table = engine.risk_table();
    let carol_day0 = table.day(0).find(|r| r.human == "carol").unwrap();
    assert_eq!(carol_day0.risk, 0.75);
    // Day 1 processes Bob's low-risk message; the monotone ratchet keeps
    // the symptom-derived estimate.
    let carol_day1 = table.day(1).find(|r| r.human == "carol").unwrap();
    assert_eq!(carol_day1.risk, 0.75);
}

#[test]
fn infectiousness_latches_on_before_symptoms_and_off_at_resolution() {
    let mut events = vec![
        symptoms("bob", 2, &["mild"]),
        Event {
            human: "bob".to_string(),
            time: Timestamp::from_days(4),
            kind: EventKind::Recovered { death: false },
        },
    ];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 6));
    let mut engine = engine(events, EngineConfig::default());
    engine.run();

    let infectious_by_day: Vec<bool> = (0..6)
        .map(|d| {
            engine
                .risk_table()
                .day(d)
                .find(|r| r.human == "bob")
                .unwrap()
                .is_infectious
        })
        .collect();
    // Symptoms on day 2 mean infectiousness from day -1, so bob is already
    // infectious on day 0; recovery on day 4 latches it off from day 5.
    assert_eq!(infectious_by_day, vec![true, true, true, true, true, false]);
}

#[test]
fn malformed_events_are_dropped_without_poisoning_the_run() {
    let mut events = vec![Event {
        human: "alice".to_string(),
        time: Timestamp::from_days(0),
        kind: EventKind::Encounter {
            duration_min: 5,
            distance_m: 2.0,
            counterpart: None,
        },
    }];
    events.extend(encounter_pair("alice", "bob", 0));
    events.extend(encounter_pair("alice", "bob", 1));
    let mut engine = engine(events, EngineConfig::default());
    engine.run();

    assert_eq!(engine.dropped_events(), 1);
    assert_eq!(engine.risk_table().len(), 2);
}

#[test]
fn replay_is_deterministic_for_identical_log_and_config() {
    let build = || {
        let mut events = vec![
            symptoms("bob", 0, &["moderate", "cough"]),
            positive_test("carol", 1),
            symptoms("carol", 1, &["severe"]),
            Event {
                human: "dave".to_string(),
                time: Timestamp::from_days(3),
                kind: EventKind::Recovered { death: true },
            },
        ];
        for day in 0..5 {
            events.extend(encounter_pair("alice", "bob", day));
            events.extend(encounter_pair("bob", "carol", day));
            events.extend(encounter_pair("carol", "dave", day));
        }
        events
    };
    let config = EngineConfig {
        policy: PolicyKind::Clustered,
        seed: 99,
        ..EngineConfig::default()
    };

    let mut first = engine(build(), config);
    let mut second = engine(build(), config);
    first.run();
    second.run();

    assert_eq!(first.risk_table(), second.risk_table());
    assert_eq!(first.export_clusters(), second.export_clusters());
}

#[test]
fn clustered_run_exports_per_human_cluster_tables() {
    let mut events = vec![symptoms("bob", 0, &["moderate"])];
    for day in 0..4 {
        events.extend(encounter_pair("alice", "bob", day));
    }
    let config = EngineConfig {
        policy: PolicyKind::Clustered,
        ..EngineConfig::default()
    };
    let mut engine = engine(events, config);
    engine.run();

    let export = engine.export_clusters();
    assert_eq!(export.len(), 2);
    let alice = export.iter().find(|h| h.human == "alice").unwrap();
    assert!(
        !alice.clusters.is_empty(),
        "processed messages must leave cluster entries behind"
    );
    // Group ids form a contiguous range from zero.
    let max_group = alice.clusters.iter().map(|c| c.assignment).max().unwrap();
    assert!((max_group as usize) < alice.clusters.len());
}
