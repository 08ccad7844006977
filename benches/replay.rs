use criterion::{criterion_group, criterion_main, Criterion};
use exposure::{Engine, EngineConfig, Event, EventKind, EventLog, PolicyKind, Timestamp};
use std::hint::black_box;

/// Deterministic synthetic log: `population` humans meeting in a rotating
/// round-robin over `days` days, with a sprinkle of symptom onsets and
/// positive tests so the gossip and clustering paths stay warm.
fn synthetic_log(population: usize, days: i64) -> Vec<Event> {
    let names: Vec<String> = (0..population).map(|i| format!("h{i:04}")).collect();
    let mut events = Vec::new();
    for day in 0..days {
        for i in 0..population {
            let j = (i + 1 + (day as usize % (population - 1))) % population;
            events.push(Event {
                human: names[i].clone(),
                time: Timestamp::from_days(day),
                kind: EventKind::Encounter {
                    duration_min: 10,
                    distance_m: 1.0,
                    counterpart: Some(names[j].clone()),
                },
            });
        }
    }
    for (i, name) in names.iter().enumerate() {
        if i % 7 == 0 {
            events.push(Event {
                human: name.clone(),
                time: Timestamp::from_days((i as i64) % days),
                kind: EventKind::SymptomStart {
                    reported_symptoms: vec!["moderate".to_string(), "cough".to_string()],
                },
            });
        }
        if i % 23 == 0 {
            events.push(Event {
                human: name.clone(),
                time: Timestamp::from_days((i as i64) % days),
                kind: EventKind::Test { positive: true },
            });
        }
    }
    events
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    for policy in [
        PolicyKind::Overwrite,
        PolicyKind::MonotoneMax,
        PolicyKind::Clustered,
    ] {
        group.bench_function(format!("200x30_{policy:?}"), |b| {
            b.iter(|| {
                let log = EventLog::partition(black_box(synthetic_log(200, 30))).unwrap();
                let config = EngineConfig {
                    policy,
                    ..EngineConfig::default()
                };
                let mut engine = Engine::new(log, config).unwrap();
                engine.run().len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_replay);
criterion_main!(benches);
