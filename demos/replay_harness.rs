//! Replay a small synthetic encounter log under each diffusion policy and
//! dump the outputs: per-day risk rows, plus the per-human cluster tables
//! from the clustered run.
//!
//! Run with `cargo run --example replay_harness`.

use exposure::{Engine, EngineConfig, Event, EventKind, EventLog, PolicyKind, Timestamp};

fn encounter_pair(a: &str, b: &str, day: i64) -> Vec<Event> {
    let one = |human: &str, other: &str| Event {
        human: human.to_string(),
        time: Timestamp::from_days(day),
        kind: EventKind::Encounter {
            duration_min: 15,
            distance_m: 1.2,
            counterpart: Some(other.to_string()),
        },
    };
    vec![one(a, b), one(b, a)]
}

fn build_log() -> Vec<Event> {
    let mut events = vec![
        Event {
            human: "bo".to_string(),
            time: Timestamp::from_days(1),
            kind: EventKind::SymptomStart {
                reported_symptoms: vec!["moderate".to_string(), "cough".to_string()],
            },
        },
        Event {
            human: "cleo".to_string(),
            time: Timestamp::from_days(2),
            kind: EventKind::Test { positive: true },
        },
        Event {
            human: "cleo".to_string(),
            time: Timestamp::from_days(2),
            kind: EventKind::SymptomStart {
                reported_symptoms: vec!["severe".to_string()],
            },
        },
        Event {
            human: "bo".to_string(),
            time: Timestamp::from_days(8),
            kind: EventKind::Recovered { death: false },
        },
    ];
    for day in 0..10 {
        events.extend(encounter_pair("ada", "bo", day));
        if day % 2 == 0 {
            events.extend(encounter_pair("bo", "cleo", day));
        }
        if day % 3 == 0 {
            events.extend(encounter_pair("cleo", "dev", day));
        }
    }
    events
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    for policy in [
        PolicyKind::Overwrite,
        PolicyKind::MonotoneMax,
        PolicyKind::Clustered,
    ] {
        let log = EventLog::partition(build_log())?;
        let config = EngineConfig {
            policy,
            transmission_probability: 0.25,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(log, config)?;
        engine.run();

        let (first, last) = engine.days();
        println!("== {policy:?}: {} humans, days {first}..{last}", engine.population());
        let final_day = last - 1;
        for row in engine.risk_table().day(final_day) {
            println!(
                "  day {} {:<6} risk {:.4} infectious={}",
                row.day, row.human, row.risk, row.is_infectious
            );
        }

        if policy == PolicyKind::Clustered {
            let clusters = engine.export_clusters();
            println!("-- cluster export --");
            println!("{}", serde_json::to_string_pretty(&clusters)?);
        }
    }
    Ok(())
}
