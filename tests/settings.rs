use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tamon::clock::{Retention, StalePolicy};
use tamon::settings::{Output, Settings, TruthKind};
use tamon::{Norm, Table};

fn setup(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tamon_{}_{}.toml", name, std::process::id()));
    fs::write(&path, contents).expect("settings written");
    path
}

#[test]
fn defaults_apply_without_a_file() {
    let settings = Settings::from_sources("tamon_settings_that_do_not_exist").expect("defaults");
    assert_eq!(settings, Settings::default());
    assert!(settings.deduplicate);
    assert!(settings.stop_on_empty);
    assert_eq!(settings.retention, Retention::Latest);
    assert_eq!(settings.truth, TruthKind::Boolean);
    assert_eq!(settings.norm, Norm::Godel);
    assert_eq!(settings.stale, StalePolicy::Skip);
    assert_eq!(settings.poll_interval(), Duration::from_millis(100));
    assert_eq!(settings.output, Output::Text);
}

#[test]
fn file_values_override_defaults() {
    let path = setup(
        "override",
        r#"
specifications = ["demos/nondet_ecs.ta"]
deduplicate = false
retention = "unbounded"
truth = "quantitative"
norm = "lukasiewicz"
stale = "zero"
poll_interval_ms = 5
output = "json"

[tolerances]
timer = 20
"#,
    );
    let settings = Settings::from_sources(path.to_str().expect("utf-8 path")).expect("settings load");
    assert_eq!(settings.specifications, vec![PathBuf::from("demos/nondet_ecs.ta")]);
    assert!(!settings.deduplicate);
    assert!(settings.stop_on_empty);
    assert_eq!(settings.retention, Retention::Unbounded);
    assert_eq!(settings.truth, TruthKind::Quantitative);
    assert_eq!(settings.output, Output::Json);

    let options = settings.monitor_options();
    assert_eq!(options.norm, Norm::Lukasiewicz);
    assert_eq!(options.retention, Retention::Unbounded);
    assert_eq!(options.stale, StalePolicy::Zero);

    let table = Table::parse(include_str!("../demos/nondet_ecs.ta")).expect("parses");
    let substitutions = settings.substitutions(&table);
    assert_eq!(substitutions.len(), 1);
    assert!(substitutions.get(table.clock_id("timer").expect("timer")).is_some());
    // the drain automaton has no timer, so nothing is registered for it
    let drain = Table::parse(include_str!("../demos/drain.ta")).expect("parses");
    assert!(settings.substitutions(&drain).is_empty());
    let _ = fs::remove_file(&path);
}
