//! `tamon <transport-file>`
//!
//! Follows the shared log written by a trace producer and runs one monitor
//! per configured automaton description over it. Monitors stop according to
//! the configured stop policy; the process exits with 0 once all of them
//! have stopped and with 1 on any transport, record or specification error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tamon::settings::{Output, Settings, TruthKind};
use tamon::transport::{self, Cursor};
use tamon::{Degree, Monitor, MonitorError, Result, Table, Truth};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(transport) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("Did not specify shared file name for reading");
        eprintln!("usage: tamon <transport-file>");
        return ExitCode::from(2);
    };
    match run(&transport) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "monitoring aborted");
            eprintln!("tamon: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(transport: &Path) -> Result<()> {
    if !transport.is_file() {
        return Err(MonitorError::Transport(format!(
            "cannot open {}",
            transport.display()
        )));
    }
    let settings = Settings::load()?;
    if settings.specifications.is_empty() {
        return Err(MonitorError::Config(
            "no specifications configured, set specifications in tamon.toml or TAMON_SPECIFICATIONS"
                .into(),
        ));
    }
    let mut tables = Vec::with_capacity(settings.specifications.len());
    for path in &settings.specifications {
        let text = fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let table = Table::parse(&text)?;
        info!(
            path = %path.display(),
            automaton = table.name(),
            modes = table.mode_count(),
            rules = table.rule_count(),
            "specification loaded"
        );
        tables.push(Arc::new(table));
    }
    info!(
        transport = %transport.display(),
        truth = ?settings.truth,
        monitors = tables.len(),
        "monitoring"
    );
    match settings.truth {
        TruthKind::Boolean => watch::<bool>(transport, &settings, tables),
        TruthKind::Quantitative => watch::<Degree>(transport, &settings, tables),
    }
}

fn watch<T: Truth>(transport: &Path, settings: &Settings, tables: Vec<Arc<Table>>) -> Result<()> {
    let mut instances: Vec<(Monitor<T>, Cursor)> = tables
        .into_iter()
        .map(|table| {
            let substitutions = settings.substitutions(&table);
            let monitor = Monitor::new(table, settings.monitor_options(), substitutions);
            (monitor, Cursor::new())
        })
        .collect();
    loop {
        let mut running = 0;
        for (monitor, cursor) in instances.iter_mut() {
            if monitor.should_stop() {
                continue;
            }
            running += 1;
            let mut record = transport::poll_record(transport, cursor, settings.poll_interval())?;
            record.alias(&settings.aliases);
            let (delta_env, delta_sys) = record.delays()?;
            monitor.advance(delta_env, delta_sys);
            let snapshot = settings.display_snapshot.then(|| record.to_string());
            monitor.step(record)?;
            match settings.output {
                Output::Text => {
                    println!("---- [{}] {}", monitor.iteration(), monitor.table().name());
                    if let Some(snapshot) = snapshot {
                        println!("{}", snapshot);
                    }
                    println!("{}", monitor.render(settings.display_traces));
                }
                Output::Json => {
                    let report = serde_json::to_string(&monitor.report())
                        .map_err(|e| MonitorError::Evaluation(e.to_string()))?;
                    println!("{}", report);
                }
            }
            if monitor.should_stop() {
                info!(
                    automaton = monitor.table().name(),
                    verdict = %monitor.verdict(),
                    iteration = monitor.iteration(),
                    "monitor stopped"
                );
            }
        }
        if running == 0 {
            return Ok(());
        }
    }
}
