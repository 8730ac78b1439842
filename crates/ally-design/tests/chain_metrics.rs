//! Chain execution metrics.
//!
//! Chains run under a thread local Prometheus recorder and the rendered
//! exposition is checked for the execution counter of every outcome.

use ally_design::prelude::*;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const MODE: Attribute<String> = Attribute::new("mode");

fn request() -> ContextSpec {
    ContextSpec::argument("request")
}

fn outcome() -> impl Processor {
    FnProcessor::new("outcome", vec![request().requires(&MODE)], |chain| {
        let mode = chain.arg("request")?.require(&MODE)?.clone();
        match mode.as_str() {
            "cancel" => chain.cancel(),
            "abort" => return Err(Abort::new("forbidden").into()),
            "fail" => return Err(ProcessError::devel("broken")),
            _ => {}
        }
        Ok(())
    })
}

fn processing() -> Processing {
    let mut assembly = Assembly::new("metered");
    assembly.add(outcome()).unwrap();
    Processing::builder(&assembly)
        .source(request().defines(&MODE))
        .build()
        .unwrap()
}

fn run_modes(processing: &Processing, modes: &[&str]) -> PrometheusHandle {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        for mode in modes {
            let mut request = processing.new_context("request").unwrap();
            request.set(&MODE, (*mode).to_string()).unwrap();
            let _ = tokio_test::block_on(processing.execute(Contexts::new().with(request)));
        }
    });
    handle
}

fn executions(rendered: &str, outcome: &str) -> Option<u64> {
    let label = format!("outcome=\"{outcome}\"");
    rendered
        .lines()
        .filter(|line| line.starts_with("ally_chain_executions_total{"))
        .filter(|line| line.contains("processing=\"metered\"") && line.contains(&label))
        .find_map(|line| line.rsplit(' ').next()?.parse().ok())
}

#[test]
fn test_completed_and_aborted_chains_are_counted() {
    let processing = processing();
    let rendered = run_modes(&processing, &["run", "run", "abort"]).render();

    assert_eq!(executions(&rendered, "completed"), Some(2));
    assert_eq!(executions(&rendered, "aborted"), Some(1));
    assert_eq!(executions(&rendered, "failed"), None);
    assert!(rendered.contains("ally_chain_duration_seconds"));
}

#[test]
fn test_cancelled_and_failed_chains_are_counted() {
    let processing = processing();
    let rendered = run_modes(&processing, &["cancel", "fail"]).render();

    assert_eq!(executions(&rendered, "cancelled"), Some(1));
    assert_eq!(executions(&rendered, "failed"), Some(1));
    assert_eq!(executions(&rendered, "completed"), None);
}

#[test]
fn test_chains_without_recorder_are_not_counted() {
    let processing = processing();
    let handle = run_modes(&processing, &[]);
    let mut request = processing.new_context("request").unwrap();
    request.set(&MODE, "run".to_string()).unwrap();
    tokio_test::block_on(processing.execute(Contexts::new().with(request))).unwrap();

    assert_eq!(executions(&handle.render(), "completed"), None);
}
