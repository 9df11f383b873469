//! Integration tests for regional orchestration.
//!
//! These tests ensure that:
//! 1. A failing or panicking region never affects its siblings
//! 2. Timed-out regions keep the chains that finished
//! 3. The ledger follows input order whatever the completion order
//! 4. Configuration errors stop the batch before any inference

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};
use epi_rt::config::settings::EstimationSettings;
use epi_rt::core::domain::{CaseObservation, RegionId};
use epi_rt::models::sampler::SamplerArgs;
use epi_rt::preprocessing::pipeline::RegionalPipeline;
use epi_rt::services::orchestrator::{
    OrchestratorConfig, RegionStatus, RegionalOrchestrator,
};
use epi_rt::services::synthetic::SyntheticEngine;
use tokio::sync::mpsc;

// ==================== Helper Functions ====================

const SETTINGS: &str = r#"
gp = false

[cleaning]
horizon = 3

[[delays]]
mean = 1.2
mean_sd = 0.1
sd = 0.3
sd_sd = 0.05
max = 10

[sampler]
samples = 40
chains = 2
cores = 2
"#;

fn settings() -> EstimationSettings {
    EstimationSettings::from_toml_str(SETTINGS).unwrap()
}

fn region_rows(region: &str, base: f64, days: i64) -> Vec<CaseObservation> {
    let start = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
    (0..days)
        .map(|i| {
            CaseObservation::new(start + Days::days(i), (base * (0.03 * i as f64).exp()).round())
                .with_region(region)
        })
        .collect()
}

fn three_regions() -> Vec<CaseObservation> {
    let mut rows = region_rows("alpha", 40.0, 30);
    rows.extend(region_rows("beta", 80.0, 30));
    rows.extend(region_rows("gamma", 120.0, 30));
    rows
}

fn statuses(results: &[epi_rt::services::orchestrator::RegionResult]) -> Vec<RegionStatus> {
    results.iter().map(|r| r.status).collect()
}

// ==================== Isolation ====================

#[tokio::test]
async fn test_failing_region_is_isolated() {
    let engine = SyntheticEngine::new().failing(RegionId::from("beta"), "divergent transitions");
    let pipeline = RegionalPipeline::new(settings(), Arc::new(engine));

    let output = pipeline.run(&three_regions()).await.unwrap();

    assert_eq!(
        statuses(&output.results),
        vec![RegionStatus::Succeeded, RegionStatus::Failed, RegionStatus::Succeeded]
    );
    assert!(output.results[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("divergent transitions"));

    let summarised: Vec<&str> = output.summary.regions.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(summarised.len(), 2);
    assert!(summarised.contains(&"alpha"));
    assert!(summarised.contains(&"gamma"));
    assert_eq!(output.summary.failures.len(), 1);
    assert_eq!(output.summary.failures[0].0, RegionId::from("beta"));
    assert_eq!(output.summary.ledger.len(), 3);
}

#[tokio::test]
async fn test_panicking_region_is_reported_as_failure() {
    let engine = SyntheticEngine::new().panicking(RegionId::from("alpha"));
    let pipeline = RegionalPipeline::new(settings(), Arc::new(engine));

    let output = pipeline.run(&three_regions()).await.unwrap();

    assert_eq!(
        statuses(&output.results),
        vec![RegionStatus::Failed, RegionStatus::Succeeded, RegionStatus::Succeeded]
    );
    assert!(output.results[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("panicked"));
}

#[tokio::test]
async fn test_degenerate_region_fails_without_stopping_batch() {
    let mut rows = three_regions();
    let start = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
    rows.extend((0..10).map(|i| CaseObservation::new(start + Days::days(i), 0.0).with_region("delta")));

    let engine = SyntheticEngine::new();
    let pipeline = RegionalPipeline::new(settings(), Arc::new(engine.clone()));
    let output = pipeline.run(&rows).await.unwrap();

    assert_eq!(output.results.len(), 4);
    assert_eq!(output.results[3].status, RegionStatus::Failed);
    assert!(output.results[3]
        .error_message
        .as_deref()
        .unwrap()
        .contains("no positive counts"));
    // Two chains for each of the three healthy regions
    assert_eq!(engine.calls(), 6);
}

#[tokio::test]
async fn test_configuration_error_fails_fast() {
    let settings = EstimationSettings::from_toml_str("[obs]\nscale = { mean = 0.4 }").unwrap();
    let engine = SyntheticEngine::new();
    let pipeline = RegionalPipeline::new(settings, Arc::new(engine.clone()));

    let err = pipeline.run(&three_regions()).await.err().unwrap();

    assert!(err.is_configuration());
    assert_eq!(engine.calls(), 0);
}

// ==================== Timeouts ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_commits_finished_chains() {
    let engine = SyntheticEngine::new().with_chain_delay(
        RegionId::from("alpha"),
        1,
        Duration::from_secs(30),
    );
    let pipeline = RegionalPipeline::new(settings(), Arc::new(engine.clone()));
    let jobs = pipeline.prepare(&region_rows("alpha", 40.0, 30)).unwrap();

    let args = SamplerArgs::resolve(&pipeline.settings().sampler).unwrap();
    let config = OrchestratorConfig {
        timeout: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let results = RegionalOrchestrator::new(Arc::new(engine), args, config)
        .run(jobs)
        .await;

    let result = &results[0];
    assert_eq!(result.status, RegionStatus::TimedOut);
    assert_eq!(result.chains_committed, 1);
    assert_eq!(result.samples.as_ref().unwrap().chains(), 1);
    assert!(result.summarised.is_some());
    assert!(result.elapsed < Duration::from_secs(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_only_affects_slow_region() {
    let engine = SyntheticEngine::new().with_delay(RegionId::from("beta"), Duration::from_secs(30));
    let pipeline = RegionalPipeline::new(settings(), Arc::new(engine.clone()));
    let jobs = pipeline.prepare(&three_regions()).unwrap();

    let args = SamplerArgs::resolve(&pipeline.settings().sampler).unwrap();
    let config = OrchestratorConfig {
        concurrency: 3,
        timeout: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let results = RegionalOrchestrator::new(Arc::new(engine), args, config)
        .run(jobs)
        .await;

    assert_eq!(
        statuses(&results),
        vec![RegionStatus::Succeeded, RegionStatus::TimedOut, RegionStatus::Succeeded]
    );
    assert_eq!(results[1].chains_committed, 0);
    assert!(results[1].summarised.is_none());
}

// ==================== Ordering and progress ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ledger_follows_input_order() {
    // The first region finishes last
    let engine = SyntheticEngine::new()
        .with_delay(RegionId::from("alpha"), Duration::from_millis(300))
        .with_delay(RegionId::from("beta"), Duration::from_millis(100));
    let mut settings = settings();
    settings.orchestration.concurrency = 3;

    let pipeline = RegionalPipeline::new(settings, Arc::new(engine));
    let output = pipeline.run(&three_regions()).await.unwrap();

    let order: Vec<&str> = output.results.iter().map(|r| r.region_id.as_str()).collect();
    assert_eq!(order, vec!["alpha", "beta", "gamma"]);
    assert!(output.results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_ranking_by_recent_cases() {
    let pipeline = RegionalPipeline::new(settings(), Arc::new(SyntheticEngine::new()));
    let output = pipeline.run(&three_regions()).await.unwrap();

    let ranked: Vec<&str> = output.summary.ranking.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(ranked, vec!["gamma", "beta", "alpha"]);
    assert_eq!(output.summary.table[0].region, RegionId::from("gamma"));
    assert!(output.summary.ranking[0].1 > output.summary.ranking[1].1);
}

#[tokio::test]
async fn test_progress_events() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let pipeline = RegionalPipeline::new(settings(), Arc::new(SyntheticEngine::new()))
        .with_progress(sender);

    pipeline.run(&region_rows("alpha", 40.0, 30)).await.unwrap();
    drop(pipeline);

    let mut seen = Vec::new();
    while let Some(event) = receiver.recv().await {
        seen.push(event.status);
    }
    assert_eq!(
        seen,
        vec![RegionStatus::Pending, RegionStatus::Running, RegionStatus::Succeeded]
    );
}
