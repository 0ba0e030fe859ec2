// tests/config_validation.rs

//! Structural validation of the TOML pipeline definition: a bad config must
//! fail fast with a descriptive error, before any task runs.

use std::error::Error;
use std::io::Write;

use loaddag::config::{load_and_validate, ConfigFile, RawConfigFile};
use loaddag::errors::PipelineError;
use loaddag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

const VALID_CONFIG: &str = r#"
[pipeline]
owner = "june"
max_retries = 2
retry_delay_secs = 60
schedule = "0 * * * *"

[task.begin]
kind = "noop"

[task.stage_events]
kind = "stage"
after = ["begin"]
table = "staging_events"
source = "s3://bucket/log_data"

[task.quality_checks]
kind = "quality"
after = ["stage_events"]
tables = ["staging_events"]
"#;

#[test]
fn valid_config_loads_from_disk() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(VALID_CONFIG.as_bytes())?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.pipeline.owner, "june");
    assert_eq!(cfg.pipeline.max_retries, 2);
    assert_eq!(cfg.pipeline.retry_delay_secs, 60);
    assert_eq!(cfg.pipeline.schedule.as_deref(), Some("0 * * * *"));
    assert_eq!(cfg.task.len(), 3);
    assert_eq!(
        cfg.pipeline.retry_policy().retry_delay,
        std::time::Duration::from_secs(60)
    );

    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("does-not-exist.toml").unwrap_err();
    assert!(matches!(err, PipelineError::IoError(_)), "got {err:?}");
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"[task.begin\nkind = noop")?;

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)), "got {err:?}");

    Ok(())
}

#[test]
fn empty_task_set_is_rejected() {
    let raw = RawConfigFile {
        pipeline: Default::default(),
        task: Default::default(),
    };
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("at least one"), "got {err}");
}

#[test]
fn stage_without_source_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task(
            "stage_events",
            TaskConfigBuilder::new(loaddag::config::TaskKindName::Stage)
                .table("staging_events")
                .build(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("requires `source`"), "got {err}");
}

#[test]
fn quality_without_tables_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("begin", TaskConfigBuilder::noop().build())
        .with_task(
            "quality_checks",
            TaskConfigBuilder::new(loaddag::config::TaskKindName::Quality)
                .after("begin")
                .build(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("tables"), "got {err}");
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("begin", TaskConfigBuilder::noop().build())
        .with_task(
            "stage_events",
            TaskConfigBuilder::stage("staging_events", "s3://bucket/log_data")
                .after("ghost")
                .build(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("unknown dependency"), "got {err}");
}

#[test]
fn self_dependency_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task(
            "begin",
            TaskConfigBuilder::noop().after("begin").build(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("depend on itself"), "got {err}");
}

#[test]
fn dependency_cycle_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::noop().after("b").build())
        .with_task("b", TaskConfigBuilder::noop().after("a").build())
        .try_build()
        .unwrap_err();

    assert!(matches!(err, PipelineError::DagCycle(_)), "got {err:?}");
}

#[test]
fn multiple_roots_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("begin_a", TaskConfigBuilder::noop().build())
        .with_task("begin_b", TaskConfigBuilder::noop().build())
        .with_task(
            "end",
            TaskConfigBuilder::noop().after("begin_a").after("begin_b").build(),
        )
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("no dependencies"), "got {err}");
}

#[test]
fn multiple_terminals_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("begin", TaskConfigBuilder::noop().build())
        .with_task("end_a", TaskConfigBuilder::noop().after("begin").build())
        .with_task("end_b", TaskConfigBuilder::noop().after("begin").build())
        .try_build()
        .unwrap_err();

    assert!(err.to_string().contains("no dependents"), "got {err}");
}
