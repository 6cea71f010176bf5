//! Error-path end-to-end scenarios, driven through the CLI binary so the
//! diagnostic text printed to stderr (cargo-style, via
//! `cli::report::report_error`) is exercised too, not just the underlying
//! `ResolveError` value.

use crate::{run, CliTest};

#[test]
fn vars_file_not_found_fails_at_construction() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file("pipeline.yaml", "vars:\n  - missing.yaml\nstages: {}\n")?;

    let (_, stderr, success) = run(&test, &["resolve", "--all"])?;
    assert!(!success);
    assert!(
        stderr.contains("failed to parse 'vars' in 'pipeline.yaml':"),
        "stderr was: {stderr}"
    );
    assert!(stderr.contains("'missing.yaml' does not exist"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn conflicting_sources_raise_a_merge_error() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "vars:\n  - params.yaml\n  - params.json\nstages: {}\n",
    )?;
    test.write_file("params.yaml", "models:\n  bar: bar\n")?;
    test.write_file("params.json", "{\"models\": {\"bar\": \"bar\"}}")?;

    let (_, stderr, success) = run(&test, &["resolve", "--all"])?;
    assert!(!success);
    assert!(stderr.contains("cannot redefine 'models.bar'"), "stderr was: {stderr}");
    assert!(stderr.contains("'params.json'"), "stderr was: {stderr}");
    assert!(stderr.contains("'params.yaml'"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn pipeline_file_missing_reports_a_clean_error() -> anyhow::Result<()> {
    let test = CliTest::new()?;

    let (_, stderr, success) = run(&test, &["resolve", "--all"])?;
    assert!(!success);
    assert!(stderr.contains("does not exist"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn unknown_entry_reports_entry_not_found() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file("pipeline.yaml", "stages:\n  s1:\n    cmd: echo hi\n")?;

    let (_, stderr, success) = run(&test, &["resolve", "nope"])?;
    assert!(!success);
    assert!(stderr.contains("nope"), "stderr was: {stderr}");
    Ok(())
}
