//! `keys` and the eager top-level section commands
//! (`artifacts`/`datasets`/`metrics`/`params`/`plots`).

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{run_json, CliTest};

#[test]
fn keys_lists_plain_and_generated_stages() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  s1:\n    cmd: echo one\n  build:\n    foreach: [a, b]\n    do:\n      cmd: echo ${item}\n",
    )?;

    let keys = run_json(&test, &["keys"])?;
    assert_eq!(keys, json!(["s1", "build@a", "build@b"]));
    Ok(())
}

#[test]
fn foreach_over_empty_collection_produces_no_stages() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  build:\n    foreach: []\n    do:\n      cmd: echo ${item}\n",
    )?;

    let keys = run_json(&test, &["keys"])?;
    assert_eq!(keys, json!([]));

    let all = run_json(&test, &["resolve", "--all"])?;
    assert_eq!(all, json!({}));
    Ok(())
}

#[test]
fn eager_sections_resolve_independently_of_stages() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "vars:\n  - out: model.pkl\nstages: {}\nartifacts:\n  model:\n    path: ${out}\nmetrics:\n  - metrics.json\nplots:\n  - plots.png\n",
    )?;

    let artifacts = run_json(&test, &["artifacts"])?;
    assert_eq!(artifacts, json!({"model": {"path": "model.pkl"}}));

    let metrics = run_json(&test, &["metrics"])?;
    assert_eq!(metrics, json!(["metrics.json"]));

    let plots = run_json(&test, &["plots"])?;
    assert_eq!(plots, json!(["plots.png"]));
    Ok(())
}

#[test]
fn absent_sections_default_to_empty() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file("pipeline.yaml", "stages: {}\n")?;

    assert_eq!(run_json(&test, &["artifacts"])?, json!({}));
    assert_eq!(run_json(&test, &["datasets"])?, json!([]));
    assert_eq!(run_json(&test, &["metrics"])?, json!([]));
    assert_eq!(run_json(&test, &["params"])?, json!([]));
    assert_eq!(run_json(&test, &["plots"])?, json!([]));
    Ok(())
}

#[test]
fn yaml_output_format_is_accepted() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file("pipeline.yaml", "stages:\n  s1:\n    cmd: echo hi\n")?;

    let (stdout, _, success) = crate::run(&test, &["resolve", "s1", "--format", "yaml"])?;
    assert!(success);
    assert!(stdout.contains("cmd: echo hi"), "stdout was: {stdout}");
    Ok(())
}
