//! End-to-end resolution scenarios, driven through the CLI binary.

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{run_json, CliTest};

#[test]
fn simple_interpolation_resolves_one_stage() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  s1:\n    cmd: python script.py ${dict.foo} --out ${dict.bar}\n    outs:\n      - ${dict.bar}\n    deps:\n      - ${dict.foo}\n",
    )?;
    test.write_file("params.yaml", "dict:\n  foo: foo\n  bar: bar\n")?;

    let value = run_json(&test, &["resolve", "s1"])?;
    assert_eq!(
        value,
        json!({
            "cmd": "python script.py foo --out bar",
            "outs": ["bar"],
            "deps": ["foo"],
            "params": [{"params.yaml": ["dict.bar", "dict.foo"]}],
        })
    );
    Ok(())
}

#[test]
fn foreach_over_list_expands_to_one_stage_per_item() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  build:\n    foreach: [foo, bar, baz]\n    do:\n      cmd: python script.py ${item}\n",
    )?;

    let build_foo = run_json(&test, &["resolve", "build@foo"])?;
    assert_eq!(build_foo["cmd"], json!("python script.py foo"));
    let build_bar = run_json(&test, &["resolve", "build@bar"])?;
    assert_eq!(build_bar["cmd"], json!("python script.py bar"));
    let build_baz = run_json(&test, &["resolve", "build@baz"])?;
    assert_eq!(build_baz["cmd"], json!("python script.py baz"));
    Ok(())
}

#[test]
fn foreach_over_mapping_binds_item_per_entry() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  build:\n    foreach:\n      us:\n        thresh: 10\n      gb:\n        thresh: 15\n    do:\n      cmd: python script.py ${item.thresh}\n",
    )?;

    let us = run_json(&test, &["resolve", "build@us"])?;
    assert_eq!(us["cmd"], json!("python script.py 10"));
    let gb = run_json(&test, &["resolve", "build@gb"])?;
    assert_eq!(gb["cmd"], json!("python script.py 15"));
    Ok(())
}

#[test]
fn matrix_expands_to_a_cartesian_product_of_axes() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  build:\n    matrix:\n      os: [win, linux]\n      pyv: [3.7, 3.8]\n    cmd: echo ${item.os} ${item.pyv}\n",
    )?;

    let keys = run_json(&test, &["keys"])?;
    assert_eq!(
        keys,
        json!(["build@win-3.7", "build@win-3.8", "build@linux-3.7", "build@linux-3.8"])
    );

    let stage = run_json(&test, &["resolve", "build@linux-3.8"])?;
    assert_eq!(stage["cmd"], json!("echo linux 3.8"));
    Ok(())
}

#[test]
fn resolve_all_returns_every_stage() -> anyhow::Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "pipeline.yaml",
        "stages:\n  s1:\n    cmd: echo one\n  s2:\n    cmd: echo two\n",
    )?;

    let all = run_json(&test, &["resolve", "--all"])?;
    assert_eq!(all["s1"]["cmd"], json!("echo one"));
    assert_eq!(all["s2"]["cmd"], json!("echo two"));
    Ok(())
}
