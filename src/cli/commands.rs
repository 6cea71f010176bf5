//! Command implementations: load the pipeline document, drive a
//! [`DataResolver`], and hand a plain `serde_json::Value` back to `run.rs`
//! for printing. `ResolveError` is converted to `anyhow::Error` here, at
//! the CLI boundary.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::cli::args::{CommonArgs, KeysCommand, ResolveCommand, SectionCommand};
use crate::config::Config;
use crate::formats::loader_for_extension;
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::node::Node;
use crate::resolve::DataResolver;

fn load_document(fs: &dyn FileSystem, config: &Config, common: &CommonArgs) -> Result<Node> {
    let path = common
        .file
        .clone()
        .unwrap_or_else(|| Path::new(&config.pipeline_file).to_path_buf());

    if !fs.exists(&path) {
        return Err(anyhow!("'{}' does not exist", path.display()));
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let loader = loader_for_extension(ext)
        .ok_or_else(|| anyhow!("'{}' has an unrecognized file extension", path.display()))?;
    let contents = fs
        .read_to_string(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let mut document = loader
        .parse(&contents)
        .map_err(|reason| anyhow!("failed to parse '{}': {reason}", path.display()))?;
    let source: std::rc::Rc<str> = std::rc::Rc::from(path.to_string_lossy().as_ref());
    document.stamp(Some(source), &[], false);
    Ok(document)
}

fn doc_file_name(common: &CommonArgs, config: &Config) -> String {
    common
        .file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| config.pipeline_file.clone())
}

fn build_resolver<'a>(
    fs: &'a dyn FileSystem,
    wdir: &'a Path,
    doc_file: &'a str,
    config: &Config,
    document: &Node,
) -> Result<DataResolver<'a>> {
    DataResolver::new(fs, wdir, doc_file, &config.default_params_path, config.parsing_config(), document)
        .map_err(|e| anyhow!(e))
}

pub fn resolve(cmd: ResolveCommand, config: Config) -> Result<serde_json::Value> {
    let fs = RealFileSystem;
    let doc_file = doc_file_name(&cmd.common, &config);
    let document = load_document(&fs, &config, &cmd.common)?;
    let wdir = Path::new(".");
    let resolver = build_resolver(&fs, wdir, &doc_file, &config, &document)?;

    if cmd.all {
        let all = resolver.resolve_all().map_err(|e| anyhow!(e))?;
        let mut out = serde_json::Map::new();
        for (name, node) in all {
            out.insert(name, node.to_json());
        }
        return Ok(serde_json::Value::Object(out));
    }

    let entry = cmd.entry.ok_or_else(|| anyhow!("an entry name is required unless --all is given"))?;
    let resolved = resolver.resolve_one(&entry).map_err(|e| anyhow!(e))?;
    Ok(resolved.to_json())
}

pub fn keys(cmd: KeysCommand, config: Config) -> Result<serde_json::Value> {
    let fs = RealFileSystem;
    let doc_file = doc_file_name(&cmd.common, &config);
    let document = load_document(&fs, &config, &cmd.common)?;
    let wdir = Path::new(".");
    let resolver = build_resolver(&fs, wdir, &doc_file, &config, &document)?;
    Ok(serde_json::Value::Array(resolver.get_keys().into_iter().map(serde_json::Value::String).collect()))
}

enum Section {
    Artifacts,
    Datasets,
    Metrics,
    Params,
    Plots,
}

fn resolve_section(cmd: SectionCommand, config: Config, section: Section) -> Result<serde_json::Value> {
    let fs = RealFileSystem;
    let doc_file = doc_file_name(&cmd.common, &config);
    let document = load_document(&fs, &config, &cmd.common)?;
    let wdir = Path::new(".");
    let resolver = build_resolver(&fs, wdir, &doc_file, &config, &document)?;
    let resolved = match section {
        Section::Artifacts => resolver.resolve_artifacts(),
        Section::Datasets => resolver.resolve_datasets(),
        Section::Metrics => resolver.resolve_metrics(),
        Section::Params => resolver.resolve_params(),
        Section::Plots => resolver.resolve_plots(),
    }
    .map_err(|e| anyhow!(e))?;
    Ok(resolved.to_json())
}

pub fn artifacts(cmd: SectionCommand, config: Config) -> Result<serde_json::Value> {
    resolve_section(cmd, config, Section::Artifacts)
}

pub fn datasets(cmd: SectionCommand, config: Config) -> Result<serde_json::Value> {
    resolve_section(cmd, config, Section::Datasets)
}

pub fn metrics(cmd: SectionCommand, config: Config) -> Result<serde_json::Value> {
    resolve_section(cmd, config, Section::Metrics)
}

pub fn params(cmd: SectionCommand, config: Config) -> Result<serde_json::Value> {
    resolve_section(cmd, config, Section::Params)
}

pub fn plots(cmd: SectionCommand, config: Config) -> Result<serde_json::Value> {
    resolve_section(cmd, config, Section::Plots)
}
