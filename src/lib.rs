//! stagecraft - Pipeline definition resolver.
//!
//! Resolves a templated pipeline document (stages, artifacts, datasets,
//! metrics, params, plots) into concrete, placeholder-free stage graphs by
//! walking a multi-scope symbol table built from parameter files and inline
//! `vars`, and by expanding `foreach`/`matrix` stage generators.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (argument parsing, dispatch, reporting)
//! - `config`: Configuration file loading and parsing
//! - `formats`: Pluggable parameter-file format loaders (YAML/JSON/TOML/literal-Python)
//! - `fs`: File-system abstraction consumed by the resolver
//! - `resolve`: The resolver core (Path Parser, Context Tree, Definitions, ...)

pub mod cli;
pub mod config;
pub mod formats;
pub mod fs;
pub mod resolve;
