//! Diagnostic rendering.
//!
//! The resolver's `ResolveError`/`ResolveErrorKind` already build up the
//! full human-readable message (the `failed to parse <section> in
//! <file>:` prefix, and `ExpressionSyntaxError`'s own `${expr}\n ^\n...`
//! caret diagram), so reporting here is cargo-style coloring applied
//! directly to that message rather than a second location-tracking layer
//! on top of it.

use std::fmt::Display;
use std::io::{self, Write};

use colored::Colorize;

pub fn report_error(err: impl Display) {
    report_error_to(err, &mut io::stderr().lock());
}

pub fn report_error_to<W: Write>(err: impl Display, writer: &mut W) {
    let _ = writeln!(writer, "{} {}", "error:".bold().red(), err);
}
