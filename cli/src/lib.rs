//! Command line front end for manuscript glyph review.
//!
//! `uncial prepare` builds a review directory from page glyphs, `cluster` and
//! `similar` print JSON groupings and rankings, and `font` hands saved
//! classifications to the external font tool.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::run;
