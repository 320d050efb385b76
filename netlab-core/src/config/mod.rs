//! The lab configuration language: tokenizer, grammar tables and the two-pass parser

pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod token;

use crate::config::grammar::Rule;
use crate::error::ConfigError;
use crate::topology::Topology;

/// Runs the whole pipeline on `src`, adding the declared objects to `topology`
///
/// Nothing is added unless the check pass succeeds. If the build pass fails, whatever it added
/// so far stays in `topology` and it is up to the caller to clean it up.
pub fn parse(src: &str, rules: &[&Rule], topology: &mut Topology) -> Result<(), ConfigError> {
    let mut stream = lexer::tokenize(src)?;
    tracing::debug!(tokens = stream.token_count(), "tokenized configuration");

    parser::check(&mut stream, rules)?;
    parser::build(&mut stream, rules, topology)
}
