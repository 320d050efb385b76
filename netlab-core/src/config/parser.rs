//! Two-pass parser over a [`TokenStream`]
//!
//! The check pass walks the whole stream and reports the first user error without touching the
//! topology. Only once it succeeds does the build pass walk the same tokens again, this time
//! invoking each rule's constructor.

use crate::config::grammar::{BuildContext, Handle, Rule, find_rule};
use crate::config::token::{Token, TokenKind, TokenStream};
use crate::error::{ConfigError, GrammarError};
use crate::topology::Topology;

/// Keywords are never longer than this, longer words are reported truncated
const MAX_KEYWORD_LEN: usize = 64;

/// Arguments are handed to validators truncated to this length
const MAX_ARGUMENT_LEN: usize = 4096;

/// Validates the structure and the arguments of every statement in `stream`
pub fn check(stream: &mut TokenStream, rules: &[&Rule]) -> Result<(), ConfigError> {
    stream.rewind();
    check_block(stream, rules, None)
}

/// Builds the topology described by `stream`, which must have passed [`check`]
pub fn build(
    stream: &mut TokenStream,
    rules: &[&Rule],
    topology: &mut Topology,
) -> Result<(), ConfigError> {
    stream.rewind();
    build_block(stream, rules, topology, None, None)
}

/// Checks statements until the end of the enclosing block
///
/// `opened_at` is the `{` token of the enclosing block, or `None` at the top level.
fn check_block(
    stream: &mut TokenStream,
    rules: &[&Rule],
    opened_at: Option<Token>,
) -> Result<(), ConfigError> {
    loop {
        let Some(token) = stream.next(false)? else {
            return match opened_at {
                Some(open) => Err(GrammarError::UnterminatedBlock.at(open.line)),
                None => Ok(()),
            };
        };

        match token.kind {
            TokenKind::BlockClose if opened_at.is_some() => return Ok(()),
            TokenKind::BlockClose => return Err(GrammarError::UnexpectedBlockClose.at(token.line)),
            TokenKind::BlockOpen => return Err(GrammarError::UnexpectedBlockOpen.at(token.line)),
            TokenKind::Argument => {
                return Err(ConfigError::internal(format!(
                    "line {}: statement starts with an argument",
                    token.line
                )));
            }
            TokenKind::Keyword => check_statement(stream, rules, token)?,
        }
    }
}

fn check_statement(
    stream: &mut TokenStream,
    rules: &[&Rule],
    keyword_token: Token,
) -> Result<(), ConfigError> {
    let line = keyword_token.line;
    let keyword = stream.read_argument(MAX_KEYWORD_LEN)?;
    let rule =
        find_rule(rules, &keyword).ok_or_else(|| GrammarError::UnknownKeyword(keyword).at(line))?;

    // Count the arguments first, then go back and validate them one by one
    let arguments_start = stream.position();
    let count = stream.skip_arguments()?;
    rule.args.check(count).map_err(|e| e.at(line))?;
    stream.seek(arguments_start);

    for index in 1..=count {
        stream.next(false)?;
        let value = stream.read_argument(MAX_ARGUMENT_LEN)?;
        if let Some(validate) = rule.validate {
            validate(index, &value).map_err(|e| e.at(line))?;
        }
    }

    if stream.peek_kind()? == Some(TokenKind::BlockOpen) {
        let Some(open) = stream.next(false)? else {
            return Err(ConfigError::internal("peeked '{' disappeared from the stream"));
        };
        if !rule.accepts_block() {
            return Err(GrammarError::UnexpectedBlock(rule.keyword.to_string()).at(open.line));
        }

        let children: Vec<&Rule> = rule.children.iter().collect();
        check_block(stream, &children, Some(open))?;
    }

    Ok(())
}

fn build_block(
    stream: &mut TokenStream,
    rules: &[&Rule],
    topology: &mut Topology,
    parent: Option<Handle>,
    opened_at: Option<Token>,
) -> Result<(), ConfigError> {
    loop {
        let Some(token) = stream.next(false)? else {
            return match opened_at {
                None => Ok(()),
                Some(open) => Err(ConfigError::internal(format!(
                    "block opened at line {} is not closed",
                    open.line
                ))),
            };
        };

        match token.kind {
            TokenKind::BlockClose => return Ok(()),
            TokenKind::Keyword => {}
            other => {
                return Err(ConfigError::internal(format!(
                    "line {}: unexpected {other:?} token in build pass",
                    token.line
                )));
            }
        }

        let keyword = stream.read_argument(MAX_KEYWORD_LEN)?;
        let rule = find_rule(rules, &keyword).ok_or_else(|| {
            ConfigError::internal(format!(
                "line {}: keyword '{keyword}' passed the check pass but has no rule",
                token.line
            ))
        })?;

        let mut ctx = BuildContext {
            stream: &mut *stream,
            topology: &mut *topology,
            line: token.line,
        };
        let handle = (rule.build)(&mut ctx, parent)?;
        stream.skip_arguments()?;

        if stream.peek_kind()? == Some(TokenKind::BlockOpen) {
            let open = stream.next(false)?;
            let children: Vec<&Rule> = rule.children.iter().collect();
            build_block(stream, &children, topology, Some(handle), open)?;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::grammar::{ArgCount, check_name};
    use crate::config::lexer::tokenize;

    // A small grammar of its own, so the engine can be tested without the real drivers:
    //
    // group <name> { item <name> [value...]; flag }
    static GROUP_CHILDREN: &[Rule] = &[
        Rule {
            keyword: "item",
            args: ArgCount::AtLeast(1),
            validate: Some(check_item_arg),
            children: &[],
            build: build_item,
        },
        Rule {
            keyword: "flag",
            args: ArgCount::Exact(0),
            validate: None,
            children: &[],
            build: build_flag,
        },
    ];

    static GROUP: Rule = Rule {
        keyword: "group",
        args: ArgCount::Exact(1),
        validate: Some(check_name),
        children: GROUP_CHILDREN,
        build: build_group,
    };

    fn check_item_arg(index: usize, value: &str) -> Result<(), GrammarError> {
        if index > 1 && value.parse::<u32>().is_err() {
            return Err(GrammarError::BandwidthNotInteger);
        }
        Ok(())
    }

    fn build_group(
        ctx: &mut BuildContext<'_>,
        parent: Option<Handle>,
    ) -> Result<Handle, ConfigError> {
        ctx.expect_top_level(parent)?;
        let name = ctx.argument(16)?;
        let node = ctx.topology.add_node(name).map_err(|e| ctx.error(e))?;
        Ok(Handle::Node(node))
    }

    fn build_item(
        ctx: &mut BuildContext<'_>,
        parent: Option<Handle>,
    ) -> Result<Handle, ConfigError> {
        let node = ctx.expect_node(parent)?;
        let name = ctx.argument(16)?;
        let values = ctx.remaining_arguments()?;
        let index = ctx
            .topology
            .node_mut(node)
            .add_port(name, values)
            .map_err(|e| ctx.error(e))?;
        Ok(Handle::Port(crate::topology::PortRef { node, index }))
    }

    fn build_flag(
        ctx: &mut BuildContext<'_>,
        parent: Option<Handle>,
    ) -> Result<Handle, ConfigError> {
        let node = ctx.expect_node(parent)?;
        ctx.topology.node_mut(node).set_allow_forwarding();
        Ok(Handle::Node(node))
    }

    fn check_source(src: &str) -> Result<(), ConfigError> {
        let mut stream = tokenize(src)?;
        check(&mut stream, &[&GROUP])
    }

    fn load(src: &str) -> Result<Topology, ConfigError> {
        let mut stream = tokenize(src)?;
        check(&mut stream, &[&GROUP])?;
        let mut topology = Topology::new();
        build(&mut stream, &[&GROUP], &mut topology)?;
        Ok(topology)
    }

    #[test]
    fn test_check_errors_carry_line_numbers() {
        let cases = [
            ("grup a {}", "1: unknown keyword 'grup'"),
            ("group\n", "1: too few arguments"),
            ("group a b", "1: too many arguments"),
            ("group a {\n flag x\n}", "2: too many arguments"),
            ("group a {\n item\n}", "2: too few arguments"),
            ("group a {\n item x 1 two\n}", "2: bandwidth must be integer value"),
            ("group abcdefgh", "1: name 'abcdefgh' is too long (maximum is 7 characters)"),
            ("group a {\n flag {\n }\n}", "2: 'flag' does not take a block"),
            ("group a {\n group b\n}", "2: unknown keyword 'group'"),
            ("group a\n}", "2: unexpected '}'"),
            ("{", "1: unexpected '{'"),
            ("group a {\n\n flag\n", "1: missing '}'"),
        ];

        for (src, expected) in cases {
            let err = check_source(src).unwrap_err();
            assert_eq!(err.to_string(), expected, "{src:?}");
        }
    }

    #[test]
    fn test_build_attaches_children_to_parent() {
        let topology = load("group a {\n item x 1 2\n flag\n}\ngroup b { item y }").unwrap();

        let a = &topology.nodes()[0];
        assert_eq!(a.name(), "a");
        assert!(a.allow_forwarding());
        assert_eq!(a.ports()[0].name(), "x");
        assert_eq!(a.ports()[0].addresses(), ["1", "2"]);

        let b = &topology.nodes()[1];
        assert_eq!(b.name(), "b");
        assert!(!b.allow_forwarding());
        assert_eq!(b.ports()[0].name(), "y");
        assert!(b.ports()[0].addresses().is_empty());
    }

    #[test]
    fn test_check_pass_does_not_move_the_build_start() {
        // check leaves the cursor at the end; build has to start over by itself
        let mut stream = tokenize("group a { item x }\ngroup b { item y 1 }").unwrap();
        check(&mut stream, &[&GROUP]).unwrap();
        assert!(stream.is_exhausted());

        let mut topology = Topology::new();
        build(&mut stream, &[&GROUP], &mut topology).unwrap();
        assert_eq!(topology.nodes().len(), 2);
    }

    #[test]
    fn test_build_errors_carry_line_numbers() {
        let err = load("group a\ngroup b\ngroup a").unwrap_err();
        assert_eq!(err.to_string(), "3: node 'a' redefined");
    }

    #[test]
    fn test_empty_block_and_empty_source() {
        assert!(load("").unwrap().is_empty());
        let topology = load("group a {}").unwrap();
        assert!(topology.nodes()[0].ports().is_empty());
    }
}
