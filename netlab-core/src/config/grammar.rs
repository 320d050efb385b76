//! Keyword rules describing the configuration language
//!
//! Every driver contributes a top-level [`Rule`], possibly with nested child rules. The parser
//! only ever looks at these tables, so new block kinds can be added without touching it.

use crate::config::token::{TokenKind, TokenStream};
use crate::error::{ConfigError, GrammarError};
use crate::topology::address::PortAddress;
use crate::topology::node::MAX_NAME_LEN;
use crate::topology::{CableId, NodeId, PortRef, Topology};

/// Checks a single argument during the check pass
///
/// Receives the 1-based position of the argument within its statement, and its value.
pub type Validator = fn(index: usize, value: &str) -> Result<(), GrammarError>;

/// Builds a domain object during the build pass
///
/// Receives the object built for the enclosing block (`None` at the top level) and returns a
/// handle to the new object, which becomes the parent of the statements in its own block.
pub type Constructor =
    fn(ctx: &mut BuildContext<'_>, parent: Option<Handle>) -> Result<Handle, ConfigError>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgCount {
    Exact(usize),
    AtLeast(usize),
}

impl ArgCount {
    pub fn check(self, count: usize) -> Result<(), GrammarError> {
        let (min, max) = match self {
            ArgCount::Exact(n) => (n, Some(n)),
            ArgCount::AtLeast(n) => (n, None),
        };

        if count < min {
            Err(GrammarError::TooFewArguments)
        } else if max.is_some_and(|max| count > max) {
            Err(GrammarError::TooManyArguments)
        } else {
            Ok(())
        }
    }
}

pub struct Rule {
    pub keyword: &'static str,
    pub args: ArgCount,
    pub validate: Option<Validator>,
    pub children: &'static [Rule],
    pub build: Constructor,
}

impl Rule {
    pub fn accepts_block(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Finds the rule for `keyword`
pub fn find_rule<'a>(rules: &[&'a Rule], keyword: &str) -> Option<&'a Rule> {
    rules.iter().copied().find(|r| r.keyword == keyword)
}

/// A reference to an object created by a [`Constructor`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Handle {
    Node(NodeId),
    Port(PortRef),
    Route { node: NodeId, index: usize },
    FirewallRule { node: NodeId, index: usize },
    Cable(CableId),
    CableEnd { cable: CableId, port: PortRef },
}

/// Everything a constructor gets to work with
///
/// The token stream is positioned right after the statement's keyword, so the constructor can
/// read its own arguments.
pub struct BuildContext<'a> {
    pub stream: &'a mut TokenStream,
    pub topology: &'a mut Topology,
    pub line: u32,
}

impl BuildContext<'_> {
    pub fn error(&self, kind: GrammarError) -> ConfigError {
        kind.at(self.line)
    }

    /// Reads the next argument, which the check pass guaranteed to be there
    pub fn argument(&mut self, max_len: usize) -> Result<String, ConfigError> {
        match self.stream.next(false)? {
            Some(token) if token.kind == TokenKind::Argument => self.stream.read_argument(max_len),
            other => Err(ConfigError::internal(format!(
                "line {}: expected an argument, found {:?}",
                self.line,
                other.map(|t| t.kind)
            ))),
        }
    }

    /// Reads the next argument if there is one left in the statement
    pub fn optional_argument(&mut self, max_len: usize) -> Result<Option<String>, ConfigError> {
        if self.stream.peek_kind()? == Some(TokenKind::Argument) {
            self.argument(max_len).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads all remaining arguments of the statement
    pub fn remaining_arguments(&mut self) -> Result<Vec<String>, ConfigError> {
        let mut args: Vec<String> = Vec::new();
        while self.stream.peek_kind()? == Some(TokenKind::Argument) {
            self.stream.next(false)?;

            let len = self.stream.argument_len()?;
            let mut value = reserve_argument(&mut args, len, self.line)?;
            value.push_str(&self.stream.read_argument(len)?);
            args.push(value);
        }

        Ok(args)
    }

    pub fn expect_node(&self, parent: Option<Handle>) -> Result<NodeId, ConfigError> {
        match parent {
            Some(Handle::Node(node)) => Ok(node),
            other => Err(ConfigError::internal(format!(
                "line {}: expected a node as parent, found {other:?}",
                self.line
            ))),
        }
    }

    pub fn expect_cable(&self, parent: Option<Handle>) -> Result<CableId, ConfigError> {
        match parent {
            Some(Handle::Cable(cable)) => Ok(cable),
            other => Err(ConfigError::internal(format!(
                "line {}: expected a cable as parent, found {other:?}",
                self.line
            ))),
        }
    }

    pub fn expect_top_level(&self, parent: Option<Handle>) -> Result<(), ConfigError> {
        match parent {
            None => Ok(()),
            Some(other) => Err(ConfigError::internal(format!(
                "line {}: expected a top level statement, found parent {other:?}",
                self.line
            ))),
        }
    }
}

/// Makes room for one more argument of `len` bytes, without aborting if memory runs out
fn reserve_argument(args: &mut Vec<String>, len: usize, line: u32) -> Result<String, ConfigError> {
    let mut value = String::new();
    value
        .try_reserve_exact(len)
        .and_then(|_| args.try_reserve(1))
        .map_err(|_| ConfigError::OutOfMemory { line })?;
    Ok(value)
}

/// Validates node and port names
///
/// Names end up in interface names and in command lines, so they must be non-empty, free of
/// whitespace and `/`, and short enough in bytes for the kernel's interface name limit.
pub fn check_name(_index: usize, value: &str) -> Result<(), GrammarError> {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '/') {
        return Err(GrammarError::InvalidName(value.to_string()));
    }

    if value.len() > MAX_NAME_LEN {
        return Err(GrammarError::NameTooLong {
            name: value.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates interface addresses in CIDR syntax
pub fn check_address(_index: usize, value: &str) -> Result<(), GrammarError> {
    value
        .parse::<PortAddress>()
        .map(|_| ())
        .map_err(|reason| GrammarError::InvalidAddress {
            address: value.to_string(),
            reason,
        })
}

#[test]
fn test_arg_count() {
    assert!(ArgCount::Exact(0).check(0).is_ok());
    assert_eq!(
        ArgCount::Exact(1).check(2),
        Err(GrammarError::TooManyArguments)
    );
    assert_eq!(
        ArgCount::Exact(1).check(0),
        Err(GrammarError::TooFewArguments)
    );
    assert!(ArgCount::AtLeast(2).check(7).is_ok());
    assert_eq!(
        ArgCount::AtLeast(2).check(1),
        Err(GrammarError::TooFewArguments)
    );
}

#[test]
fn test_check_name() {
    assert!(check_name(1, "router1").is_ok());
    assert_eq!(
        check_name(1, "router12").unwrap_err().to_string(),
        "name 'router12' is too long (maximum is 7 characters)"
    );

    // The limit is in bytes: seven characters, fourteen bytes
    assert_eq!(
        check_name(1, "ééééééé"),
        Err(GrammarError::NameTooLong {
            name: "ééééééé".to_string(),
            max: 7
        })
    );
    assert!(check_name(1, "réseau").is_ok());

    for invalid in ["", "x up", "a\tb", "eth0/1"] {
        assert_eq!(
            check_name(1, invalid),
            Err(GrammarError::InvalidName(invalid.to_string())),
            "{invalid:?}"
        );
    }
}

#[test]
fn test_reserve_argument() {
    let mut args = vec!["default".to_string()];
    let value = reserve_argument(&mut args, 16, 4).unwrap();
    assert!(value.capacity() >= 16);
    assert!(args.capacity() > args.len());

    let err = reserve_argument(&mut args, usize::MAX, 4).unwrap_err();
    assert!(matches!(err, ConfigError::OutOfMemory { line: 4 }));
    assert_eq!(err.to_string(), "4: out of memory");
    assert_eq!(err.line(), Some(4));
    assert_eq!(args, ["default"]);
}
