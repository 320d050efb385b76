use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An error found while loading a lab configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration is malformed
    #[error("{line}: {kind}")]
    Grammar { line: u32, kind: GrammarError },
    /// Growing a collection failed while reading the configuration
    #[error("{line}: out of memory")]
    OutOfMemory { line: u32 },
    /// The configuration file could not be read
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The tokenizer and the parser disagree about the token stream
    #[error("[BUG] {0}")]
    Internal(String),
}

impl ConfigError {
    pub fn grammar(line: u32, kind: GrammarError) -> Self {
        ConfigError::Grammar { line, kind }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "token stream out of sync");
        debug_assert!(false, "[BUG] {message}");
        ConfigError::Internal(message)
    }

    /// The user-facing grammar error, if this is one
    pub fn grammar_kind(&self) -> Option<&GrammarError> {
        match self {
            ConfigError::Grammar { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            ConfigError::Grammar { line, .. } | ConfigError::OutOfMemory { line } => Some(*line),
            _ => None,
        }
    }
}

/// Mistakes in the user's configuration, without the line they were found at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unexpected '{{'")]
    UnexpectedBlockOpen,
    #[error("unexpected '}}'")]
    UnexpectedBlockClose,
    #[error("missing '}}'")]
    UnterminatedBlock,
    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),
    #[error("'{0}' does not take a block")]
    UnexpectedBlock(String),
    #[error("too few arguments")]
    TooFewArguments,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("name '{name}' is too long (maximum is {max} characters)")]
    NameTooLong { name: String, max: usize },
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: AddressError },
    #[error("bandwidth argument too big")]
    BandwidthTooLong,
    #[error("bandwidth must be integer value")]
    BandwidthNotInteger,
    #[error("unknown suffix '{0}'")]
    UnknownSuffix(String),
    #[error("node '{0}' redefined")]
    NodeRedefined(String),
    #[error("port '{0}' redefined")]
    PortRedefined(String),
    #[error("node '{0}' does not exist")]
    UnknownNode(String),
    #[error("node '{node}' has no port named '{port}'")]
    UnknownPort { node: String, port: String },
    #[error("port '{port}' on node '{node}' is already connected")]
    PortAlreadyConnected { node: String, port: String },
    #[error("cable cannot have more than two ends")]
    TooManyCableEnds,
}

impl GrammarError {
    pub fn at(self, line: u32) -> ConfigError {
        ConfigError::grammar(line, self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty string")]
    Empty,
    #[error("not an ip address")]
    NotAnAddress,
    #[error("the network prefix is not a valid unsigned integer")]
    InvalidPrefix,
    #[error("network prefix cannot be higher than {0}")]
    PrefixTooLarge(u8),
    #[error("address contains trailing characters")]
    TrailingCharacters,
}

/// A command issued to the environment failed
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed with exit code {}: {stderr}", code.map_or("none".to_string(), |c| c.to_string()))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// An error raised while realizing a lab
#[derive(Debug, Error)]
pub enum LabError {
    #[error("driver '{driver}' failed to start: {source}")]
    Start {
        driver: &'static str,
        #[source]
        source: EnvError,
    },
}
