//! In-memory token stream with a random access read cursor
//!
//! Keyword and argument tokens are followed by a separate payload entry holding their text, so a
//! reader can look at a token's kind (and even measure its payload) before deciding whether to
//! consume it.

use crate::error::ConfigError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// First word of a statement, followed by a payload
    Keyword,
    /// Any further word of a statement, followed by a payload
    Argument,
    BlockOpen,
    BlockClose,
}

impl TokenKind {
    pub fn has_payload(self) -> bool {
        matches!(self, TokenKind::Keyword | TokenKind::Argument)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The source line the token was read from (1-based)
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Token(Token),
    Payload(Box<str>),
}

#[derive(Debug, Default, Clone)]
pub struct TokenStream {
    entries: Vec<Entry>,
    cursor: usize,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a token to the end of the stream
    pub fn emit(&mut self, token: Token) {
        self.entries.push(Entry::Token(token));
    }

    /// Appends the payload belonging to the previously emitted keyword or argument token
    pub fn emit_payload(&mut self, payload: impl Into<Box<str>>) {
        self.entries.push(Entry::Payload(payload.into()));
    }

    /// Appends a keyword or argument token together with its payload
    pub fn emit_word(&mut self, kind: TokenKind, line: u32, text: impl Into<Box<str>>) {
        self.emit(Token { kind, line });
        self.emit_payload(text);
    }

    /// Returns the token under the cursor, advancing past it unless `peek` is set
    ///
    /// Returns `None` at the end of the stream.
    pub fn next(&mut self, peek: bool) -> Result<Option<Token>, ConfigError> {
        let token = match self.entries.get(self.cursor) {
            None => return Ok(None),
            Some(Entry::Token(token)) => *token,
            Some(Entry::Payload(payload)) => {
                return Err(ConfigError::internal(format!(
                    "expected a token, found argument payload '{payload}'"
                )));
            }
        };

        if !peek {
            self.cursor += 1;
        }

        Ok(Some(token))
    }

    /// Returns the kind of the token under the cursor without consuming it
    pub fn peek_kind(&mut self) -> Result<Option<TokenKind>, ConfigError> {
        Ok(self.next(true)?.map(|t| t.kind))
    }

    /// Consumes the payload under the cursor, keeping at most `max_len` bytes of it
    ///
    /// Truncation never splits a character, so the result may be a few bytes shorter.
    pub fn read_argument(&mut self, max_len: usize) -> Result<String, ConfigError> {
        let payload = self.payload()?;
        let mut end = payload.len().min(max_len);
        while !payload.is_char_boundary(end) {
            end -= 1;
        }

        let value = payload[..end].to_string();
        self.cursor += 1;
        Ok(value)
    }

    /// Skips the payload under the cursor
    pub fn skip_argument(&mut self) -> Result<(), ConfigError> {
        self.payload()?;
        self.cursor += 1;
        Ok(())
    }

    /// Measures the payload under the cursor (in bytes) without consuming it
    pub fn argument_len(&self) -> Result<usize, ConfigError> {
        Ok(self.payload()?.len())
    }

    fn payload(&self) -> Result<&str, ConfigError> {
        match self.entries.get(self.cursor) {
            Some(Entry::Payload(payload)) => Ok(payload),
            Some(Entry::Token(token)) => Err(ConfigError::internal(format!(
                "expected an argument payload, found {:?} token from line {}",
                token.kind, token.line
            ))),
            None => Err(ConfigError::internal(
                "end of token stream while reading argument",
            )),
        }
    }

    /// Consumes every argument token (and payload) directly under the cursor
    ///
    /// Returns the number of arguments skipped.
    pub fn skip_arguments(&mut self) -> Result<usize, ConfigError> {
        let mut skipped = 0;
        while self.peek_kind()? == Some(TokenKind::Argument) {
            self.next(false)?;
            self.skip_argument()?;
            skipped += 1;
        }

        Ok(skipped)
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn seek(&mut self, position: usize) {
        self.cursor = position.min(self.entries.len());
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// The number of tokens in the stream, payloads excluded
    pub fn token_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Token(_)))
            .count()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stream() -> TokenStream {
        let mut stream = TokenStream::new();
        stream.emit_word(TokenKind::Keyword, 1, "node");
        stream.emit_word(TokenKind::Argument, 1, "router");
        stream.emit(Token {
            kind: TokenKind::BlockOpen,
            line: 1,
        });
        stream.emit(Token {
            kind: TokenKind::BlockClose,
            line: 2,
        });
        stream
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut stream = stream();
        let peeked = stream.next(true).unwrap().unwrap();
        let read = stream.next(false).unwrap().unwrap();
        assert_eq!(peeked, read);
        assert_eq!(read.kind, TokenKind::Keyword);
        assert_eq!(stream.read_argument(64).unwrap(), "node");
    }

    #[test]
    fn test_read_argument_truncates() {
        let mut stream = stream();
        stream.next(false).unwrap();
        stream.skip_argument().unwrap();
        stream.next(false).unwrap();

        assert_eq!(stream.argument_len().unwrap(), 6);
        assert_eq!(stream.read_argument(3).unwrap(), "rou");

        // The whole payload is consumed regardless of truncation
        let token = stream.next(false).unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::BlockOpen);
    }

    #[test]
    fn test_read_argument_truncates_on_char_boundary() {
        let mut stream = TokenStream::new();
        stream.emit_word(TokenKind::Argument, 1, "réseau");
        stream.next(false).unwrap();

        assert_eq!(stream.argument_len().unwrap(), 7);
        let mark = stream.position();
        assert_eq!(stream.read_argument(2).unwrap(), "r");
        stream.seek(mark);
        assert_eq!(stream.read_argument(3).unwrap(), "ré");
    }

    #[test]
    fn test_seek_back_and_reread() {
        let mut stream = stream();
        stream.next(false).unwrap();
        let mark = stream.position();
        assert_eq!(stream.read_argument(64).unwrap(), "node");

        stream.seek(mark);
        assert_eq!(stream.read_argument(64).unwrap(), "node");
    }

    #[test]
    fn test_end_of_stream() {
        let mut stream = stream();
        while let Some(token) = stream.next(false).unwrap() {
            if token.kind.has_payload() {
                stream.skip_argument().unwrap();
            }
        }

        assert!(stream.is_exhausted());
        assert_eq!(stream.token_count(), 4);
    }

    fn out_of_sync_stream() -> TokenStream {
        let mut stream = TokenStream::new();
        stream.emit(Token {
            kind: TokenKind::Argument,
            line: 3,
        });
        stream.next(false).unwrap();
        stream
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "[BUG] end of token stream while reading argument")]
    fn test_payload_out_of_sync_panics_in_debug_builds() {
        let _ = out_of_sync_stream().read_argument(16);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_payload_out_of_sync_is_internal_error() {
        let err = out_of_sync_stream().read_argument(16).unwrap_err();
        assert!(matches!(err, ConfigError::Internal(_)));
        assert!(err.to_string().starts_with("[BUG]"));

        // Reading a token where a payload sits is equally wrong
        let mut stream = TokenStream::new();
        stream.emit_payload("dangling");
        assert!(matches!(
            stream.next(true).unwrap_err(),
            ConfigError::Internal(_)
        ));
    }

    #[test]
    fn test_skip_arguments() {
        let mut stream = TokenStream::new();
        stream.emit_word(TokenKind::Keyword, 1, "route");
        stream.emit_word(TokenKind::Argument, 1, "default");
        stream.emit_word(TokenKind::Argument, 1, "via");
        stream.emit_word(TokenKind::Argument, 1, "10.0.0.1");
        stream.emit_word(TokenKind::Keyword, 2, "allowforward");

        stream.next(false).unwrap();
        stream.skip_argument().unwrap();
        assert_eq!(stream.skip_arguments().unwrap(), 3);
        assert_eq!(stream.peek_kind().unwrap(), Some(TokenKind::Keyword));
    }
}
