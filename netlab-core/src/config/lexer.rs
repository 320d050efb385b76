use crate::config::token::{Token, TokenKind, TokenStream};
use crate::error::{ConfigError, GrammarError};

/// Turns configuration source text into a [`TokenStream`]
///
/// The first word of every statement becomes a keyword token, the remaining words become
/// argument tokens. Statements end at a newline, a `;` or a block marker.
pub fn tokenize(src: &str) -> Result<TokenStream, ConfigError> {
    let mut stream = TokenStream::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut at_statement_start = true;

    while pos < chars.len() {
        let c = chars[pos];

        // Comment
        if c == '#' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        if c == '\n' {
            line += 1;
            at_statement_start = true;
            pos += 1;
            continue;
        }

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        match c {
            ';' => {
                at_statement_start = true;
                pos += 1;
                continue;
            }
            '{' | '}' => {
                let kind = if c == '{' {
                    TokenKind::BlockOpen
                } else {
                    TokenKind::BlockClose
                };
                stream.emit(Token { kind, line });
                at_statement_start = true;
                pos += 1;
                continue;
            }
            _ => {}
        }

        let kind = if at_statement_start {
            TokenKind::Keyword
        } else {
            TokenKind::Argument
        };
        at_statement_start = false;

        // Quoted word
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    return Err(GrammarError::UnterminatedString.at(line));
                }
                let sc = chars[pos];
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\\' && pos + 1 < chars.len() && matches!(chars[pos + 1], '"' | '\\') {
                    s.push(chars[pos + 1]);
                    pos += 2;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            stream.emit_word(kind, line, s);
            continue;
        }

        // Bare word
        let start = pos;
        while pos < chars.len() && !is_word_boundary(chars[pos]) {
            pos += 1;
        }
        let word: String = chars[start..pos].iter().collect();
        stream.emit_word(kind, line, word);
    }

    Ok(stream)
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | ';' | '#' | '"')
}
