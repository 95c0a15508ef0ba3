//! Lexer for TypeNative source text.

use crate::error::CoreError;
use crate::span::{Location, Span};

/// Kind of a token produced by the lexer.
///
/// The lexer only recognizes keywords, literals and operators. Literal
/// payloads are left as raw source text; decoding happens in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    Number,
    String,

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Semi,     // ;
    Colon,    // :
    Dot,      // .

    // Operators
    Equal,       // =
    EqEq,        // ==
    EqEqEq,      // ===
    BangEq,      // !=
    BangEqEq,    // !==
    Less,        // <
    LessEq,      // <=
    Greater,     // >
    GreaterEq,   // >=
    Shl,         // <<
    Shr,         // >>
    Plus,        // +
    PlusPlus,    // ++
    Minus,       // -
    MinusMinus,  // --
    Star,        // *
    StarStar,    // **
    Slash,       // /
    Percent,     // %
    Amp,         // &
    AmpAmp,      // &&
    Pipe,        // |
    PipePipe,    // ||
    Caret,       // ^
    Tilde,       // ~
    Bang,        // !

    // Keywords
    Let,
    Function,
    Interface,
    Extends,
    If,
    Else,
    While,
    Return,
    As,
    True,
    False,
    Null,
}

impl TokenKind {
    /// Human readable form used in parse diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Equal => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::EqEqEq => "'==='",
            TokenKind::BangEq => "'!='",
            TokenKind::BangEqEq => "'!=='",
            TokenKind::Less => "'<'",
            TokenKind::LessEq => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEq => "'>='",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::Plus => "'+'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::Minus => "'-'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Star => "'*'",
            TokenKind::StarStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Amp => "'&'",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::Pipe => "'|'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::Bang => "'!'",
            TokenKind::Let => "'let'",
            TokenKind::Function => "'function'",
            TokenKind::Interface => "'interface'",
            TokenKind::Extends => "'extends'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Return => "'return'",
            TokenKind::As => "'as'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
        }
    }
}

/// A single token with its kind and span.
///
/// For string literals the span covers the quotes as well; the builder
/// strips them while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Lex a source string into tokens, terminated by a single `Eof` token.
pub fn lex(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            let Some(ch) = self.peek_char() else {
                break;
            };

            let start = self.index as u32;
            let kind = match ch {
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b'[' => self.single(TokenKind::LBracket),
                b']' => self.single(TokenKind::RBracket),
                b',' => self.single(TokenKind::Comma),
                b';' => self.single(TokenKind::Semi),
                b':' => self.single(TokenKind::Colon),
                b'.' => self.single(TokenKind::Dot),
                b'~' => self.single(TokenKind::Tilde),
                b'^' => self.single(TokenKind::Caret),
                b'/' => self.single(TokenKind::Slash),
                b'%' => self.single(TokenKind::Percent),
                b'=' => {
                    self.consume_char();
                    if self.eat(b'=') {
                        if self.eat(b'=') {
                            TokenKind::EqEqEq
                        } else {
                            TokenKind::EqEq
                        }
                    } else {
                        TokenKind::Equal
                    }
                }
                b'!' => {
                    self.consume_char();
                    if self.eat(b'=') {
                        if self.eat(b'=') {
                            TokenKind::BangEqEq
                        } else {
                            TokenKind::BangEq
                        }
                    } else {
                        TokenKind::Bang
                    }
                }
                b'<' => {
                    self.consume_char();
                    if self.eat(b'<') {
                        TokenKind::Shl
                    } else if self.eat(b'=') {
                        TokenKind::LessEq
                    } else {
                        TokenKind::Less
                    }
                }
                b'>' => {
                    self.consume_char();
                    if self.eat(b'>') {
                        TokenKind::Shr
                    } else if self.eat(b'=') {
                        TokenKind::GreaterEq
                    } else {
                        TokenKind::Greater
                    }
                }
                b'+' => self.doubled(b'+', TokenKind::Plus, TokenKind::PlusPlus),
                b'-' => self.doubled(b'-', TokenKind::Minus, TokenKind::MinusMinus),
                b'*' => self.doubled(b'*', TokenKind::Star, TokenKind::StarStar),
                b'&' => self.doubled(b'&', TokenKind::Amp, TokenKind::AmpAmp),
                b'|' => self.doubled(b'|', TokenKind::Pipe, TokenKind::PipePipe),
                b'"' | b'\'' => self.lex_string(ch, start)?,
                b'0'..=b'9' => self.lex_number(start)?,
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(start),
                _ => {
                    let found = self.source[self.index..].chars().next().unwrap_or('?');
                    return Err(self.error(start, format!("unexpected character '{found}'")));
                }
            };

            tokens.push(Token {
                kind,
                span: Span::new(start, self.index as u32),
            });
        }

        let end = self.chars.len() as u32;
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(end, end),
        });
        Ok(tokens)
    }

    fn skip_trivia(&mut self) -> Result<(), CoreError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => self.consume_char(),
                b'/' if self.peek_next() == Some(b'/') => {
                    while let Some(ch) = self.peek_char() {
                        if ch == b'\n' {
                            break;
                        }
                        self.consume_char();
                    }
                }
                b'/' if self.peek_next() == Some(b'*') => {
                    let start = self.index as u32;
                    self.consume_char();
                    self.consume_char();
                    loop {
                        match self.peek_char() {
                            Some(b'*') if self.peek_next() == Some(b'/') => {
                                self.consume_char();
                                self.consume_char();
                                break;
                            }
                            Some(_) => self.consume_char(),
                            None => {
                                return Err(self.error(start, "unterminated block comment"));
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn doubled(&mut self, ch: u8, single: TokenKind, double: TokenKind) -> TokenKind {
        self.consume_char();
        if self.eat(ch) { double } else { single }
    }

    fn lex_string(&mut self, quote: u8, start: u32) -> Result<TokenKind, CoreError> {
        // Consume the opening quote
        self.consume_char();

        while let Some(ch) = self.peek_char() {
            match ch {
                b'\\' => {
                    // Skip over escape sequence: backslash + next char (if any)
                    self.consume_char();
                    if self.peek_char().is_some() {
                        self.consume_char();
                    }
                }
                b'\n' => break,
                _ if ch == quote => {
                    self.consume_char();
                    return Ok(TokenKind::String);
                }
                _ => self.consume_char(),
            }
        }

        Err(self.error(start, "unterminated string literal"))
    }

    fn lex_number(&mut self, start: u32) -> Result<TokenKind, CoreError> {
        // digits [ '.' digits ] [ ('e' | 'E') ['+' | '-'] digits ]
        self.consume_digits();

        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char(); // '.'
            self.consume_digits();
        }

        if matches!(self.peek_char(), Some(b'e' | b'E')) {
            self.consume_char();
            if matches!(self.peek_char(), Some(b'+' | b'-')) {
                self.consume_char();
            }
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error(start, "malformed exponent in number literal"));
            }
            self.consume_digits();
        }

        if self.peek_char().is_some_and(is_ident_start) {
            return Err(self.error(start, "identifier directly after number literal"));
        }
        Ok(TokenKind::Number)
    }

    fn lex_ident_or_keyword(&mut self, start: u32) -> TokenKind {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }

        match &self.source[start as usize..self.index] {
            "let" => TokenKind::Let,
            "function" => TokenKind::Function,
            "interface" => TokenKind::Interface,
            "extends" => TokenKind::Extends,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "as" => TokenKind::As,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident,
        }
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
    }

    fn error(&self, offset: u32, message: impl Into<String>) -> CoreError {
        CoreError::Lex {
            location: Location::locate(self.source, offset),
            message: message.into(),
        }
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek_char() == Some(ch) {
            self.consume_char();
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_declaration() {
        assert_eq!(
            kinds("let xs: i32[] = [];"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Equal,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn prefers_longest_operator() {
        assert_eq!(
            kinds("a === b !== c ** d ++ -- << >= &&"),
            vec![
                TokenKind::Ident,
                TokenKind::EqEqEq,
                TokenKind::Ident,
                TokenKind::BangEqEq,
                TokenKind::Ident,
                TokenKind::StarStar,
                TokenKind::Ident,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Shl,
                TokenKind::GreaterEq,
                TokenKind::AmpAmp,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keeps_escaped_quotes_inside_strings() {
        let source = r#""a\"b" 'c'"#;
        let tokens = lex(source).expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].span.text(source), r#""a\"b""#);
        assert_eq!(tokens[1].span.text(source), "'c'");
    }

    #[test]
    fn lexes_fractional_and_exponent_numbers() {
        let source = "5.5 1e3 2.5E-2 7.";
        let tokens = lex(source).expect("lex");
        let texts: Vec<_> = tokens[..4].iter().map(|t| t.span.text(source)).collect();
        assert_eq!(texts, vec!["5.5", "1e3", "2.5E-2", "7"]);
        assert_eq!(tokens[4].kind, TokenKind::Dot);
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("// line\nx /* block\n */ ;"),
            vec![TokenKind::Ident, TokenKind::Semi, TokenKind::Eof]
        );
    }

    #[test]
    fn reports_unterminated_string_with_location() {
        let err = lex("let s: string = \"oops;").unwrap_err();
        match err {
            CoreError::Lex { location, message } => {
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 17);
                assert!(message.contains("unterminated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_character() {
        let err = lex("a # b").unwrap_err();
        assert!(matches!(err, CoreError::Lex { .. }));
    }
}
