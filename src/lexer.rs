//! Lexer for Lox
//!
//! Converts source code into a stream of tokens.

use crate::error::{Diagnostics, ErrorKind, LoxError};
use crate::token::{lookup_keyword, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    errors: Diagnostics,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// Scanning continues past bad input so that every error in the source is reported at once.
    pub fn tokenize(&mut self) -> std::result::Result<Vec<Token>, Diagnostics> {
        let mut tokens = Vec::new();

        loop {
            match self.next_token() {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => break,
                Err(e) => self.errors.push(e),
            }
        }

        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos, self.line, self.column),
            String::new(),
        ));

        Ok(tokens)
    }

    /// Get the next token
    fn next_token(&mut self) -> Result<Option<Token>, LoxError> {
        self.skip_whitespace_and_comments()?;

        let Some(&(start_pos, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let start_line = self.line;
        let start_column = self.column;

        let kind = match ch {
            '(' => { self.advance(); TokenKind::LeftParen }
            ')' => { self.advance(); TokenKind::RightParen }
            '{' => { self.advance(); TokenKind::LeftBrace }
            '}' => { self.advance(); TokenKind::RightBrace }
            ',' => { self.advance(); TokenKind::Comma }
            '.' => { self.advance(); TokenKind::Dot }
            ';' => { self.advance(); TokenKind::Semicolon }
            '?' => { self.advance(); TokenKind::Question }
            ':' => { self.advance(); TokenKind::Colon }
            '+' => { self.advance(); TokenKind::Plus }
            '-' => { self.advance(); TokenKind::Minus }
            '*' => { self.advance(); TokenKind::Star }
            '/' => { self.advance(); TokenKind::Slash }

            '=' => self.one_or_two('=', TokenKind::Equal, TokenKind::EqualEqual),
            '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::BangEqual),
            '<' => self.one_or_two('=', TokenKind::Less, TokenKind::LessEqual),
            '>' => self.one_or_two('=', TokenKind::Greater, TokenKind::GreaterEqual),

            '"' => self.scan_string()?,

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

            _ => {
                self.advance();
                return Err(LoxError::at(
                    ErrorKind::UnexpectedCharacter(ch),
                    Span::new(start_pos, self.current_pos, start_line, start_column),
                ));
            }
        };

        let lexeme = self.source[start_pos..self.current_pos].to_string();

        Ok(Some(Token::new(
            kind,
            Span::new(start_pos, self.current_pos, start_line, start_column),
            lexeme,
        )))
    }

    fn one_or_two(&mut self, second: char, single: TokenKind, double: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.current_pos = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut rest = self.source[self.current_pos..].chars();
        rest.next();
        rest.next()
    }

    /// Skip whitespace, line comments and block comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LoxError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }

                '/' if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }

                '/' if self.peek_second() == Some('*') => self.skip_block_comment()?,

                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LoxError> {
        let span_start = Span::new(self.current_pos, self.current_pos + 2, self.line, self.column);
        self.advance();
        self.advance();

        loop {
            match self.advance() {
                Some('*') if self.peek_char() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(LoxError::at(ErrorKind::UnterminatedComment, span_start));
                }
            }
        }
    }

    /// Scan a string literal. Strings may span lines and have no escape sequences.
    fn scan_string(&mut self) -> Result<TokenKind, LoxError> {
        let start_line = self.line;
        let start_column = self.column;
        let start_pos = self.current_pos;

        // opening quote
        self.advance();

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(TokenKind::String(value)),
                Some(c) => value.push(c),
                None => break,
            }
        }

        Err(LoxError::at(
            ErrorKind::UnterminatedString,
            Span::new(start_pos, self.current_pos, start_line, start_column),
        ))
    }

    /// Scan a number literal
    fn scan_number(&mut self) -> TokenKind {
        let start = self.current_pos;

        self.consume_digits();

        // A trailing '.' is left for the parser (it is a property access).
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.consume_digits();
        }

        let text = &self.source[start..self.current_pos];
        // Only ASCII digits with at most one interior '.' reach this point.
        TokenKind::Number(text.parse::<f64>().unwrap_or(f64::NAN))
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.current_pos;

        while self.peek_char().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.source[start..self.current_pos];

        lookup_keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Eof))
            .collect()
    }

    fn errors(source: &str) -> Vec<ErrorKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = tokenize("var fun return if else while for class this super break");
        assert_eq!(tokens, vec![
            TokenKind::Var,
            TokenKind::Fun,
            TokenKind::Return,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::For,
            TokenKind::Class,
            TokenKind::This,
            TokenKind::Super,
            TokenKind::Break,
        ]);
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("+ - * / = == != < <= > >= ! ? :");
        assert_eq!(tokens, vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::BangEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Bang,
            TokenKind::Question,
            TokenKind::Colon,
        ]);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("42 3.14 0 100.0");
        assert_eq!(tokens, vec![
            TokenKind::Number(42.0),
            TokenKind::Number(3.14),
            TokenKind::Number(0.0),
            TokenKind::Number(100.0),
        ]);
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        let tokens = tokenize("12.foo");
        assert_eq!(tokens, vec![
            TokenKind::Number(12.0),
            TokenKind::Dot,
            TokenKind::Ident("foo".to_string()),
        ]);
    }

    #[test]
    fn test_strings_span_lines() {
        let mut lexer = Lexer::new("\"a\nb\" x");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("a\nb".to_string()));
        assert_eq!(tokens[1].span.line, 2);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("a // line\n/* block\n * comment */ b");
        assert_eq!(tokens, vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Ident("b".to_string()),
        ]);
    }

    #[test]
    fn test_spans() {
        let mut lexer = Lexer::new("var x;\n  print x;");
        let tokens = lexer.tokenize().unwrap();
        let print = &tokens[3];
        assert_eq!(print.kind, TokenKind::Print);
        assert_eq!(print.lexeme, "print");
        assert_eq!((print.span.line, print.span.column), (2, 3));
    }

    #[test]
    fn test_errors_are_collected() {
        assert_eq!(errors("@ x # y"), vec![
            ErrorKind::UnexpectedCharacter('@'),
            ErrorKind::UnexpectedCharacter('#'),
        ]);
        assert_eq!(errors("\"open"), vec![ErrorKind::UnterminatedString]);
        assert_eq!(errors("/* never closed"), vec![ErrorKind::UnterminatedComment]);
    }
}
