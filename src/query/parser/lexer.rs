// SQL Lexer Implementation
//
// This module implements a lexer for the SELECT dialect: keywords, quoted and
// backtick identifiers, numeric and string literals, operators and comments.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// SQL Token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // Keywords
    SELECT,
    FROM,
    WHERE,
    AS,
    DISTINCT,
    ALL,
    JOIN,
    INNER,
    LEFT,
    RIGHT,
    FULL,
    OUTER,
    CROSS,
    NATURAL,
    StraightJoin,
    ON,
    USING,
    GROUP,
    BY,
    HAVING,
    ORDER,
    ASC,
    DESC,
    LIMIT,
    OFFSET,
    UNION,
    AND,
    OR,
    XOR,
    NOT,
    IS,
    NULL,
    TRUE,
    FALSE,
    UNKNOWN,
    IN,
    BETWEEN,
    LIKE,
    ESCAPE,
    EXISTS,
    CASE,
    WHEN,
    THEN,
    ELSE,
    END,

    // Literals
    STRING(String),
    INTEGER(i64),
    UNSIGNED(u64),
    DECIMAL(String),
    FLOAT(f64),

    // Identifiers
    IDENTIFIER(String),

    // Operators
    EQUALS,         // =
    LessThan,       // <
    GreaterThan,    // >
    LessEqual,      // <=
    GreaterEqual,   // >=
    NotEqual,       // <> or !=
    PLUS,           // +
    MINUS,          // -
    MULTIPLY,       // *
    DIVIDE,         // /
    MODULO,         // %
    LogicalAnd,     // &&
    LogicalOr,      // ||
    BANG,           // !

    // Punctuation
    SEMICOLON,      // ;
    COMMA,          // ,
    LeftParen,      // (
    RightParen,     // )
    DOT,            // .

    // Special
    EOF,
    ILLEGAL(String),
}

/// A Token represents a lexical unit in the SQL query
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' at line {}, column {}", self.literal, self.line, self.column)
    }
}

/// SQL Lexer for breaking a query string into tokens
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    ch: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from a SQL query string
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().peekable(),
            line: 1,
            column: 0,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    /// Tokenize the whole input, ending with `EOF`
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.token_type == TokenType::EOF;
            tokens.push(token);
            if is_eof {
                return tokens;
            }
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.next();
        self.ch = ch;

        if let Some(c) = ch {
            self.column += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            }
        }

        ch
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        loop {
            let next = self.peek_char();
            match self.ch {
                Some(ch) if ch.is_whitespace() => {
                    self.read_char();
                }
                Some('#') => self.skip_line(),
                Some('-') if next == Some('-') => self.skip_line(),
                Some('/') if next == Some('*') => {
                    self.read_char();
                    self.read_char();
                    while let Some(ch) = self.ch {
                        if ch == '*' && self.peek_char() == Some('/') {
                            self.read_char();
                            self.read_char();
                            break;
                        }
                        self.read_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.ch {
            if ch == '\n' {
                break;
            }
            self.read_char();
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        if let Some(ch) = self.ch {
            identifier.push(ch);
        }

        while let Some(next_ch) = self.peek_char() {
            if is_letter(next_ch) || next_ch.is_ascii_digit() || next_ch == '$' {
                identifier.push(next_ch);
                self.read_char();
            } else {
                break;
            }
        }

        self.read_char();
        identifier
    }

    /// Read a number: digits, an optional fraction and an optional exponent
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut has_dot = false;

        if let Some(ch) = self.ch {
            number.push(ch);
            has_dot = ch == '.';
        }

        while let Some(next_ch) = self.peek_char() {
            if next_ch.is_ascii_digit() {
                number.push(next_ch);
                self.read_char();
            } else if next_ch == '.' && !has_dot {
                has_dot = true;
                number.push(next_ch);
                self.read_char();
            } else if next_ch == 'e' || next_ch == 'E' {
                number.push(next_ch);
                self.read_char();
                if let Some(sign) = self.peek_char().filter(|c| *c == '+' || *c == '-') {
                    number.push(sign);
                    self.read_char();
                }
                while let Some(digit) = self.peek_char().filter(|c| c.is_ascii_digit()) {
                    number.push(digit);
                    self.read_char();
                }
                break;
            } else {
                break;
            }
        }

        self.read_char();
        number
    }

    /// Read a quoted string or identifier. A doubled quote stands for the
    /// quote itself; backslash escapes apply to strings only.
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        let mut string = String::new();

        // Skip opening quote which is in self.ch
        self.read_char();

        while let Some(ch) = self.ch {
            if ch == quote {
                if self.peek_char() == Some(quote) {
                    string.push(quote);
                    self.read_char();
                    self.read_char();
                    continue;
                }
                self.read_char();
                return Some(string);
            } else if ch == '\\' && quote != '`' {
                self.read_char();
                match self.ch {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('r') => string.push('\r'),
                    Some('0') => string.push('\0'),
                    // LIKE patterns keep their escapes
                    Some(c @ ('%' | '_')) => {
                        string.push('\\');
                        string.push(c);
                    }
                    Some(c) => string.push(c),
                    None => return None,
                }
                self.read_char();
            } else {
                string.push(ch);
                self.read_char();
            }
        }

        None
    }

    /// Get the token type for an identifier (could be a keyword)
    fn lookup_identifier(&self, ident: &str) -> TokenType {
        match ident.to_uppercase().as_str() {
            "SELECT" => TokenType::SELECT,
            "FROM" => TokenType::FROM,
            "WHERE" => TokenType::WHERE,
            "AS" => TokenType::AS,
            "DISTINCT" => TokenType::DISTINCT,
            "ALL" => TokenType::ALL,
            "JOIN" => TokenType::JOIN,
            "INNER" => TokenType::INNER,
            "LEFT" => TokenType::LEFT,
            "RIGHT" => TokenType::RIGHT,
            "FULL" => TokenType::FULL,
            "OUTER" => TokenType::OUTER,
            "CROSS" => TokenType::CROSS,
            "NATURAL" => TokenType::NATURAL,
            "STRAIGHT_JOIN" => TokenType::StraightJoin,
            "ON" => TokenType::ON,
            "USING" => TokenType::USING,
            "GROUP" => TokenType::GROUP,
            "BY" => TokenType::BY,
            "HAVING" => TokenType::HAVING,
            "ORDER" => TokenType::ORDER,
            "ASC" => TokenType::ASC,
            "DESC" => TokenType::DESC,
            "LIMIT" => TokenType::LIMIT,
            "OFFSET" => TokenType::OFFSET,
            "UNION" => TokenType::UNION,
            "AND" => TokenType::AND,
            "OR" => TokenType::OR,
            "XOR" => TokenType::XOR,
            "NOT" => TokenType::NOT,
            "IS" => TokenType::IS,
            "NULL" => TokenType::NULL,
            "TRUE" => TokenType::TRUE,
            "FALSE" => TokenType::FALSE,
            "UNKNOWN" => TokenType::UNKNOWN,
            "IN" => TokenType::IN,
            "BETWEEN" => TokenType::BETWEEN,
            "LIKE" => TokenType::LIKE,
            "ESCAPE" => TokenType::ESCAPE,
            "EXISTS" => TokenType::EXISTS,
            "CASE" => TokenType::CASE,
            "WHEN" => TokenType::WHEN,
            "THEN" => TokenType::THEN,
            "ELSE" => TokenType::ELSE,
            "END" => TokenType::END,
            _ => TokenType::IDENTIFIER(ident.to_string()),
        }
    }

    fn number_token(number: &str) -> TokenType {
        if number.contains(['e', 'E']) {
            number
                .parse::<f64>()
                .map(TokenType::FLOAT)
                .unwrap_or_else(|_| TokenType::ILLEGAL(number.to_string()))
        } else if number.contains('.') {
            TokenType::DECIMAL(number.to_string())
        } else if let Ok(value) = number.parse::<i64>() {
            TokenType::INTEGER(value)
        } else if let Ok(value) = number.parse::<u64>() {
            TokenType::UNSIGNED(value)
        } else {
            TokenType::DECIMAL(number.to_string())
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let mut token = Token {
            token_type: TokenType::EOF,
            literal: String::new(),
            line: self.line,
            column: self.column,
        };

        let ch = match self.ch {
            Some(ch) => ch,
            None => return token,
        };
        token.literal = ch.to_string();

        match ch {
            ';' => token.token_type = TokenType::SEMICOLON,
            ',' => token.token_type = TokenType::COMMA,
            '(' => token.token_type = TokenType::LeftParen,
            ')' => token.token_type = TokenType::RightParen,
            '+' => token.token_type = TokenType::PLUS,
            '-' => token.token_type = TokenType::MINUS,
            '*' => token.token_type = TokenType::MULTIPLY,
            '/' => token.token_type = TokenType::DIVIDE,
            '%' => token.token_type = TokenType::MODULO,
            '=' => token.token_type = TokenType::EQUALS,
            '.' => {
                if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    let number = self.read_number();
                    token.token_type = Self::number_token(&number);
                    token.literal = number;
                    return token;
                }
                token.token_type = TokenType::DOT;
            }
            '<' => match self.peek_char() {
                Some('=') => {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::LessEqual;
                }
                Some('>') => {
                    self.read_char();
                    token.literal.push('>');
                    token.token_type = TokenType::NotEqual;
                }
                _ => token.token_type = TokenType::LessThan,
            },
            '>' => match self.peek_char() {
                Some('=') => {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::GreaterEqual;
                }
                _ => token.token_type = TokenType::GreaterThan,
            },
            '!' => match self.peek_char() {
                Some('=') => {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::NotEqual;
                }
                _ => token.token_type = TokenType::BANG,
            },
            '&' if self.peek_char() == Some('&') => {
                self.read_char();
                token.literal.push('&');
                token.token_type = TokenType::LogicalAnd;
            }
            '|' if self.peek_char() == Some('|') => {
                self.read_char();
                token.literal.push('|');
                token.token_type = TokenType::LogicalOr;
            }
            '\'' | '"' => {
                token.token_type = match self.read_quoted(ch) {
                    Some(value) => {
                        token.literal = format!("{}{}{}", ch, value, ch);
                        TokenType::STRING(value)
                    }
                    None => TokenType::ILLEGAL("unterminated string".to_string()),
                };
                return token;
            }
            '`' => {
                token.token_type = match self.read_quoted('`') {
                    Some(value) => {
                        token.literal = value.clone();
                        TokenType::IDENTIFIER(value)
                    }
                    None => TokenType::ILLEGAL("unterminated identifier".to_string()),
                };
                return token;
            }
            _ => {
                if is_letter(ch) {
                    let identifier = self.read_identifier();
                    token.token_type = self.lookup_identifier(&identifier);
                    token.literal = identifier;
                    return token;
                } else if ch.is_ascii_digit() {
                    let number = self.read_number();
                    token.token_type = Self::number_token(&number);
                    token.literal = number;
                    return token;
                } else {
                    token.token_type = TokenType::ILLEGAL(ch.to_string());
                }
            }
        }

        self.read_char();
        token
    }
}

/// Check if a character can start an identifier
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
