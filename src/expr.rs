use crate::error::{Error, Result};

/// Arithmetic expression over named variables, parsed once per LCPI
/// definition and evaluated per hotspot with a variable-resolution callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    /// Parse a formula with the usual precedence: `*` and `/` bind tighter
    /// than `+` and `-`, unary minus binds tightest, parentheses group.
    pub fn parse(input: &str) -> Result<Expr> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        if parser.pos != parser.tokens.len() {
            return Err(Error::ParseError(format!(
                "unexpected trailing input in '{}'",
                input
            )));
        }
        Ok(expr)
    }

    /// Collect the free variables, each name once, in first-use order
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_variables(names),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
        }
    }

    /// Evaluate with IEEE double semantics; division by zero yields
    /// inf/NaN, which callers must tolerate
    pub fn eval(&self, resolve: &dyn Fn(&str) -> f64) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Variable(name) => resolve(name),
            Expr::Neg(inner) => -inner.eval(resolve),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(resolve);
                let r = rhs.eval(resolve);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                        literal.push(c);
                        chars.next();
                        // exponent sign
                        if (literal.ends_with('e') || literal.ends_with('E'))
                            && matches!(chars.peek(), Some('+') | Some('-'))
                        {
                            if let Some(sign) = chars.next() {
                                literal.push(sign);
                            }
                        }
                    } else {
                        break;
                    }
                }
                let value = literal.parse::<f64>().map_err(|_| {
                    Error::ParseError(format!("invalid number literal '{}'", literal))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => {
                return Err(Error::ParseError(format!(
                    "unexpected character '{}'",
                    other
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinaryOp::Add),
            Some(Token::Minus) => Some(BinaryOp::Sub),
            _ => None,
        } {
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.factor()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinaryOp::Mul),
            Some(Token::Slash) => Some(BinaryOp::Div),
            _ => None,
        } {
            self.advance();
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.factor()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.factor()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(Error::ParseError("missing closing parenthesis".to_string())),
                }
            }
            other => Err(Error::ParseError(format!(
                "expected operand, found {:?}",
                other
            ))),
        }
    }
}
