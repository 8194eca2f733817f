use super::{Dimension, Unit, UnitError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Star,
    Slash,
    Pow,
    Plus,
    Minus,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    lookup: &'a dyn Fn(&str) -> Option<Unit>,
}

enum Failure {
    Syntax(String),
    Unknown(String),
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('*' | '/') term)*
    fn expr(&mut self) -> Result<Unit, Failure> {
        let mut unit = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    unit = unit * self.term()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    unit = unit / self.term()?;
                }
                _ => return Ok(unit),
            }
        }
    }

    // term := primary ('**' ['+' | '-'] integer)?
    fn term(&mut self) -> Result<Unit, Failure> {
        let base = self.primary()?;
        if self.peek() != Some(&Token::Pow) {
            return Ok(base);
        }
        self.pos += 1;

        let negative = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                true
            }
            Some(Token::Plus) => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        match self.advance() {
            Some(Token::Number(n)) if n.fract() == 0.0 && n <= i8::MAX as f64 => {
                let exponent = n as i8;
                Ok(base.powi(if negative { -exponent } else { exponent }))
            }
            Some(Token::Number(n)) => Err(Failure::Syntax(format!(
                "exponent must be a small integer, got {n}"
            ))),
            _ => Err(Failure::Syntax("expected an exponent after '**'".into())),
        }
    }

    // primary := identifier | number | '(' expr ')'
    fn primary(&mut self) -> Result<Unit, Failure> {
        match self.advance() {
            Some(Token::Ident(name)) => {
                (self.lookup)(&name).ok_or(Failure::Unknown(name))
            }
            Some(Token::Number(n)) => Ok(Unit::new(n, Dimension::NONE)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(Failure::Syntax("unbalanced parentheses".into())),
                }
            }
            Some(token) => Err(Failure::Syntax(format!("unexpected token {token:?}"))),
            None => Err(Failure::Syntax("unexpected end of expression".into())),
        }
    }
}

/// Parses a unit expression, resolving identifiers through `lookup`.
pub(super) fn parse(
    expression: &str,
    lookup: &dyn Fn(&str) -> Option<Unit>,
) -> Result<Unit, UnitError> {
    let syntax = |reason: String| UnitError::Syntax {
        expression: expression.to_string(),
        reason,
    };

    let tokens = tokenize(expression).map_err(syntax)?;
    if tokens.is_empty() {
        return Err(syntax("empty unit expression".into()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        lookup,
    };
    let unit = parser.expr().map_err(|failure| match failure {
        Failure::Syntax(reason) => syntax(reason),
        Failure::Unknown(name) => UnitError::UnknownUnit(name),
    })?;

    if parser.pos < parser.tokens.len() {
        return Err(syntax(format!(
            "trailing input starting at {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<Unit> {
        match name {
            "m" => Some(Unit::new(10.0, Dimension::LENGTH)),
            "s" => Some(Unit::new(2.0, Dimension::TIME)),
            "kg" => Some(Unit::new(3.0, Dimension::MASS)),
            _ => None,
        }
    }

    #[test]
    fn parse_handles_products_quotients_and_powers() {
        let unit = parse("kg * m / s**2", &lookup).unwrap();
        assert_eq!(unit.dimension, Dimension::FORCE);
        assert_eq!(unit.factor, 3.0 * 10.0 / 4.0);
    }

    #[test]
    fn parse_accepts_caret_and_negative_exponents() {
        let unit = parse("m s^-1", &lookup);
        assert!(unit.is_err());
        let unit = parse("m * s^-1", &lookup).unwrap();
        assert_eq!(unit.dimension, Dimension::VELOCITY);
    }

    #[test]
    fn parse_respects_parentheses() {
        let grouped = parse("kg/(m*s)", &lookup).unwrap();
        assert_eq!(grouped.dimension, Dimension::new(1, -1, -1, 0));
        let flat = parse("kg/m*s", &lookup).unwrap();
        assert_eq!(flat.dimension, Dimension::new(1, -1, 1, 0));
    }

    #[test]
    fn parse_scales_by_numeric_literals() {
        let unit = parse("1e3 * m", &lookup).unwrap();
        assert_eq!(unit.factor, 1e4);
        assert_eq!(unit.dimension, Dimension::LENGTH);
    }

    #[test]
    fn parse_reports_unknown_units_and_syntax_errors() {
        assert!(matches!(
            parse("furlong", &lookup),
            Err(UnitError::UnknownUnit(name)) if name == "furlong"
        ));
        assert!(matches!(parse("(m", &lookup), Err(UnitError::Syntax { .. })));
        assert!(matches!(parse("", &lookup), Err(UnitError::Syntax { .. })));
        assert!(matches!(parse("m ** 1.5", &lookup), Err(UnitError::Syntax { .. })));
        assert!(matches!(parse("m $", &lookup), Err(UnitError::Syntax { .. })));
    }
}
