use super::{Filter, Operator};
use crate::{stmt::Value, Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Quoted(String),
    Str(String),
    Number(String),
    Op(Operator),
    Comma,
    LParen,
    RParen,
}

impl Filter {
    /// Parses the filter language of view descriptors.
    ///
    /// ```text
    /// expr      := term (OR term)*
    /// term      := factor (AND factor)*
    /// factor    := NOT factor | '(' expr ')' | predicate
    /// predicate := name (op operand | IS [NOT] NULL | IN '(' literal, ... ')')
    /// ```
    ///
    /// Names resolve against `columns` case-insensitively; `id_name` and
    /// `version_name` produce id and version filters. An operand is a
    /// literal or another column name.
    pub fn parse(text: &str, columns: &[&str], id_name: &str, version_name: &str) -> Result<Filter> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            columns,
            id_name,
            version_name,
        };
        let filter = parser.expr()?;

        if let Some(token) = parser.peek() {
            return Err(Error::invalid_filter(format!(
                "unexpected {token:?} in filter: {text}"
            )));
        }
        Ok(filter)
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    columns: &'a [&'a str],
    id_name: &'a str,
    version_name: &'a str,
}

enum Name {
    Id,
    Version,
    Column(String),
}

impl Parser<'_> {
    fn expr(&mut self) -> Result<Filter> {
        let mut terms = vec![self.term()?];
        while self.eat_keyword("or") {
            terms.push(self.term()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Filter::or(terms)
        })
    }

    fn term(&mut self) -> Result<Filter> {
        let mut factors = vec![self.factor()?];
        while self.eat_keyword("and") {
            factors.push(self.factor()?);
        }
        Ok(if factors.len() == 1 {
            factors.remove(0)
        } else {
            Filter::and(factors)
        })
    }

    fn factor(&mut self) -> Result<Filter> {
        if self.eat_keyword("not") {
            return Ok(Filter::not(self.factor()?));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        if self.eat_keyword("true") {
            return Ok(Filter::True);
        }
        if self.eat_keyword("false") {
            return Ok(Filter::False);
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Filter> {
        let name = match self.next() {
            Some(Token::Ident(name)) | Some(Token::Quoted(name)) => name,
            other => {
                return Err(Error::invalid_filter(format!(
                    "expected a column name, found {other:?}"
                )))
            }
        };
        let target = self.resolve(&name)?;

        if self.eat_keyword("is") {
            let negate = self.eat_keyword("not");
            if !self.eat_keyword("null") {
                return Err(Error::invalid_filter(format!("expected NULL after {name} IS")));
            }
            let Name::Column(column) = target else {
                return Err(Error::invalid_filter(format!("{name} can not be null")));
            };
            return Ok(if negate {
                Filter::not_null(column)
            } else {
                Filter::is_null(column)
            });
        }

        if self.eat_keyword("in") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.literal()?);
            }
            self.expect(Token::RParen)?;

            return match target {
                Name::Id => Ok(Filter::id_in(to_ids(&name, &values)?)),
                Name::Version => Err(Error::invalid_filter("version does not support IN")),
                Name::Column(column) => Ok(Filter::ColumnValue {
                    column,
                    op: Operator::In,
                    values,
                }),
            };
        }

        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(Token::Ident(word)) => keyword_operator(&word).ok_or_else(|| {
                Error::invalid_filter(format!("unknown operator {word} after {name}"))
            })?,
            other => {
                return Err(Error::invalid_filter(format!(
                    "expected an operator after {name}, found {other:?}"
                )))
            }
        };

        // A column name on the right compares two columns.
        if let Some(Token::Ident(other)) | Some(Token::Quoted(other)) = self.peek().cloned() {
            if !is_literal_keyword(&other) {
                self.pos += 1;
                let Name::Column(column) = target else {
                    return Err(Error::invalid_filter(format!(
                        "{name} can only be compared with a constant"
                    )));
                };
                let Name::Column(other) = self.resolve(&other)? else {
                    return Err(Error::invalid_filter(format!(
                        "{other} can only be compared with a constant"
                    )));
                };
                return Ok(Filter::compare_columns(column, op, other));
            }
        }

        let value = self.literal()?;
        match target {
            Name::Id => Ok(Filter::Id {
                op,
                ids: to_ids(&name, &[value])?,
            }),
            Name::Version => {
                let ids = to_ids(&name, &[value])?;
                Ok(Filter::compare_version(op, ids[0]))
            }
            Name::Column(column) => Ok(Filter::ColumnValue {
                column,
                op,
                values: vec![value],
            }),
        }
    }

    fn literal(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Str(text)) => Ok(Value::String(text)),
            Some(Token::Number(text)) => {
                if let Ok(v) = text.parse::<i64>() {
                    Ok(Value::I64(v))
                } else {
                    text.parse::<f64>()
                        .map(Value::F64)
                        .map_err(|_| Error::invalid_filter(format!("invalid number: {text}")))
                }
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(Error::invalid_filter(format!(
                "expected a constant, found {other:?}"
            ))),
        }
    }

    fn resolve(&self, name: &str) -> Result<Name> {
        if name.eq_ignore_ascii_case(self.id_name) {
            return Ok(Name::Id);
        }
        if name.eq_ignore_ascii_case(self.version_name) {
            return Ok(Name::Version);
        }
        self.columns
            .iter()
            .find(|column| column.eq_ignore_ascii_case(name))
            .map(|column| Name::Column(column.to_string()))
            .ok_or_else(|| Error::invalid_filter(format!("unknown column in filter: {name}")))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(Error::invalid_filter(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }
}

fn keyword_operator(word: &str) -> Option<Operator> {
    match word.to_ascii_lowercase().as_str() {
        "starts" => Some(Operator::Starts),
        "contains" => Some(Operator::Contains),
        "ends" => Some(Operator::Ends),
        _ => None,
    }
}

fn is_literal_keyword(word: &str) -> bool {
    word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false")
}

fn to_ids(name: &str, values: &[Value]) -> Result<Vec<i64>> {
    values
        .iter()
        .map(|value| {
            value
                .to_i64()
                .filter(|_| !matches!(value, Value::Bool(_)))
                .ok_or_else(|| Error::invalid_filter(format!("{name} needs an integer, got {value:?}")))
        })
        .collect()
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = vec![];
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(Operator::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(Operator::Ne));
                i += 2;
            }
            '<' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => (Operator::Le, 2),
                    Some('>') => (Operator::Ne, 2),
                    _ => (Operator::Lt, 1),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            '>' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => (Operator::Ge, 2),
                    _ => (Operator::Gt, 1),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(Error::invalid_filter(format!(
                                "unterminated quote in filter: {text}"
                            )))
                        }
                        Some(&ch) if ch == quote => {
                            if chars.get(i + 1) == Some(&quote) {
                                value.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(if quote == '\'' {
                    Token::Str(value)
                } else {
                    Token::Quoted(value)
                });
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                i += 1;
                while chars.get(i).is_some_and(|ch| ch.is_ascii_digit() || *ch == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while chars.get(i).is_some_and(|ch| ch.is_alphanumeric() || *ch == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(Error::invalid_filter(format!(
                    "unexpected character '{other}' in filter: {text}"
                )))
            }
        }
    }
    Ok(tokens)
}
