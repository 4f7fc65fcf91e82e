use regex::Regex;
use crate::core::error::{Error, Result};
use crate::query::ast::{BoolQuery, Occur, Query};

const RESERVED: &[char] = &['(', ')', '[', ']', '{', '}', '^', '~', ':', '\\', '/'];

/// Keyword query parser.
/// Examples:
/// - "ownership borrow" -> OR of both terms
/// - "ownership AND borrow" -> both required
/// - "+ownership -unsafe" -> required / prohibited
/// - "\"borrow checker\"" -> phrase
pub struct QueryParser {
    sanitize: Option<Sanitizer>,
}

struct Sanitizer {
    non_alphanumeric: Regex,
    whitespace: Regex,
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Word { text: String, modifier: Option<Occur> },
    Phrase { text: String, modifier: Option<Occur> },
    And,
    Or,
    Not,
}

impl QueryParser {
    pub fn new() -> Self {
        QueryParser { sanitize: None }
    }

    /// Parser that first replaces every non-alphanumeric character with a
    /// space, so free text never fails to parse.
    pub fn sanitizing() -> Result<Self> {
        let non_alphanumeric = Regex::new("[^a-zA-Z0-9 ]")
            .map_err(|e| Error::config(format!("sanitizer pattern: {}", e)))?;
        let whitespace = Regex::new(r"\s+")
            .map_err(|e| Error::config(format!("sanitizer pattern: {}", e)))?;
        Ok(QueryParser {
            sanitize: Some(Sanitizer { non_alphanumeric, whitespace }),
        })
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        let cleaned;
        let input = match &self.sanitize {
            Some(s) => {
                let replaced = s.non_alphanumeric.replace_all(input, " ");
                cleaned = s.whitespace.replace_all(&replaced, " ").trim().to_string();
                cleaned.as_str()
            }
            None => input,
        };

        let lexemes = lex(input)?;
        build(lexemes, input)
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

fn lex(input: &str) -> Result<Vec<Lexeme>> {
    let chars: Vec<char> = input.chars().collect();
    let mut lexemes = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if RESERVED.contains(&c) {
            return Err(Error::query_parse(format!(
                "reserved character '{}' at position {} must be escaped", c, i
            )));
        }

        let modifier = match c {
            '+' => Some(Occur::Must),
            '-' => Some(Occur::MustNot),
            _ => None,
        };
        if modifier.is_some() {
            i += 1;
            if i >= chars.len() || chars[i].is_whitespace() {
                return Err(Error::query_parse(format!("dangling modifier '{}' at position {}", c, i - 1)));
            }
        }

        if chars[i] == '"' {
            let start = i;
            i += 1;
            let body_start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(Error::query_parse(format!("unterminated phrase starting at position {}", start)));
            }
            let text: String = chars[body_start..i].iter().collect();
            i += 1;
            lexemes.push(Lexeme::Phrase { text, modifier });
            continue;
        }

        let start = i;
        while i < chars.len()
            && !chars[i].is_whitespace()
            && chars[i] != '"'
            && !RESERVED.contains(&chars[i])
        {
            i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        if text.is_empty() {
            // a modifier directly followed by a reserved character
            return Err(Error::query_parse(format!("dangling modifier at position {}", start)));
        }

        let lexeme = match (text.as_str(), modifier) {
            ("AND", None) => Lexeme::And,
            ("OR", None) => Lexeme::Or,
            ("NOT", None) => Lexeme::Not,
            _ => Lexeme::Word { text, modifier },
        };
        lexemes.push(lexeme);
    }

    Ok(lexemes)
}

fn build(lexemes: Vec<Lexeme>, input: &str) -> Result<Query> {
    let mut clauses: Vec<(Occur, Query)> = Vec::new();
    let mut pending_and = false;
    let mut pending_or = false;
    let mut pending_not = false;

    for lexeme in lexemes {
        match lexeme {
            Lexeme::And | Lexeme::Or => {
                let name = if lexeme == Lexeme::And { "AND" } else { "OR" };
                if clauses.is_empty() || pending_and || pending_or || pending_not {
                    return Err(Error::query_parse(format!("dangling operator {} in '{}'", name, input)));
                }
                if lexeme == Lexeme::And {
                    if let Some(last) = clauses.last_mut() {
                        if last.0 == Occur::Should {
                            last.0 = Occur::Must;
                        }
                    }
                    pending_and = true;
                } else {
                    pending_or = true;
                }
            }
            Lexeme::Not => {
                if pending_not {
                    return Err(Error::query_parse(format!("dangling operator NOT in '{}'", input)));
                }
                pending_not = true;
            }
            Lexeme::Phrase { text, .. } if text.trim().is_empty() => {
                // empty phrase contributes nothing
                pending_and = false;
                pending_or = false;
                pending_not = false;
            }
            Lexeme::Word { text, modifier } => {
                let occur = resolve_occur(modifier, pending_and, pending_not);
                clauses.push((occur, Query::term(&text)));
                pending_and = false;
                pending_or = false;
                pending_not = false;
            }
            Lexeme::Phrase { text, modifier } => {
                let occur = resolve_occur(modifier, pending_and, pending_not);
                clauses.push((occur, Query::phrase(&text)));
                pending_and = false;
                pending_or = false;
                pending_not = false;
            }
        }
    }

    if pending_and || pending_or || pending_not {
        return Err(Error::query_parse(format!("query '{}' ends with an operator", input)));
    }
    if clauses.is_empty() {
        return Err(Error::query_parse(format!("empty query '{}'", input)));
    }

    if clauses.len() == 1 && clauses[0].0 == Occur::Should {
        return Ok(clauses.remove(0).1);
    }

    let mut bool_query = BoolQuery::new();
    for (occur, query) in clauses {
        bool_query.add(occur, query);
    }
    Ok(Query::Bool(bool_query))
}

fn resolve_occur(modifier: Option<Occur>, pending_and: bool, pending_not: bool) -> Occur {
    match modifier {
        Some(occur) => occur,
        None if pending_not => Occur::MustNot,
        None if pending_and => Occur::Must,
        None => Occur::Should,
    }
}
