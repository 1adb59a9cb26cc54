//! Tokenizer for Carlae source text.
//!
//! Parentheses are always single-character tokens. A `#` starts a comment
//! running to the end of the line. Every other run of non-whitespace,
//! non-parenthesis characters is one atom token. Tokenizing never fails.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LParen,
    RParen,
    /// A numeric literal or a symbol; the parser decides which.
    Atom(String),
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Atom(text) => text,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        match text {
            "(" => Token::LParen,
            ")" => Token::RParen,
            _ => Token::Atom(text.to_string()),
        }
    }
}

pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '#' => {
                // Comment runs through the newline.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            ch if ch.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '#' {
                        break;
                    }
                    atom.push(ch);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_bare_tokens() {
        assert_eq!(texts(":= x 3"), vec![":=", "x", "3"]);
    }

    #[test]
    fn test_parens_split_adjacent_atoms() {
        assert_eq!(
            texts("(:= circle-area (function (r) (* 3.14 (* r r))))"),
            vec![
                "(", ":=", "circle-area", "(", "function", "(", "r", ")", "(", "*", "3.14", "(",
                "*", "r", "r", ")", ")", ")", ")"
            ]
        );
        assert_eq!(texts("(f)(g)"), vec!["(", "f", ")", "(", "g", ")"]);
    }

    #[test]
    fn test_comments_are_discarded() {
        let source = "(foo # this is ignored (\n  bar)# trailing";
        assert_eq!(texts(source), vec!["(", "foo", "bar", ")"]);
    }

    #[test]
    fn test_comment_terminates_atom() {
        assert_eq!(texts("abc#def\nghi"), vec!["abc", "ghi"]);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(tokenize("  \n\t  \n").is_empty());
        assert!(tokenize("").is_empty());
        assert!(tokenize("# only a comment").is_empty());
    }

    #[test]
    fn test_unbalanced_text_still_tokenizes() {
        assert_eq!(texts("((("), vec!["(", "(", "("]);
        assert_eq!(tokenize(")"), vec![Token::RParen]);
    }
}
