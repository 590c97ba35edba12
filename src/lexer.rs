//! Lexical analysis of a single command line.
//!
//! A line is split on spaces and tabs only. A run of non-separator characters
//! is a control operator when it is *exactly* one of `;`, `&`, `|`, `>` or `<`,
//! otherwise it is a plain word. There is no quoting: `a;b` is one word.

/// Characters that separate tokens.
const TOKEN_SEPARATORS: [char; 2] = [' ', '\t'];

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// A plain word: a program name, an argument or a redirection target.
    Word(&'a str),
    /// The sequence operator, `;`.
    Semicolon,
    /// The background operator, `&`.
    Ampersand,
    /// The pipe operator, `|`.
    PipeOp,
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
}

impl<'a> Token<'a> {
    fn classify(text: &'a str) -> Self {
        match text {
            ";" => Token::Semicolon,
            "&" => Token::Ampersand,
            "|" => Token::PipeOp,
            "<" => Token::RedirectLeft,
            ">" => Token::RedirectRight,
            word => Token::Word(word),
        }
    }

    /// The source text of the token.
    ///
    /// Used when an operator has to be demoted to an ordinary argument.
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Word(word) => word,
            Token::Semicolon => ";",
            Token::Ampersand => "&",
            Token::PipeOp => "|",
            Token::RedirectLeft => "<",
            Token::RedirectRight => ">",
        }
    }
}

/// Lazy token stream over a borrowed line.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let trimmed = self.rest.trim_start_matches(TOKEN_SEPARATORS);
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(TOKEN_SEPARATORS).unwrap_or(trimmed.len());
        let (text, rest) = trimmed.split_at(end);
        self.rest = rest;
        let token = Token::classify(text);
        tracing::trace!(?token, "lexed token");
        Some(token)
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}

/// Splits `line` into tokens without allocating.
pub fn split_into_tokens(line: &str) -> Tokens<'_> {
    Tokens { rest: line }
}
