//! Statement boundary lexer.
//!
//! Classifies SQL text one character at a time and reports when a
//! terminating `;` has been seen outside of every comment, string and
//! quoted identifier, at parenthesis depth zero.

/// What the lexer was processing after the previous character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerState {
    Normal,
    LineComment,
    BlockComment,
    /// Inside `'...'`.
    StringLiteral,
    /// Inside `"..."`.
    AnsiQuotedIdentifier,
    /// Inside `` `...` ``.
    BackQuotedIdentifier,
    /// Inside `[...]`.
    BracketQuotedIdentifier,
    /// A full statement has been read. Terminal.
    Complete,
    /// The input can never form a statement. Terminal.
    Error,
}

impl LexerState {
    /// Returns true for states that consume no further input.
    pub fn is_terminal(self) -> bool {
        matches!(self, LexerState::Complete | LexerState::Error)
    }

    fn is_quoted(self) -> bool {
        matches!(
            self,
            LexerState::StringLiteral
                | LexerState::AnsiQuotedIdentifier
                | LexerState::BackQuotedIdentifier
                | LexerState::BracketQuotedIdentifier
        )
    }
}

/// Incremental statement boundary lexer.
///
/// Create one per statement, feed it fragments, and discard it once it
/// reaches [`LexerState::Complete`] or [`LexerState::Error`].
#[derive(Debug, Clone)]
pub struct StatementLexer {
    state: LexerState,
    paren_depth: usize,
    /// First half of a possible two-character token, waiting for its lookahead.
    /// Carried across `feed` calls so a token split between fragments is still seen.
    pending: Option<char>,
}

impl StatementLexer {
    /// Create a lexer positioned at the start of a statement.
    pub fn new() -> Self {
        Self {
            state: LexerState::Normal,
            paren_depth: 0,
            pending: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> LexerState {
        self.state
    }

    /// Current parenthesis nesting depth.
    pub fn paren_depth(&self) -> usize {
        self.paren_depth
    }

    pub fn is_complete(&self) -> bool {
        self.state == LexerState::Complete
    }

    pub fn is_error(&self) -> bool {
        self.state == LexerState::Error
    }

    /// Consume a fragment. A no-op once the lexer is in a terminal state;
    /// characters after the terminating `;` are left unread.
    pub fn feed(&mut self, fragment: &str) {
        for ch in fragment.chars() {
            if self.state.is_terminal() {
                break;
            }
            self.step(ch);
        }
    }

    fn step(&mut self, ch: char) {
        if let Some(first) = self.pending.take() {
            if self.complete_pair(first, ch) {
                return;
            }
        }
        self.dispatch(ch);
    }

    /// Resolve a pending character against its lookahead.
    ///
    /// Returns true when the lookahead was consumed as the second half of a
    /// token. Otherwise the lookahead still has to be dispatched.
    fn complete_pair(&mut self, first: char, next: char) -> bool {
        use LexerState::*;

        match (self.state, first, next) {
            // Doubled quote inside a string literal.
            (StringLiteral, '\'', '\'') => true,
            (StringLiteral, '\'', _) => {
                self.state = Normal;
                false
            }
            (Normal, '-', '-') | (Normal, '/', '/') => {
                self.state = LineComment;
                true
            }
            (Normal, '/', '*') => {
                self.state = BlockComment;
                true
            }
            (BlockComment, '*', '/') => {
                self.state = Normal;
                true
            }
            _ => false,
        }
    }

    fn dispatch(&mut self, ch: char) {
        use LexerState::*;

        match (self.state, ch) {
            (Normal, '\'') => self.state = StringLiteral,
            (StringLiteral, '\'') | (Normal, '-') | (Normal, '/') | (BlockComment, '*') => {
                self.pending = Some(ch);
            }

            (Normal, '"') => self.state = AnsiQuotedIdentifier,
            (AnsiQuotedIdentifier, '"') => self.state = Normal,
            (Normal, '`') => self.state = BackQuotedIdentifier,
            (BackQuotedIdentifier, '`') => self.state = Normal,
            (Normal, '[') => self.state = BracketQuotedIdentifier,
            (BracketQuotedIdentifier, ']') => self.state = Normal,
            (Normal, ']') => self.state = Error,

            (Normal, '(') => self.paren_depth += 1,
            (Normal, ')') => match self.paren_depth.checked_sub(1) {
                Some(depth) => self.paren_depth = depth,
                None => self.state = Error,
            },
            (Normal, ';') => {
                self.state = if self.paren_depth == 0 {
                    Complete
                } else {
                    Error
                };
            }

            (LineComment, '\n' | '\r') => self.state = Normal,
            (state, '\n' | '\r') if state.is_quoted() => self.state = Error,

            _ => {}
        }
    }
}

impl Default for StatementLexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a fresh lexer over `text` and return the state it ends in.
pub fn scan(text: &str) -> LexerState {
    let mut lexer = StatementLexer::new();
    lexer.feed(text);
    lexer.state()
}
