use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },

    #[error("Mismatched closing tag at {pos}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected closing tag </{found}> at {pos}")]
    UnexpectedEndTag { pos: usize, found: String },

    #[error("Element <{tag}> is never closed")]
    UnclosedTag { tag: String },

    #[error("Document has more than one root element (second at {pos})")]
    MultipleRoots { pos: usize },

    #[error("Text outside the root element at {pos}")]
    TextOutsideRoot { pos: usize },

    #[error("Invalid attribute at {pos}: {message}")]
    InvalidAttribute { pos: usize, message: String },

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    pub fn invalid_attribute(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            pos,
            message: message.into(),
        }
    }

    pub fn mismatched_tag(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }
}
