use logos::{Lexer, Logos};
use std::fmt;

/// Markup tokens for the XML subset used by MLT project files.
///
/// Start tags are lexed whole (name and attributes included) and split
/// by the parser; quoted attribute values may contain `>`.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// `<?xml ... ?>` and other processing instructions
    #[token("<?", |lex| skip_until(lex, "?>"))]
    ProcessingInstruction,

    #[token("<!--", |lex| skip_until(lex, "-->"))]
    Comment,

    #[token("<![CDATA[", cdata)]
    CData(&'src str),

    /// `<!DOCTYPE ...>` and friends
    #[regex(r"<![A-Za-z]", |lex| skip_until(lex, ">"))]
    Declaration,

    #[regex(r#"<[A-Za-z_:][^<>"']*(("[^"]*"|'[^']*')[^<>"']*)*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[^<>]+>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

fn skip_until<'src>(lex: &mut Lexer<'src, Token<'src>>, terminator: &str) -> bool {
    match lex.remainder().find(terminator) {
        Some(end) => {
            lex.bump(end + terminator.len());
            true
        }
        None => false,
    }
}

fn cdata<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<&'src str> {
    let end = lex.remainder().find("]]>")?;
    let content = &lex.remainder()[..end];
    lex.bump(end + 3);
    Some(content)
}

impl<'src> Token<'src> {
    /// Tokens that carry no content for the tree
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::ProcessingInstruction | Token::Comment | Token::Declaration
        )
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::ProcessingInstruction => write!(f, "processing instruction"),
            Token::Comment => write!(f, "comment"),
            Token::CData(_) => write!(f, "CDATA section"),
            Token::Declaration => write!(f, "declaration"),
            Token::StartTag(s) => write!(f, "start tag {}", s),
            Token::EndTag(s) => write!(f, "end tag {}", s),
            Token::Text(_) => write!(f, "text"),
        }
    }
}

/// Tokenize a source string.
///
/// Lexer failures are returned as `Err(offset)` entries so the parser can
/// report where the markup broke.
pub fn tokenize(source: &str) -> Vec<(Result<Token<'_>, usize>, std::ops::Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| (result.map_err(|_| span.start), span))
        .collect()
}
