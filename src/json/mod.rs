pub mod scanner;
pub mod shadow;
pub mod token;

pub use scanner::{JsonScanner, Parent, ScanSession};
pub use token::{JsonError, Token, TokenKind, Tokenizer};

pub mod prelude {
    pub use super::{JsonError, JsonScanner, Parent, ScanSession, TokenKind};
}
