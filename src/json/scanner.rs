#![allow(unsafe_code)]

//! System-wide JSON scanner with a resumable key search.
//!
//! Only one document is tokenized at a time: [`JsonScanner::start`] hands
//! out a [`ScanSession`] that owns the token array until it is dropped, and
//! refuses with [`JsonError::Busy`] in the meantime.

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::json::{JsonError, Token, TokenKind, Tokenizer};

/// Longest decimal text accepted by [`ScanSession::convert_uint`], exclusive.
pub const MAX_DEC_LEN: usize = 11;
/// Longest hex text accepted by [`ScanSession::convert_hex`], exclusive.
pub const MAX_HEX_LEN: usize = 8;

/// Cloud shadow documents carry a metadata object that is never read.
const METADATA_KEY: &str = ",\"metadata\":";

/// Parent constraint of a [`ScanSession::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Match the key anywhere after the cursor.
    Any,
    /// Match only direct children of the value found last.
    Next,
}

/// Token storage shared by every session.
///
/// # Const Generics
/// - `T`: token capacity
pub struct JsonScanner<const T: usize> {
    busy: AtomicBool,
    tokens: UnsafeCell<[Token; T]>,
}

// SAFETY: the token array is only reached through a `ScanSession`, and the
// busy flag allows one session at a time.
unsafe impl<const T: usize> Sync for JsonScanner<T> {}

impl<const T: usize> core::fmt::Debug for JsonScanner<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonScanner")
            .field("tokens", &T)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl<const T: usize> Default for JsonScanner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const T: usize> JsonScanner<T> {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            tokens: UnsafeCell::new([Token::EMPTY; T]),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Tokenizes `json` in a new session.
    ///
    /// Fails with [`JsonError::Busy`] while another session is open; the
    /// caller yields to its scheduler and tries again.
    pub fn start<'s, 'a>(&'s self, json: &'a str) -> Result<ScanSession<'s, 'a, T>, JsonError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| JsonError::Busy)?;
        // SAFETY: the busy flag was just taken, nothing else holds the array.
        let tokens = unsafe { &mut *self.tokens.get() };
        Ok(ScanSession::new(&self.busy, tokens, json))
    }
}

/// An open scan of one document. Dropping it releases the scanner.
///
/// The cursor starts after the root token with the root as parent. A failed
/// [`find`](Self::find) parks the cursor at zero, and every later search
/// fails until [`reset_index`](Self::reset_index) or
/// [`restore_index`](Self::restore_index).
pub struct ScanSession<'s, 'a, const T: usize> {
    busy: &'s AtomicBool,
    tokens: &'s mut [Token; T],
    json: &'a str,
    found: Result<usize, JsonError>,
    index: usize,
    next_parent: usize,
    saved_index: usize,
    saved_parent: usize,
}

impl<const T: usize> core::fmt::Debug for ScanSession<'_, '_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanSession")
            .field("found", &self.found)
            .field("index", &self.index)
            .field("next_parent", &self.next_parent)
            .finish_non_exhaustive()
    }
}

impl<const T: usize> Drop for ScanSession<'_, '_, T> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl<'s, 'a, const T: usize> ScanSession<'s, 'a, T> {
    fn new(busy: &'s AtomicBool, tokens: &'s mut [Token; T], json: &'a str) -> Self {
        let mut tokenizer = Tokenizer::new();
        let (json, found) = match json.find(METADATA_KEY) {
            Some(cut) => {
                let json = &json[..cut];
                (json, tokenizer.parse_with_tail(json.as_bytes(), b'}', &mut tokens[..]))
            }
            None => (json, tokenizer.parse(json.as_bytes(), &mut tokens[..])),
        };
        match found {
            Ok(n) => log::debug!("JSON tokens required: {}", n),
            Err(e) => log::error!("JSON status: {} ({})", e.code(), e),
        }

        let mut session = Self {
            busy,
            tokens,
            json,
            found,
            index: 0,
            next_parent: 0,
            saved_index: 0,
            saved_parent: 0,
        };
        session.reset_index();
        session
    }

    /// The scanned text, cut before any metadata.
    pub fn json(&self) -> &'a str {
        self.json
    }

    /// Token count, or the negative tokenizer error code.
    pub fn tokens_found(&self) -> i32 {
        match self.found {
            Ok(n) => n as i32,
            Err(e) => e.code(),
        }
    }

    pub fn result(&self) -> Result<usize, JsonError> {
        self.found
    }

    /// Whether tokenizing succeeded and the document is an object.
    pub fn valid(&self) -> bool {
        matches!(self.found, Ok(n) if n > 0) && self.tokens[0].kind == TokenKind::Object
    }

    fn count(&self) -> usize {
        self.found.unwrap_or(0)
    }

    fn text_of(&self, t: &Token) -> &'a str {
        let end = t.end.unwrap_or(t.start).min(self.json.len());
        self.json.get(t.start..end).unwrap_or("")
    }

    /// Searches forward for `"key": <value of kind>` and returns the index of
    /// the value token.
    pub fn find(&mut self, key: &str, kind: TokenKind, parent: Parent) -> Option<usize> {
        if self.index == 0 {
            return None;
        }
        let start = self.index;
        self.index = 0;
        for i in start..self.count().saturating_sub(1) {
            let t = &self.tokens[i];
            if t.kind == TokenKind::String
                && self.text_of(t) == key
                && self.tokens[i + 1].kind == kind
                && (parent == Parent::Any || t.parent == Some(self.next_parent))
            {
                log::debug!("Found '{}' at index {} with parent {:?}", key, i, t.parent);
                self.next_parent = i + 1;
                self.index = i + 2;
                return Some(i + 1);
            }
        }
        None
    }

    /// Cursor position, zero after a failed search.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset_index(&mut self) {
        self.index = 1;
        self.next_parent = 0;
    }

    pub fn save_index(&mut self) {
        self.saved_index = self.index;
        self.saved_parent = self.next_parent;
    }

    pub fn restore_index(&mut self) {
        self.index = self.saved_index;
        self.next_parent = self.saved_parent;
    }

    /// # Panics
    /// Panics if `index` is not below the token count.
    pub fn token(&self, index: usize) -> Token {
        assert!(
            index < self.count(),
            "Invalid index {} for {} tokens",
            index,
            self.count()
        );
        self.tokens[index]
    }

    pub fn kind(&self, index: usize) -> TokenKind {
        self.token(index).kind
    }

    /// Number of direct children.
    pub fn size(&self, index: usize) -> usize {
        self.token(index).size
    }

    pub fn strlen(&self, index: usize) -> usize {
        self.string(index).len()
    }

    /// Raw text of a token, escapes left in place.
    pub fn string(&self, index: usize) -> &'a str {
        self.text_of(&self.token(index))
    }

    /// Decimal value of a token, 0 when its text is too long.
    pub fn convert_uint(&self, index: usize) -> u32 {
        self.checked_uint(index).unwrap_or(0)
    }

    /// Decimal value of a token, `None` when its text is too long.
    ///
    /// Conversion stops at the first non-digit; values past `u32::MAX`
    /// saturate.
    pub fn checked_uint(&self, index: usize) -> Option<u32> {
        let text = self.string(index);
        if text.len() >= MAX_DEC_LEN {
            log::debug!("Decimal text of token {} is too long", index);
            return None;
        }
        let digits = text.trim_start().trim_start_matches('+');
        let value = digits
            .bytes()
            .take_while(u8::is_ascii_digit)
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'));
        Some(u32::try_from(value).unwrap_or(u32::MAX))
    }

    /// Hex value of a token (optional `0x` prefix), 0 when its text is too long.
    pub fn convert_hex(&self, index: usize) -> u32 {
        let text = self.string(index);
        if text.len() >= MAX_HEX_LEN {
            return 0;
        }
        let text = text.trim_start();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        digits
            .chars()
            .map_while(|c| c.to_digit(16))
            .fold(0u32, |acc, d| (acc << 4) | d)
    }
}
