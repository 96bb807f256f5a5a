//! Tokenizing text with the compiler's own scanner.

use crate::context::ProgramContext;
use crate::convert::Conversion;
use crate::convert::I32;
use crate::convert::STRING;
use crate::convert::SYNTAX_KIND;
use crate::error::BridgeError;
use crate::holder::Close;
use crate::holder::HandleId;
use crate::holder::ResourceHolder;
use crate::syntax_kind::SyntaxKind;
use core::cell::RefCell;
use core::fmt;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;
use std::rc::Weak;
use tracing::trace;

/// One scanned token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
  pub kind: SyntaxKind,
  pub start: u32,
  pub end: u32,
  pub text: String,
}

/// Closes a scanner's holder when its program context closes first.
struct ScannerCloser<'js>(Weak<RefCell<ResourceHolder<'js>>>);

impl Close for ScannerCloser<'_> {
  fn close(&mut self) -> Result<(), BridgeError> {
    let Some(holder) = self.0.upgrade() else {
      return Ok(());
    };
    let mut holder = holder.borrow_mut();
    if holder.is_closed() {
      return Ok(());
    }
    Ok(holder.close()?)
  }

  fn is_finished(&self) -> bool {
    match self.0.upgrade() {
      Some(holder) => {
        let closed = holder.borrow().is_closed();
        closed
      }
      None => true,
    }
  }
}

/// A scanner session over one text. The scanner's state is owned by the session: every
/// operation either moves it (`reset`, `scan_next`) or reads it.
///
/// The session closes itself when dropped, and is closed with its [`ProgramContext`] if that
/// closes first.
pub struct ScannerContext<'js> {
  cx: ProgramContext<'js>,
  holder: Rc<RefCell<ResourceHolder<'js>>>,
  scanner: HandleId,
  text: String,
}

fn offset(value: i32) -> Result<u32, BridgeError> {
  u32::try_from(value).map_err(|_| BridgeError::shape("text offset", format!("{value}")))
}

impl<'js> ScannerContext<'js> {
  pub(crate) fn open(cx: &ProgramContext<'js>, text: &str) -> Result<Self, BridgeError> {
    let factory = cx.scanner_factory()?;
    let source = cx.to_foreign(text)?;
    let scanner = cx
      .call_function(&factory, vec![source])
      .and_then(|value| {
        let actual = value.type_name();
        value
          .into_object()
          .ok_or_else(|| BridgeError::shape("scanner object", actual))
      })
      .map_err(|err| err.at("createScanner"))?;

    let mut holder = ResourceHolder::new("scanner");
    let handle = holder.retain_object(&scanner)?;
    let holder = Rc::new(RefCell::new(holder));
    cx.track(Box::new(ScannerCloser(Rc::downgrade(&holder))))?;

    let session = ScannerContext {
      cx: cx.clone(),
      holder,
      scanner: handle,
      text: text.to_owned(),
    };
    session.reset(0)?;
    trace!(len = text.len(), "opened scanner");
    Ok(session)
  }

  fn object(&self) -> Result<Object<'js>, BridgeError> {
    let value = self.holder.borrow().get(self.scanner)?;
    let actual = value.type_name();
    value
      .into_object()
      .ok_or_else(|| BridgeError::shape("scanner object", actual))
  }

  fn call<C: Conversion<'js>>(&self, method: &str, args: Vec<Value<'js>>, conversion: &C) -> Result<C::Output, BridgeError> {
    let run = || {
      let scanner = self.object()?;
      self.cx.call(&scanner, method, args, conversion)
    };
    run().map_err(|err| err.at("scanner"))
  }

  /// Repositions the scanner so the next [`ScannerContext::scan_next`] starts at `position`.
  pub fn reset(&self, position: u32) -> Result<(), BridgeError> {
    let position = self.cx.to_foreign(position)?;
    let scanner = self.object().map_err(|err| err.at("scanner"))?;
    self
      .cx
      .invoke(&scanner, "resetTokenState", vec![position])
      .map(drop)
      .map_err(|err| err.at("scanner"))
  }

  /// Advances past the next token and returns its kind.
  pub fn scan_next(&self) -> Result<SyntaxKind, BridgeError> {
    self.call("scan", Vec::new(), &SYNTAX_KIND)
  }

  /// Start of the current token, after leading trivia.
  pub fn token_start(&self) -> Result<u32, BridgeError> {
    offset(self.call("getTokenStart", Vec::new(), &I32)?)
  }

  pub fn token_end(&self) -> Result<u32, BridgeError> {
    offset(self.call("getTokenEnd", Vec::new(), &I32)?)
  }

  pub fn token_text(&self) -> Result<String, BridgeError> {
    self.call("getTokenText", Vec::new(), &STRING)
  }

  /// Scans the single token starting at `position`.
  pub fn token_at(&self, position: u32) -> Result<Token, BridgeError> {
    self.reset(position)?;
    let kind = self.scan_next()?;
    Ok(Token {
      kind,
      start: self.token_start()?,
      end: self.token_end()?,
      text: self.token_text()?,
    })
  }

  /// The text this scanner was opened over.
  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn is_closed(&self) -> bool {
    self.holder.borrow().is_closed()
  }

  pub fn close(&self) -> Result<(), BridgeError> {
    Ok(self.holder.borrow_mut().close()?)
  }
}

impl Drop for ScannerContext<'_> {
  fn drop(&mut self) {
    let mut holder = self.holder.borrow_mut();
    if !holder.is_closed() {
      // Cannot fail: the holder is still open.
      let _ = holder.close();
    }
  }
}

impl fmt::Debug for ScannerContext<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScannerContext")
      .field("len", &self.text.len())
      .field("closed", &self.is_closed())
      .finish()
  }
}
