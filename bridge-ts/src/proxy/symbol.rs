use super::flags::flag_bits;
use super::Node;
use super::ProxyCore;
use super::SymbolFlags;
use super::Type;
use crate::cache::CachedProxy;
use crate::cache::ObjectCache;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::list;
use crate::convert::I64;
use crate::convert::STRING;
use crate::error::BridgeError;
use crate::holder::HandleId;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;

/// Symbol identity, computed per [`ContextOptions::symbol_identity`](crate::ContextOptions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub i64);

struct SymbolData<'js> {
  id: SymbolId,
  core: ProxyCore<'js>,
}

#[derive(Clone)]
pub struct Symbol<'js>(Rc<SymbolData<'js>>);

impl<'js> CachedProxy<'js> for Symbol<'js> {
  type Key = SymbolId;

  const KIND: &'static str = "Symbol";

  fn cache<'a>(cx: &'a ProgramContext<'js>) -> &'a ObjectCache<SymbolId, Self> {
    &cx.inner().symbols
  }

  fn identity(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<SymbolId, BridgeError> {
    cx.identity_of(object, &cx.options().symbol_identity).map(SymbolId)
  }

  fn wrap(cx: &ProgramContext<'js>, key: SymbolId, handle: HandleId) -> Self {
    Symbol(Rc::new(SymbolData {
      id: key,
      core: ProxyCore::new(cx, handle, Self::KIND),
    }))
  }
}

impl<'js> Symbol<'js> {
  pub fn id(&self) -> SymbolId {
    self.0.id
  }

  fn core(&self) -> &ProxyCore<'js> {
    &self.0.core
  }

  pub(crate) fn foreign(&self, cx: &ProgramContext<'js>) -> Result<Value<'js>, BridgeError> {
    self.core().value(cx)
  }

  /// The unescaped name. Reads `escapedName` when the object has no `name`.
  pub fn name(&self) -> Result<String, BridgeError> {
    match self.core().read_nullable("name", &STRING)? {
      Some(name) => Ok(name),
      None => self.core().read("escapedName", &STRING),
    }
  }

  pub fn flags(&self) -> Result<SymbolFlags, BridgeError> {
    self
      .core()
      .read("flags", &I64)
      .map(|bits| SymbolFlags::from_bits_retain(flag_bits(bits)))
  }

  /// Declarations, in declaration order. Empty for most transient symbols.
  pub fn declarations(&self) -> Result<Vec<Node<'js>>, BridgeError> {
    Ok(
      self
        .core()
        .read_nullable("declarations", &list(cached::<Node>()))?
        .unwrap_or_default(),
    )
  }

  pub fn value_declaration(&self) -> Result<Option<Node<'js>>, BridgeError> {
    self.core().read_nullable("valueDeclaration", &cached::<Node>())
  }

  /// `checker.getTypeOfSymbol(symbol)`.
  pub fn type_of(&self) -> Result<Type<'js>, BridgeError> {
    let cx = self.core().context()?;
    let checker = cx.checker();
    checker.type_of_symbol(self)
  }

  pub fn fully_qualified_name(&self) -> Result<String, BridgeError> {
    let cx = self.core().context()?;
    let checker = cx.checker();
    checker.fully_qualified_name(self)
  }
}

impl PartialEq for Symbol<'_> {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Symbol<'_> {}

impl Hash for Symbol<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.id.hash(state)
  }
}

impl fmt::Debug for Symbol<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Symbol({})", self.0.id.0)
  }
}
