//! Typed host views over foreign compiler objects.
//!
//! Every proxy wraps exactly one handle retained by its [`ProgramContext`] and holds only a weak
//! back-reference to it, so the context's caches never keep themselves alive. Identity-bearing
//! proxies ([`Node`], [`Type`], [`Symbol`], [`Signature`]) are deduplicated per context: two
//! resolutions of the same foreign object yield clones of the same `Rc`, and `==` on proxies
//! compares that identity.

mod flags;
mod index_info;
mod node;
mod node_list;
mod signature;
mod symbol;
mod ty;

pub use flags::ObjectFlags;
pub use flags::SymbolFlags;
pub use flags::TypeFlags;
pub use index_info::IndexInfo;
pub use node::Node;
pub use node::NodeId;
pub use node::SourceFile;
pub use node_list::NodeList;
pub use node_list::NodeListConversion;
pub use node_list::NODE_LIST;
pub use signature::Signature;
pub use signature::SignatureId;
pub use symbol::Symbol;
pub use symbol::SymbolId;
pub use ty::IntersectionType;
pub use ty::LiteralType;
pub use ty::LiteralValue;
pub use ty::ObjectType;
pub use ty::Type;
pub use ty::TypeId;
pub use ty::TypeReference;
pub use ty::UnionType;

pub(crate) use index_info::index_info;

use crate::context::ContextInner;
use crate::context::ProgramContext;
use crate::convert::Conversion;
use crate::error::BridgeError;
use crate::holder::HandleId;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Weak;

/// The part every proxy shares: its retained handle and its owning context.
pub(crate) struct ProxyCore<'js> {
  context: Weak<ContextInner<'js>>,
  handle: HandleId,
  kind: &'static str,
}

impl<'js> ProxyCore<'js> {
  pub(crate) fn new(cx: &ProgramContext<'js>, handle: HandleId, kind: &'static str) -> Self {
    Self {
      context: cx.downgrade(),
      handle,
      kind,
    }
  }

  pub(crate) fn kind(&self) -> &'static str {
    self.kind
  }

  pub(crate) fn context(&self) -> Result<ProgramContext<'js>, BridgeError> {
    ProgramContext::upgrade(&self.context)
  }

  /// A caller-owned clone of the wrapped value, e.g. to pass as a foreign argument.
  pub(crate) fn value(&self, cx: &ProgramContext<'js>) -> Result<Value<'js>, BridgeError> {
    cx.value(self.handle)
  }

  pub(crate) fn object(&self, cx: &ProgramContext<'js>) -> Result<Object<'js>, BridgeError> {
    cx.object(self.handle)
  }

  /// Returns the handle to the context ahead of close. Does nothing once the context is gone
  /// or closed.
  pub(crate) fn release(&self) {
    if let Ok(cx) = self.context() {
      cx.release(self.handle);
    }
  }

  fn site(&self, name: &str) -> String {
    format!("{}.{}", self.kind, name)
  }

  pub(crate) fn read<C: Conversion<'js>>(&self, name: &str, conversion: &C) -> Result<C::Output, BridgeError> {
    let run = || {
      let cx = self.context()?;
      let object = self.object(&cx)?;
      let value = cx.property(&object, name)?;
      conversion.convert_non_null(&cx, value)
    };
    run().map_err(|err| err.at(self.site(name)))
  }

  pub(crate) fn read_nullable<C: Conversion<'js>>(
    &self,
    name: &str,
    conversion: &C,
  ) -> Result<Option<C::Output>, BridgeError> {
    let run = || {
      let cx = self.context()?;
      let object = self.object(&cx)?;
      let value = cx.property(&object, name)?;
      conversion.convert_nullable(&cx, value)
    };
    run().map_err(|err| err.at(self.site(name)))
  }

  /// Whether the wrapped object has a callable property `name`.
  pub(crate) fn has_method(&self, name: &str) -> Result<bool, BridgeError> {
    let run = || {
      let cx = self.context()?;
      let object = self.object(&cx)?;
      Ok(cx.property(&object, name)?.is_function())
    };
    run().map_err(|err: BridgeError| err.at(self.site(name)))
  }

  pub(crate) fn call<C: Conversion<'js>>(
    &self,
    method: &str,
    args: Vec<Value<'js>>,
    conversion: &C,
  ) -> Result<C::Output, BridgeError> {
    let run = || {
      let cx = self.context()?;
      let object = self.object(&cx)?;
      let value = cx.call_method(&object, method, args)?;
      conversion.convert_non_null(&cx, value)
    };
    run().map_err(|err| err.at(self.site(method)))
  }
}
