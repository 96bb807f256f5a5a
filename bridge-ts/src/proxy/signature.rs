use super::Node;
use super::ProxyCore;
use super::Symbol;
use super::Type;
use crate::cache::CachedProxy;
use crate::cache::ObjectCache;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::list;
use crate::error::BridgeError;
use crate::holder::HandleId;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignatureId(pub i64);

struct SignatureData<'js> {
  id: SignatureId,
  core: ProxyCore<'js>,
}

/// A call or construct signature.
#[derive(Clone)]
pub struct Signature<'js>(Rc<SignatureData<'js>>);

impl<'js> CachedProxy<'js> for Signature<'js> {
  type Key = SignatureId;

  const KIND: &'static str = "Signature";

  fn cache<'a>(cx: &'a ProgramContext<'js>) -> &'a ObjectCache<SignatureId, Self> {
    &cx.inner().signatures
  }

  fn identity(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<SignatureId, BridgeError> {
    cx.identity_of(object, &cx.options().signature_identity).map(SignatureId)
  }

  fn wrap(cx: &ProgramContext<'js>, key: SignatureId, handle: HandleId) -> Self {
    Signature(Rc::new(SignatureData {
      id: key,
      core: ProxyCore::new(cx, handle, Self::KIND),
    }))
  }
}

impl<'js> Signature<'js> {
  pub fn id(&self) -> SignatureId {
    self.0.id
  }

  fn core(&self) -> &ProxyCore<'js> {
    &self.0.core
  }

  pub(crate) fn foreign(&self, cx: &ProgramContext<'js>) -> Result<Value<'js>, BridgeError> {
    self.core().value(cx)
  }

  pub fn declaration(&self) -> Result<Option<Node<'js>>, BridgeError> {
    self.core().read_nullable("declaration", &cached::<Node>())
  }

  /// `None` for non-generic signatures.
  pub fn type_parameters(&self) -> Result<Option<Vec<Type<'js>>>, BridgeError> {
    self.core().read_nullable("typeParameters", &list(cached::<Type>()))
  }

  pub fn parameters(&self) -> Result<Vec<Symbol<'js>>, BridgeError> {
    self.core().read("parameters", &list(cached::<Symbol>()))
  }

  pub fn return_type(&self) -> Result<Type<'js>, BridgeError> {
    let cx = self.core().context()?;
    let checker = cx.checker();
    checker.return_type_of_signature(self)
  }

  /// `checker.signatureToString(signature)`.
  pub fn signature_string(&self) -> Result<String, BridgeError> {
    let cx = self.core().context()?;
    let checker = cx.checker();
    checker.signature_to_string(self)
  }
}

impl PartialEq for Signature<'_> {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Signature<'_> {}

impl Hash for Signature<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.id.hash(state)
  }
}

impl fmt::Debug for Signature<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Signature({})", self.0.id.0)
  }
}
