//! Typed access to the compiler's `TypeChecker`.

use crate::context::ProgramContext;
use crate::convert::builder;
use crate::convert::cached;
use crate::convert::list;
use crate::convert::Conversion;
use crate::convert::STRING;
use crate::error::BridgeError;
use crate::proxy::index_info;
use crate::proxy::IndexInfo;
use crate::proxy::Node;
use crate::proxy::ObjectType;
use crate::proxy::Signature;
use crate::proxy::Symbol;
use crate::proxy::Type;
use crate::proxy::TypeReference;
use crate::syntax_kind::SignatureKind;
use rquickjs::Value;

/// A borrowed view of the session's type checker. Every query is one foreign call; results that
/// carry identity come back through the context's caches.
#[derive(Clone, Copy, Debug)]
pub struct TypeChecker<'a, 'js> {
  cx: &'a ProgramContext<'js>,
}

impl<'a, 'js> TypeChecker<'a, 'js> {
  pub(crate) fn new(cx: &'a ProgramContext<'js>) -> Self {
    Self { cx }
  }

  fn call<C: Conversion<'js>>(&self, method: &str, args: Vec<Value<'js>>, conversion: &C) -> Result<C::Output, BridgeError> {
    let run = || {
      let checker = self.cx.checker_object()?;
      self.cx.call(&checker, method, args, conversion)
    };
    run().map_err(|err| err.at("checker"))
  }

  fn call_nullable<C: Conversion<'js>>(
    &self,
    method: &str,
    args: Vec<Value<'js>>,
    conversion: &C,
  ) -> Result<Option<C::Output>, BridgeError> {
    let run = || {
      let checker = self.cx.checker_object()?;
      self.cx.call_nullable(&checker, method, args, conversion)
    };
    run().map_err(|err| err.at("checker"))
  }

  pub fn type_at_location(&self, node: &Node<'js>) -> Result<Type<'js>, BridgeError> {
    self.call("getTypeAtLocation", vec![node.foreign(self.cx)?], &cached::<Type>())
  }

  pub fn symbol_at_location(&self, node: &Node<'js>) -> Result<Option<Symbol<'js>>, BridgeError> {
    self.call_nullable("getSymbolAtLocation", vec![node.foreign(self.cx)?], &cached::<Symbol>())
  }

  pub fn type_of_symbol(&self, symbol: &Symbol<'js>) -> Result<Type<'js>, BridgeError> {
    self.call("getTypeOfSymbol", vec![symbol.foreign(self.cx)?], &cached::<Type>())
  }

  pub fn type_of_symbol_at_location(&self, symbol: &Symbol<'js>, node: &Node<'js>) -> Result<Type<'js>, BridgeError> {
    self.call(
      "getTypeOfSymbolAtLocation",
      vec![symbol.foreign(self.cx)?, node.foreign(self.cx)?],
      &cached::<Type>(),
    )
  }

  pub fn declared_type_of_symbol(&self, symbol: &Symbol<'js>) -> Result<Type<'js>, BridgeError> {
    self.call("getDeclaredTypeOfSymbol", vec![symbol.foreign(self.cx)?], &cached::<Type>())
  }

  pub fn properties_of_type(&self, ty: &Type<'js>) -> Result<Vec<Symbol<'js>>, BridgeError> {
    self.call("getPropertiesOfType", vec![ty.foreign(self.cx)?], &list(cached::<Symbol>()))
  }

  pub fn property_of_type(&self, ty: &Type<'js>, name: &str) -> Result<Option<Symbol<'js>>, BridgeError> {
    self.call_nullable(
      "getPropertyOfType",
      vec![ty.foreign(self.cx)?, self.cx.to_foreign(name)?],
      &cached::<Symbol>(),
    )
  }

  pub fn signatures_of_type(&self, ty: &Type<'js>, kind: SignatureKind) -> Result<Vec<Signature<'js>>, BridgeError> {
    self.call(
      "getSignaturesOfType",
      vec![ty.foreign(self.cx)?, self.cx.to_foreign(kind.code())?],
      &list(cached::<Signature>()),
    )
  }

  pub fn index_infos_of_type(&self, ty: &Type<'js>) -> Result<Vec<IndexInfo<'js>>, BridgeError> {
    self.call("getIndexInfosOfType", vec![ty.foreign(self.cx)?], &list(builder(index_info)))
  }

  pub fn return_type_of_signature(&self, signature: &Signature<'js>) -> Result<Type<'js>, BridgeError> {
    self.call("getReturnTypeOfSignature", vec![signature.foreign(self.cx)?], &cached::<Type>())
  }

  pub fn type_arguments(&self, reference: &TypeReference<'js>) -> Result<Vec<Type<'js>>, BridgeError> {
    self.call("getTypeArguments", vec![reference.ty().foreign(self.cx)?], &list(cached::<Type>()))
  }

  /// Base types of a class or interface type.
  pub fn base_types(&self, ty: &ObjectType<'js>) -> Result<Vec<Type<'js>>, BridgeError> {
    self.call("getBaseTypes", vec![ty.ty().foreign(self.cx)?], &list(cached::<Type>()))
  }

  pub fn apparent_type(&self, ty: &Type<'js>) -> Result<Type<'js>, BridgeError> {
    self.call("getApparentType", vec![ty.foreign(self.cx)?], &cached::<Type>())
  }

  pub fn type_to_string(&self, ty: &Type<'js>) -> Result<String, BridgeError> {
    self.call("typeToString", vec![ty.foreign(self.cx)?], &STRING)
  }

  pub fn signature_to_string(&self, signature: &Signature<'js>) -> Result<String, BridgeError> {
    self.call("signatureToString", vec![signature.foreign(self.cx)?], &STRING)
  }

  pub fn fully_qualified_name(&self, symbol: &Symbol<'js>) -> Result<String, BridgeError> {
    self.call("getFullyQualifiedName", vec![symbol.foreign(self.cx)?], &STRING)
  }
}
