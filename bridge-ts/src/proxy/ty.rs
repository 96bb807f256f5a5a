use super::flags::flag_bits;
use super::IndexInfo;
use super::ObjectFlags;
use super::ProxyCore;
use super::Signature;
use super::Symbol;
use super::TypeFlags;
use crate::cache::CachedProxy;
use crate::cache::ObjectCache;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::list;
use crate::convert::Conversion;
use crate::convert::Narrow;
use crate::convert::BOOL;
use crate::convert::I64;
use crate::convert::STRING;
use crate::error::BridgeError;
use crate::holder::HandleId;
use crate::syntax_kind::SignatureKind;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;

/// The checker's own type id (`type.id`). Distinct objects carrying one id are one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub i64);

struct TypeData<'js> {
  id: TypeId,
  core: ProxyCore<'js>,
}

#[derive(Clone)]
pub struct Type<'js>(Rc<TypeData<'js>>);

impl<'js> CachedProxy<'js> for Type<'js> {
  type Key = TypeId;

  const KIND: &'static str = "Type";

  fn cache<'a>(cx: &'a ProgramContext<'js>) -> &'a ObjectCache<TypeId, Self> {
    &cx.inner().types
  }

  fn identity(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<TypeId, BridgeError> {
    cx.read(object, "id", &I64).map(TypeId)
  }

  fn wrap(cx: &ProgramContext<'js>, key: TypeId, handle: HandleId) -> Self {
    Type(Rc::new(TypeData {
      id: key,
      core: ProxyCore::new(cx, handle, Self::KIND),
    }))
  }
}

impl<'js> Type<'js> {
  pub fn id(&self) -> TypeId {
    self.0.id
  }

  fn core(&self) -> &ProxyCore<'js> {
    &self.0.core
  }

  pub(crate) fn foreign(&self, cx: &ProgramContext<'js>) -> Result<Value<'js>, BridgeError> {
    self.core().value(cx)
  }

  pub fn flags(&self) -> Result<TypeFlags, BridgeError> {
    self
      .core()
      .read("flags", &I64)
      .map(|bits| TypeFlags::from_bits_retain(flag_bits(bits)))
  }

  pub fn symbol(&self) -> Result<Option<Symbol<'js>>, BridgeError> {
    self.core().read_nullable("symbol", &cached::<Symbol>())
  }

  pub fn alias_symbol(&self) -> Result<Option<Symbol<'js>>, BridgeError> {
    self.core().read_nullable("aliasSymbol", &cached::<Symbol>())
  }

  pub fn alias_type_arguments(&self) -> Result<Vec<Type<'js>>, BridgeError> {
    Ok(
      self
        .core()
        .read_nullable("aliasTypeArguments", &list(cached::<Type>()))?
        .unwrap_or_default(),
    )
  }

  /// `checker.typeToString(type)`.
  pub fn type_string(&self) -> Result<String, BridgeError> {
    let cx = self.core().context()?;
    let checker = cx.checker();
    checker.type_to_string(self)
  }

  pub fn as_object_type(&self) -> Result<Option<ObjectType<'js>>, BridgeError> {
    ObjectType::narrow(self)
  }

  pub fn as_union_type(&self) -> Result<Option<UnionType<'js>>, BridgeError> {
    UnionType::narrow(self)
  }

  pub fn as_intersection_type(&self) -> Result<Option<IntersectionType<'js>>, BridgeError> {
    IntersectionType::narrow(self)
  }

  pub fn as_type_reference(&self) -> Result<Option<TypeReference<'js>>, BridgeError> {
    TypeReference::narrow(self)
  }

  pub fn as_literal_type(&self) -> Result<Option<LiteralType<'js>>, BridgeError> {
    LiteralType::narrow(self)
  }

  fn view<V: Narrow<Type<'js>>>(&self) -> Result<V, BridgeError> {
    match V::narrow(self)? {
      Some(view) => Ok(view),
      None => Err(BridgeError::KindMismatch {
        expected: V::KIND,
        actual: V::describe(self)?,
      }),
    }
  }

  /// Like [`Type::as_object_type`], but any other type is an error.
  pub fn object_type(&self) -> Result<ObjectType<'js>, BridgeError> {
    self.view()
  }

  pub fn union_type(&self) -> Result<UnionType<'js>, BridgeError> {
    self.view()
  }

  pub fn type_reference(&self) -> Result<TypeReference<'js>, BridgeError> {
    self.view()
  }
}

impl PartialEq for Type<'_> {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Type<'_> {}

impl Hash for Type<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.id.hash(state)
  }
}

impl fmt::Debug for Type<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Type({})", self.0.id.0)
  }
}

fn describe_flags(ty: &Type<'_>) -> Result<String, BridgeError> {
  Ok(format!("type {} with flags {:?}", ty.id().0, ty.flags()?))
}

/// Implements [`Narrow`] for a view that is selected by type flags alone.
macro_rules! flag_view {
  ($(#[$attr:meta])* $name:ident, $kind:literal, $flags:expr) => {
    $(#[$attr])*
    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    pub struct $name<'js>(Type<'js>);

    impl<'js> Narrow<Type<'js>> for $name<'js> {
      const KIND: &'static str = $kind;

      fn narrow(ty: &Type<'js>) -> Result<Option<Self>, BridgeError> {
        Ok(ty.flags()?.intersects($flags).then(|| $name(ty.clone())))
      }

      fn describe(ty: &Type<'js>) -> Result<String, BridgeError> {
        describe_flags(ty)
      }
    }

    impl<'js> $name<'js> {
      pub fn ty(&self) -> &Type<'js> {
        &self.0
      }
    }
  };
}

flag_view!(
  /// A type with [`TypeFlags::OBJECT`]: classes, interfaces, literals, references, ...
  ObjectType,
  "ObjectType",
  TypeFlags::OBJECT
);
flag_view!(UnionType, "UnionType", TypeFlags::UNION);
flag_view!(IntersectionType, "IntersectionType", TypeFlags::INTERSECTION);
flag_view!(
  /// A string, number or bigint literal type. Boolean literals are intrinsic types in the
  /// checker and carry no `value`.
  LiteralType,
  "LiteralType",
  TypeFlags::STRING_LITERAL | TypeFlags::NUMBER_LITERAL | TypeFlags::BIG_INT_LITERAL
);

impl<'js> ObjectType<'js> {
  pub fn object_flags(&self) -> Result<ObjectFlags, BridgeError> {
    self
      .0
      .core()
      .read("objectFlags", &I64)
      .map(|bits| ObjectFlags::from_bits_retain(flag_bits(bits)))
  }

  pub fn properties(&self) -> Result<Vec<Symbol<'js>>, BridgeError> {
    let cx = self.0.core().context()?;
    let checker = cx.checker();
    checker.properties_of_type(&self.0)
  }

  pub fn call_signatures(&self) -> Result<Vec<Signature<'js>>, BridgeError> {
    let cx = self.0.core().context()?;
    let checker = cx.checker();
    checker.signatures_of_type(&self.0, SignatureKind::Call)
  }

  pub fn construct_signatures(&self) -> Result<Vec<Signature<'js>>, BridgeError> {
    let cx = self.0.core().context()?;
    let checker = cx.checker();
    checker.signatures_of_type(&self.0, SignatureKind::Construct)
  }

  pub fn index_infos(&self) -> Result<Vec<IndexInfo<'js>>, BridgeError> {
    let cx = self.0.core().context()?;
    let checker = cx.checker();
    checker.index_infos_of_type(&self.0)
  }
}

impl<'js> UnionType<'js> {
  /// Constituent types.
  pub fn types(&self) -> Result<Vec<Type<'js>>, BridgeError> {
    self.0.core().read("types", &list(cached::<Type>()))
  }
}

impl<'js> IntersectionType<'js> {
  pub fn types(&self) -> Result<Vec<Type<'js>>, BridgeError> {
    self.0.core().read("types", &list(cached::<Type>()))
  }
}

/// An instantiation of a generic class, interface or tuple (`Array<string>`, `[a, b]`, ...).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TypeReference<'js>(ObjectType<'js>);

impl<'js> Narrow<Type<'js>> for TypeReference<'js> {
  const KIND: &'static str = "TypeReference";

  fn narrow(ty: &Type<'js>) -> Result<Option<Self>, BridgeError> {
    let Some(object) = ObjectType::narrow(ty)? else {
      return Ok(None);
    };
    Ok(
      object
        .object_flags()?
        .contains(ObjectFlags::REFERENCE)
        .then_some(TypeReference(object)),
    )
  }

  fn describe(ty: &Type<'js>) -> Result<String, BridgeError> {
    match ObjectType::narrow(ty)? {
      Some(object) => Ok(format!(
        "object type {} with object flags {:?}",
        ty.id().0,
        object.object_flags()?
      )),
      None => describe_flags(ty),
    }
  }
}

impl<'js> TypeReference<'js> {
  pub fn ty(&self) -> &Type<'js> {
    self.0.ty()
  }

  pub fn object_type(&self) -> &ObjectType<'js> {
    &self.0
  }

  /// The generic declaration this reference instantiates.
  pub fn target(&self) -> Result<Type<'js>, BridgeError> {
    self.ty().core().read("target", &cached::<Type>())
  }

  /// `checker.getTypeArguments(reference)`.
  pub fn type_arguments(&self) -> Result<Vec<Type<'js>>, BridgeError> {
    let cx = self.ty().core().context()?;
    let checker = cx.checker();
    checker.type_arguments(self)
  }
}

/// The value carried by a [`LiteralType`].
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
  String(String),
  Number(f64),
  /// A `PseudoBigInt`: sign plus magnitude in base 10.
  BigInt { negative: bool, base10: String },
}

struct LiteralValueConversion;

impl<'js> Conversion<'js> for LiteralValueConversion {
  type Output = LiteralValue;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<LiteralValue, BridgeError> {
    if value.is_string() {
      return STRING.convert_unsafe(cx, value).map(LiteralValue::String);
    }
    if let Some(n) = value.as_number() {
      return Ok(LiteralValue::Number(n));
    }
    match value.as_object() {
      Some(object) => Ok(LiteralValue::BigInt {
        negative: cx.read(object, "negative", &BOOL)?,
        base10: cx.read(object, "base10Value", &STRING)?,
      }),
      None => Err(BridgeError::shape("string, number or pseudo-bigint", value.type_name())),
    }
  }
}

impl<'js> LiteralType<'js> {
  pub fn value(&self) -> Result<LiteralValue, BridgeError> {
    self.0.core().read("value", &LiteralValueConversion)
  }
}
