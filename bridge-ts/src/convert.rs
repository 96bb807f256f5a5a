//! Typed conversions from foreign values to host values.
//!
//! A [`Conversion`] turns one foreign value into one host value against a [`ProgramContext`].
//! Every conversion has three entry points:
//! - [`Conversion::convert_unsafe`] assumes the value is present;
//! - [`Conversion::convert_nullable`] maps `null`/`undefined` to `None`;
//! - [`Conversion::convert_non_null`] treats `null`/`undefined` as a contract violation.
//!
//! Combinators ([`list`], [`cached`], [`cast`], [`enum_from_code`], [`builder`]) build new
//! conversions out of existing ones. None of them retain a handle beyond the call; only
//! [`cached`] retains, through the context's object cache, when it materializes a new proxy.

use crate::cache::CachedProxy;
use crate::context::ProgramContext;
use crate::error::BridgeError;
use crate::syntax_kind::CodeEnum;
use crate::syntax_kind::SyntaxKind;
use core::marker::PhantomData;
use rquickjs::Object;
use rquickjs::Value;

pub trait Conversion<'js> {
  type Output;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<Self::Output, BridgeError>;

  fn convert_nullable(
    &self,
    cx: &ProgramContext<'js>,
    value: Value<'js>,
  ) -> Result<Option<Self::Output>, BridgeError> {
    if value.is_null() || value.is_undefined() {
      Ok(None)
    } else {
      self.convert_unsafe(cx, value).map(Some)
    }
  }

  fn convert_non_null(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<Self::Output, BridgeError> {
    self
      .convert_nullable(cx, value)?
      .ok_or(BridgeError::MissingValue)
  }
}

impl<'js, C: Conversion<'js> + ?Sized> Conversion<'js> for &C {
  type Output = C::Output;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<Self::Output, BridgeError> {
    (**self).convert_unsafe(cx, value)
  }
}

fn mismatch(expected: &'static str, value: &Value<'_>) -> BridgeError {
  BridgeError::shape(expected, value.type_name())
}

/// Accepts an integral float as an integer; JavaScript numbers arrive either way.
fn integral(value: &Value<'_>) -> Option<f64> {
  value.as_float().filter(|f| f.fract() == 0.0)
}

/// The value as an `i32`, if it is an integer in range.
pub(crate) fn exact_i32(value: &Value<'_>) -> Option<i32> {
  if let Some(n) = value.as_int() {
    return Some(n);
  }
  integral(value)
    .filter(|f| *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
    .map(|f| f as i32)
}

/// 2^63: the first double past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

// ---- Base conversions ----

#[derive(Clone, Copy, Debug)]
pub struct StringConversion;

pub const STRING: StringConversion = StringConversion;

impl<'js> Conversion<'js> for StringConversion {
  type Output = String;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<String, BridgeError> {
    match value.as_string() {
      Some(s) => s.to_string().map_err(|err| cx.foreign_error(err)),
      None => Err(mismatch("string", &value)),
    }
  }
}

#[derive(Clone, Copy, Debug)]
pub struct BoolConversion;

pub const BOOL: BoolConversion = BoolConversion;

impl<'js> Conversion<'js> for BoolConversion {
  type Output = bool;

  fn convert_unsafe(&self, _cx: &ProgramContext<'js>, value: Value<'js>) -> Result<bool, BridgeError> {
    value.as_bool().ok_or_else(|| mismatch("boolean", &value))
  }
}

#[derive(Clone, Copy, Debug)]
pub struct I32Conversion;

pub const I32: I32Conversion = I32Conversion;

impl<'js> Conversion<'js> for I32Conversion {
  type Output = i32;

  fn convert_unsafe(&self, _cx: &ProgramContext<'js>, value: Value<'js>) -> Result<i32, BridgeError> {
    exact_i32(&value).ok_or_else(|| mismatch("32-bit integer", &value))
  }
}

/// 64-bit integers, accepting 32-bit ints, integral doubles and bigints.
#[derive(Clone, Copy, Debug)]
pub struct I64Conversion;

pub const I64: I64Conversion = I64Conversion;

impl<'js> Conversion<'js> for I64Conversion {
  type Output = i64;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<i64, BridgeError> {
    if let Some(n) = value.as_int() {
      return Ok(n as i64);
    }
    if let Some(f) = integral(&value) {
      if (-I64_BOUND..I64_BOUND).contains(&f) {
        return Ok(f as i64);
      }
      return Err(mismatch("64-bit integer", &value));
    }
    if let Some(big) = value.as_big_int() {
      return big.clone().to_i64().map_err(|err| cx.foreign_error(err));
    }
    Err(mismatch("64-bit integer", &value))
  }
}

/// Doubles, for the few fields (literal values, offsets in some hosts) that are not integral.
#[derive(Clone, Copy, Debug)]
pub struct F64Conversion;

pub const F64: F64Conversion = F64Conversion;

impl<'js> Conversion<'js> for F64Conversion {
  type Output = f64;

  fn convert_unsafe(&self, _cx: &ProgramContext<'js>, value: Value<'js>) -> Result<f64, BridgeError> {
    value.as_number().ok_or_else(|| mismatch("number", &value))
  }
}

/// Passes the object through unconverted. The result is a transient handle owned by the caller.
#[derive(Clone, Copy, Debug)]
pub struct ObjectConversion;

pub const OBJECT: ObjectConversion = ObjectConversion;

impl<'js> Conversion<'js> for ObjectConversion {
  type Output = Object<'js>;

  fn convert_unsafe(&self, _cx: &ProgramContext<'js>, value: Value<'js>) -> Result<Object<'js>, BridgeError> {
    let actual = value.type_name();
    value
      .into_object()
      .ok_or_else(|| BridgeError::shape("object", actual))
  }
}

// ---- Combinators ----

#[derive(Clone, Copy, Debug)]
pub struct ListOf<C>(C);

/// Converts an array element-wise with `of.convert_non_null`.
pub fn list<C>(of: C) -> ListOf<C> {
  ListOf(of)
}

impl<'js, C: Conversion<'js>> Conversion<'js> for ListOf<C> {
  type Output = Vec<C::Output>;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<Self::Output, BridgeError> {
    let Some(array) = value.as_array() else {
      return Err(mismatch("array", &value));
    };
    let len = array.len();
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
      let element: Value<'js> = array.get(i).map_err(|err| cx.foreign_error(err).at(format!("[{i}]")))?;
      out.push(self.0.convert_non_null(cx, element).map_err(|err| err.at(format!("[{i}]")))?);
    }
    Ok(out)
  }
}

pub struct Cached<P>(PhantomData<fn() -> P>);

/// Resolves identity-bearing objects through the context's object cache.
pub fn cached<P>() -> Cached<P> {
  Cached(PhantomData)
}

impl<P> Clone for Cached<P> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<P> Copy for Cached<P> {}

impl<'js, P: CachedProxy<'js>> Conversion<'js> for Cached<P> {
  type Output = P;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<P, BridgeError> {
    cx.resolve::<P>(value)
  }
}

/// A view type that can be narrowed out of a broader proxy.
pub trait Narrow<T>: Sized {
  /// Name reported as the expected kind on failure.
  const KIND: &'static str;

  /// `Ok(None)` when `value` is not of this kind.
  fn narrow(value: &T) -> Result<Option<Self>, BridgeError>;

  /// Describes the actual kind of `value` for mismatch errors.
  fn describe(value: &T) -> Result<String, BridgeError>;
}

pub struct Cast<C, U> {
  base: C,
  _target: PhantomData<fn() -> U>,
}

/// Converts with `base`, then requires the result to narrow to `U`.
pub fn cast<U, C>(base: C) -> Cast<C, U> {
  Cast {
    base,
    _target: PhantomData,
  }
}

impl<'js, C, U> Conversion<'js> for Cast<C, U>
where
  C: Conversion<'js>,
  U: Narrow<C::Output>,
{
  type Output = U;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<U, BridgeError> {
    let base = self.base.convert_unsafe(cx, value)?;
    match U::narrow(&base)? {
      Some(narrowed) => Ok(narrowed),
      None => Err(BridgeError::KindMismatch {
        expected: U::KIND,
        actual: U::describe(&base)?,
      }),
    }
  }
}

/// The code spaces [`enum_from_code`] can decode.
pub trait CodeTable<'js> {
  type Output;

  fn name(&self) -> &'static str;

  fn lookup(&self, cx: &ProgramContext<'js>, code: i32) -> Option<Self::Output>;
}

/// The session's syntax kind metadata.
#[derive(Clone, Copy, Debug)]
pub struct SyntaxKinds;

impl<'js> CodeTable<'js> for SyntaxKinds {
  type Output = SyntaxKind;

  fn name(&self) -> &'static str {
    "SyntaxKind"
  }

  fn lookup(&self, cx: &ProgramContext<'js>, code: i32) -> Option<SyntaxKind> {
    cx.syntax_kinds().kind(code)
  }
}

/// A closed enum compiled into the host.
pub struct Closed<E>(PhantomData<fn() -> E>);

impl<E> Clone for Closed<E> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<E> Copy for Closed<E> {}

pub fn closed<E: CodeEnum>() -> Closed<E> {
  Closed(PhantomData)
}

impl<'js, E: CodeEnum> CodeTable<'js> for Closed<E> {
  type Output = E;

  fn name(&self) -> &'static str {
    E::TABLE
  }

  fn lookup(&self, _cx: &ProgramContext<'js>, code: i32) -> Option<E> {
    E::from_code(code)
  }
}

#[derive(Clone, Copy, Debug)]
pub struct EnumFromCode<T>(T);

/// Decodes an integer through `table`. Unknown codes are version skew and always an error.
pub fn enum_from_code<T>(table: T) -> EnumFromCode<T> {
  EnumFromCode(table)
}

impl<'js, T: CodeTable<'js>> Conversion<'js> for EnumFromCode<T> {
  type Output = T::Output;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<T::Output, BridgeError> {
    let code = I32.convert_unsafe(cx, value)?;
    self
      .0
      .lookup(cx, code)
      .ok_or(BridgeError::UnknownCode {
        table: self.0.name(),
        code: code as i64,
      })
  }
}

pub const SYNTAX_KIND: EnumFromCode<SyntaxKinds> = EnumFromCode(SyntaxKinds);

#[derive(Clone, Copy, Debug)]
pub struct Builder<F>(F);

/// Assembles a plain value from the fields of a foreign object. `f` reads fields through this
/// same framework (typically [`ProgramContext::read`]).
pub fn builder<F>(f: F) -> Builder<F> {
  Builder(f)
}

impl<'js, F, T> Conversion<'js> for Builder<F>
where
  F: Fn(&ProgramContext<'js>, &Object<'js>) -> Result<T, BridgeError>,
{
  type Output = T;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<T, BridgeError> {
    let Some(object) = value.as_object() else {
      return Err(mismatch("object", &value));
    };
    (self.0)(cx, object)
  }
}
