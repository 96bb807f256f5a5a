use rquickjs::CaughtError;
use rquickjs::Ctx;
use std::borrow::Cow;

/// Violations of handle ownership bookkeeping.
///
/// These always indicate a bug in the host code driving the bridge (a handle used after its
/// owner was torn down, a holder closed twice, ...), never a recoverable runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
  #[error("{holder}: retain after close")]
  RetainAfterClose { holder: &'static str },

  #[error("{holder}: closed twice")]
  ClosedTwice { holder: &'static str },

  /// A retained handle was resolved after its holder was closed.
  #[error("{holder}: handle used after close")]
  UseAfterClose { holder: &'static str },

  #[error("{holder}: handle {index} released twice")]
  ReleasedTwice { holder: &'static str, index: u32 },

  /// A handle id that was never issued by this holder.
  #[error("{holder}: unknown handle {index}")]
  UnknownHandle { holder: &'static str, index: u32 },

  /// A proxy outlived the program context that created it.
  #[error("program context was dropped")]
  ContextDropped,
}

/// Errors produced by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
  /// The embedded runtime threw while evaluating a property read or method call.
  #[error("foreign call failed: {message}")]
  Foreign { message: String },

  /// A foreign value did not have the shape a conversion required.
  #[error("shape mismatch: expected {expected}, found {actual}")]
  ShapeMismatch {
    expected: Cow<'static, str>,
    actual: Cow<'static, str>,
  },

  /// A required value was `null` or `undefined`.
  #[error("required value is null or undefined")]
  MissingValue,

  /// A narrowing cast found a different dynamic kind.
  #[error("kind mismatch: expected {expected}, found {actual}")]
  KindMismatch { expected: &'static str, actual: String },

  /// An enum code with no mapping; the bridge and the embedded compiler disagree on versions.
  #[error("unknown {table} code {code}")]
  UnknownCode { table: &'static str, code: i64 },

  #[error(transparent)]
  Lifecycle(#[from] LifecycleError),

  /// The runtime or program context could not be bootstrapped.
  #[error("setup failed: {0}")]
  Setup(String),

  /// Locates a nested failure at a field, method or element.
  #[error("`{site}`: {source}")]
  At {
    site: String,
    source: Box<BridgeError>,
  },
}

impl BridgeError {
  /// A foreign-call failure carrying the text of the exception the runtime threw.
  pub(crate) fn caught(ctx: &Ctx<'_>, err: rquickjs::Error) -> Self {
    BridgeError::Foreign {
      message: CaughtError::from_error(ctx, err).to_string(),
    }
  }

  pub(crate) fn shape(expected: impl Into<Cow<'static, str>>, actual: impl Into<Cow<'static, str>>) -> Self {
    BridgeError::ShapeMismatch {
      expected: expected.into(),
      actual: actual.into(),
    }
  }

  /// Wraps this error with the site (field, method or index) it occurred at.
  pub fn at(self, site: impl Into<String>) -> Self {
    BridgeError::At {
      site: site.into(),
      source: Box::new(self),
    }
  }

  /// The innermost error, skipping any [`BridgeError::At`] wrappers.
  pub fn root(&self) -> &BridgeError {
    let mut err = self;
    while let BridgeError::At { source, .. } = err {
      err = source;
    }
    err
  }

  /// Whether this error (at its root) is a [`LifecycleError`].
  pub fn is_lifecycle(&self) -> bool {
    matches!(self.root(), BridgeError::Lifecycle(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sites_nest_outermost_first() {
    let err = BridgeError::shape("string", "object").at("[2]").at("Type.types");
    assert_eq!(
      err.to_string(),
      "`Type.types`: `[2]`: shape mismatch: expected string, found object"
    );
    assert!(matches!(err.root(), BridgeError::ShapeMismatch { .. }));
  }

  #[test]
  fn lifecycle_errors_are_detected_through_sites() {
    let err = BridgeError::from(LifecycleError::UseAfterClose { holder: "program" }).at("Node.kind");
    assert!(err.is_lifecycle());
    assert!(!BridgeError::MissingValue.is_lifecycle());
  }
}
