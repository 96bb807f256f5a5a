use serde::Deserialize;
use serde::Serialize;

/// Limits applied to the embedded QuickJS runtime. `None` keeps the engine default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeOptions {
  /// Maximum bytes the foreign heap may allocate.
  pub memory_limit: Option<usize>,
  /// Maximum native stack used by the interpreter, in bytes.
  pub max_stack_size: Option<usize>,
  /// Allocation volume that triggers a collection, in bytes.
  pub gc_threshold: Option<usize>,
}

impl RuntimeOptions {
  pub fn with_memory_limit(mut self, bytes: usize) -> Self {
    self.memory_limit = Some(bytes);
    self
  }

  pub fn with_max_stack_size(mut self, bytes: usize) -> Self {
    self.max_stack_size = Some(bytes);
    self
  }

  pub fn with_gc_threshold(mut self, bytes: usize) -> Self {
    self.gc_threshold = Some(bytes);
    self
  }
}

/// How "the same" symbol or signature is recognised across distinct foreign handles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentitySource {
  /// An identity token the runtime assigns per foreign object.
  #[default]
  ObjectToken,
  /// A declared numeric property of the foreign object, e.g. a compiler-assigned `id`.
  Property(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextOptions {
  pub symbol_identity: IdentitySource,
  pub signature_identity: IdentitySource,
}
