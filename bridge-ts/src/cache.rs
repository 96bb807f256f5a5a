use crate::context::ProgramContext;
use crate::error::BridgeError;
use crate::holder::HandleId;
use ahash::HashMap;
use ahash::HashMapExt;
use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;
use rquickjs::Object;
use tracing::trace;

/// A proxy kind whose instances are deduplicated per identity key.
pub trait CachedProxy<'js>: Clone + Sized {
  type Key: Copy + Eq + Hash + fmt::Debug;

  /// Kind name used in errors and logs.
  const KIND: &'static str;

  /// The cache for this kind owned by `cx`.
  fn cache<'a>(cx: &'a ProgramContext<'js>) -> &'a ObjectCache<Self::Key, Self>;

  /// Computes the identity key of a foreign object of this kind.
  fn identity(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<Self::Key, BridgeError>;

  /// Wraps a handle already retained by `cx`.
  fn wrap(cx: &ProgramContext<'js>, key: Self::Key, handle: HandleId) -> Self;
}

/// Identity-keyed proxy cache. Entries live until the owning context is closed.
pub struct ObjectCache<K, P> {
  kind: &'static str,
  entries: RefCell<HashMap<K, P>>,
}

impl<K: Copy + Eq + Hash + fmt::Debug, P: Clone> ObjectCache<K, P> {
  pub fn new(kind: &'static str) -> Self {
    Self {
      kind,
      entries: RefCell::new(HashMap::new()),
    }
  }

  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn get(&self, key: &K) -> Option<P> {
    self.entries.borrow().get(key).cloned()
  }

  /// Returns the proxy cached under `key`, calling `create` only on a miss.
  ///
  /// `create` runs without the cache borrowed. If it somehow re-enters and fills the same key,
  /// the entry already present wins and the new proxy is discarded, so two proxies for one key
  /// can never both be handed out.
  pub fn get_or_create(
    &self,
    key: K,
    create: impl FnOnce() -> Result<P, BridgeError>,
  ) -> Result<P, BridgeError> {
    if let Some(hit) = self.get(&key) {
      trace!(kind = self.kind, ?key, "proxy cache hit");
      return Ok(hit);
    }
    let created = create()?;
    trace!(kind = self.kind, ?key, "proxy cache miss");
    Ok(self.entries.borrow_mut().entry(key).or_insert(created).clone())
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }

  /// Drops every entry. The handles they wrapped are owned by the context's holder, not here.
  pub(crate) fn clear(&self) -> usize {
    let mut entries = self.entries.borrow_mut();
    let n = entries.len();
    entries.clear();
    n
  }
}

impl<K, P> fmt::Debug for ObjectCache<K, P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObjectCache")
      .field("kind", &self.kind)
      .field("len", &self.entries.borrow().len())
      .finish()
  }
}
