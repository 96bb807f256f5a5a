//! Ownership of native handles into the embedded runtime's heap.
//!
//! The embedded heap is not visible to the host allocator: a handle that is taken and never
//! dropped keeps its foreign object alive until the runtime itself is torn down. A
//! [`ResourceHolder`] is an arena of such handles. Retaining a value clones it into a slot and
//! hands back a [`HandleId`]; closing the holder releases every slot exactly once, after which
//! any attempt to resolve a handle fails with [`LifecycleError::UseAfterClose`].

use crate::error::BridgeError;
use crate::error::LifecycleError;
use core::fmt;
use rquickjs::Object;
use rquickjs::Value;
use tracing::debug;
use tracing::warn;

/// A stable identifier for a retained handle within one [`ResourceHolder`].
///
/// Slots are never reused, so an id stays unambiguous for the holder's whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HandleId(u32);

impl HandleId {
  /// The slot index within the holder.
  #[inline]
  pub fn index(self) -> u32 {
    self.0
  }
}

impl fmt::Debug for HandleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("HandleId").field(&self.0).finish()
  }
}

/// The result of [`ResourceHolder::retain`].
#[derive(Clone, Debug)]
pub enum Retained<'js> {
  /// `null`, `undefined`, booleans and numbers own nothing in the foreign heap and are passed
  /// through untracked.
  Primitive(Value<'js>),
  Handle(HandleId),
}

/// A resource that is not itself a foreign handle but must be torn down with its owner (for
/// example a scanner session opened against a program context).
pub trait Close {
  fn close(&mut self) -> Result<(), BridgeError>;

  /// Whether the resource was already torn down elsewhere. Finished resources are dropped from
  /// the holder the next time a resource is tracked.
  fn is_finished(&self) -> bool {
    false
  }
}

pub struct ResourceHolder<'js> {
  name: &'static str,
  handles: Vec<Option<Value<'js>>>,
  resources: Vec<Box<dyn Close + 'js>>,
  closed: bool,
}

fn is_primitive(value: &Value<'_>) -> bool {
  value.is_undefined() || value.is_null() || value.is_bool() || value.is_number()
}

impl<'js> ResourceHolder<'js> {
  /// Creates an empty holder. `name` only appears in errors and logs.
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      handles: Vec::new(),
      resources: Vec::new(),
      closed: false,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Number of handles currently owned.
  pub fn live_handles(&self) -> usize {
    self.handles.iter().filter(|slot| slot.is_some()).count()
  }

  /// Takes ownership of `value`. The caller's handle stays independent and may be dropped at
  /// any time.
  pub fn retain(&mut self, value: &Value<'js>) -> Result<Retained<'js>, LifecycleError> {
    if self.closed {
      return Err(LifecycleError::RetainAfterClose { holder: self.name });
    }
    if is_primitive(value) {
      return Ok(Retained::Primitive(value.clone()));
    }
    Ok(Retained::Handle(self.push(value.clone())))
  }

  /// Like [`ResourceHolder::retain`], for values already known to be objects.
  pub fn retain_object(&mut self, object: &Object<'js>) -> Result<HandleId, LifecycleError> {
    self.retain_handle(object.clone().into_value())
  }

  /// Takes ownership of a value known not to be a primitive (object, function, string, ...).
  pub fn retain_handle(&mut self, value: Value<'js>) -> Result<HandleId, LifecycleError> {
    if self.closed {
      return Err(LifecycleError::RetainAfterClose { holder: self.name });
    }
    debug_assert!(!is_primitive(&value), "primitives own no handle");
    Ok(self.push(value))
  }

  fn push(&mut self, value: Value<'js>) -> HandleId {
    let id = HandleId(self.handles.len() as u32);
    self.handles.push(Some(value));
    id
  }

  /// Returns a fresh, caller-owned clone of the value behind `id`.
  pub fn get(&self, id: HandleId) -> Result<Value<'js>, LifecycleError> {
    if self.closed {
      return Err(LifecycleError::UseAfterClose { holder: self.name });
    }
    match self.handles.get(id.0 as usize) {
      Some(Some(value)) => Ok(value.clone()),
      Some(None) => Err(LifecycleError::UseAfterClose { holder: self.name }),
      None => Err(LifecycleError::UnknownHandle {
        holder: self.name,
        index: id.0,
      }),
    }
  }

  pub fn resolve(&self, retained: &Retained<'js>) -> Result<Value<'js>, LifecycleError> {
    match retained {
      Retained::Primitive(value) => Ok(value.clone()),
      Retained::Handle(id) => self.get(*id),
    }
  }

  /// Releases a single handle ahead of [`ResourceHolder::close`].
  pub fn release(&mut self, id: HandleId) -> Result<(), LifecycleError> {
    if self.closed {
      return Err(LifecycleError::UseAfterClose { holder: self.name });
    }
    match self.handles.get_mut(id.0 as usize) {
      Some(slot @ Some(_)) => {
        slot.take();
        Ok(())
      }
      Some(None) => Err(LifecycleError::ReleasedTwice {
        holder: self.name,
        index: id.0,
      }),
      None => Err(LifecycleError::UnknownHandle {
        holder: self.name,
        index: id.0,
      }),
    }
  }

  /// Number of tracked resources still awaiting close.
  pub fn tracked_resources(&self) -> usize {
    self.resources.len()
  }

  /// Registers a non-handle resource to be closed together with this holder.
  pub fn track(&mut self, resource: Box<dyn Close + 'js>) -> Result<(), LifecycleError> {
    if self.closed {
      return Err(LifecycleError::RetainAfterClose { holder: self.name });
    }
    self.resources.retain(|resource| !resource.is_finished());
    self.resources.push(resource);
    Ok(())
  }

  /// Releases everything this holder owns.
  ///
  /// Teardown is total: a resource that fails to close is logged and the remaining resources
  /// are still closed. Only a second `close` is reported as an error.
  pub fn close(&mut self) -> Result<(), LifecycleError> {
    if self.closed {
      return Err(LifecycleError::ClosedTwice { holder: self.name });
    }
    self.closed = true;

    let mut failures = 0usize;
    for (index, mut resource) in self.resources.drain(..).enumerate() {
      if let Err(err) = resource.close() {
        failures += 1;
        warn!(holder = self.name, index, error = %err, "failed to close tracked resource");
      }
    }

    let released = self.handles.iter().filter(|slot| slot.is_some()).count();
    // Dropping the values hands each reference back to the foreign heap.
    self.handles.clear();
    debug!(holder = self.name, released, failures, "closed resource holder");
    Ok(())
  }
}

impl fmt::Debug for ResourceHolder<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceHolder")
      .field("name", &self.name)
      .field("live_handles", &self.live_handles())
      .field("resources", &self.resources.len())
      .field("closed", &self.closed)
      .finish()
  }
}
