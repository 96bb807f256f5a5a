//! The per-session program context.
//!
//! A [`ProgramContext`] owns everything one parse/compile session holds in the embedded
//! runtime: the program and type checker, the scanner factory, the node id function, the
//! syntax kind metadata and the four identity caches. Every proxy is created through it and
//! every handle it hands out is retained by its [`ResourceHolder`], so [`ProgramContext::close`]
//! releases the whole session at once.

use crate::cache::CachedProxy;
use crate::cache::ObjectCache;
use crate::checker::TypeChecker;
use crate::convert::list;
use crate::convert::cached;
use crate::convert::Conversion;
use crate::convert::I64;
use crate::error::BridgeError;
use crate::error::LifecycleError;
use crate::holder::Close;
use crate::holder::HandleId;
use crate::holder::ResourceHolder;
use crate::options::ContextOptions;
use crate::options::IdentitySource;
use crate::proxy::Node;
use crate::proxy::NodeId;
use crate::proxy::Signature;
use crate::proxy::SignatureId;
use crate::proxy::Symbol;
use crate::proxy::SymbolId;
use crate::proxy::Type;
use crate::proxy::TypeId;
use crate::scanner::ScannerContext;
use crate::syntax_kind::SyntaxKindTable;
use core::cell::Cell;
use core::cell::RefCell;
use core::fmt;
use rquickjs::function::Rest;
use rquickjs::function::This;
use rquickjs::CaughtError;
use rquickjs::Ctx;
use rquickjs::Exception;
use rquickjs::Function;
use rquickjs::IntoJs;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;
use std::rc::Weak;
use tracing::debug;
use tracing::debug_span;
use tracing::warn;

/// Marks exceptions thrown on behalf of a failed host callback.
const HOST_ERROR_TAG: &str = "__bridgeHostError";

/// Assigns each distinct foreign object a small integer, stable while the object lives.
const IDENTITY_TOKEN_SOURCE: &str = r#"(() => {
  const ids = new WeakMap();
  let next = 1;
  return (object) => {
    let id = ids.get(object);
    if (id === undefined) {
      id = next++;
      ids.set(object, id);
    }
    return id;
  };
})()"#;

pub(crate) struct ContextInner<'js> {
  ctx: Ctx<'js>,
  options: ContextOptions,
  holder: RefCell<ResourceHolder<'js>>,
  program: HandleId,
  checker: HandleId,
  scanner_factory: HandleId,
  node_id: HandleId,
  identity_token: HandleId,
  for_each_child: Option<HandleId>,
  syntax_kinds: SyntaxKindTable,
  pub(crate) nodes: ObjectCache<NodeId, Node<'js>>,
  pub(crate) types: ObjectCache<TypeId, Type<'js>>,
  pub(crate) symbols: ObjectCache<SymbolId, Symbol<'js>>,
  pub(crate) signatures: ObjectCache<SignatureId, Signature<'js>>,
  /// Errors raised by host callbacks during the current foreign call, with the tags of the
  /// exceptions they were thrown as.
  host_errors: RefCell<Vec<(u64, BridgeError)>>,
  host_error_tags: Cell<u64>,
}

impl ContextInner<'_> {
  fn teardown(&self) -> Result<(), LifecycleError> {
    let _span = debug_span!("close_program_context").entered();
    let handles = self.holder.borrow().live_handles();
    self.holder.borrow_mut().close()?;
    let nodes = self.nodes.clear();
    let types = self.types.clear();
    let symbols = self.symbols.clear();
    let signatures = self.signatures.clear();
    debug!(handles, nodes, types, symbols, signatures, "released program context");
    Ok(())
  }
}

impl Drop for ContextInner<'_> {
  fn drop(&mut self) {
    if !self.holder.get_mut().is_closed() {
      warn!("program context dropped without close; releasing handles");
      // Cannot fail: the holder is still open.
      let _ = self.teardown();
    }
  }
}

/// Handle to one embedded-runtime session. Cloning shares the session.
#[derive(Clone)]
pub struct ProgramContext<'js> {
  inner: Rc<ContextInner<'js>>,
}

/// Entry counts of the four identity caches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheSizes {
  pub nodes: usize,
  pub types: usize,
  pub symbols: usize,
  pub signatures: usize,
}

/// Throws an `Error` carrying `message`, tagged so [`ProgramContext::foreign_error`] can
/// recognise it if it escapes.
fn host_exception(ctx: &Ctx<'_>, message: &str, tag: u64) -> rquickjs::Error {
  let exception = match Exception::from_message(ctx.clone(), message) {
    Ok(exception) => exception,
    Err(err) => return err,
  };
  if let Err(err) = exception.as_object().set(HOST_ERROR_TAG, tag as f64) {
    return err;
  }
  ctx.throw(exception.into_object().into_value())
}

fn field<'js>(ctx: &Ctx<'js>, object: &Object<'js>, name: &str) -> Result<Value<'js>, BridgeError> {
  object
    .get::<_, Value>(name)
    .map_err(|err| BridgeError::caught(ctx, err).at(name))
}

fn function_field<'js>(
  ctx: &Ctx<'js>,
  object: &Object<'js>,
  name: &str,
) -> Result<Option<Function<'js>>, BridgeError> {
  let value = field(ctx, object, name)?;
  if value.is_null() || value.is_undefined() {
    return Ok(None);
  }
  let actual = value.type_name();
  value
    .into_function()
    .map(Some)
    .ok_or_else(|| BridgeError::shape("function", actual).at(name))
}

fn object_field<'js>(ctx: &Ctx<'js>, object: &Object<'js>, name: &str) -> Result<Option<Object<'js>>, BridgeError> {
  let value = field(ctx, object, name)?;
  if value.is_null() || value.is_undefined() {
    return Ok(None);
  }
  let actual = value.type_name();
  value
    .into_object()
    .map(Some)
    .ok_or_else(|| BridgeError::shape("object", actual).at(name))
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, BridgeError> {
  value.ok_or_else(|| BridgeError::MissingValue.at(name))
}

impl<'js> ProgramContext<'js> {
  /// Bootstraps a session from a parse-result object.
  ///
  /// Reads `program`, `createScanner`, `getNodeId` and `syntaxKinds` (all required), plus
  /// `checker` (defaults to `program.getTypeChecker()`) and `forEachChild` (optional).
  pub fn new(ctx: Ctx<'js>, parse_result: Object<'js>, options: ContextOptions) -> Result<Self, BridgeError> {
    let program = required(object_field(&ctx, &parse_result, "program")?, "program")?;
    let checker = match object_field(&ctx, &parse_result, "checker")? {
      Some(checker) => checker,
      None => {
        let get_checker = required(function_field(&ctx, &program, "getTypeChecker")?, "program.getTypeChecker")?;
        let checker: Value = get_checker
          .call((This(program.clone()),))
          .map_err(|err| BridgeError::caught(&ctx, err).at("program.getTypeChecker"))?;
        let actual = checker.type_name();
        checker
          .into_object()
          .ok_or_else(|| BridgeError::shape("object", actual).at("program.getTypeChecker"))?
      }
    };
    let scanner_factory = required(function_field(&ctx, &parse_result, "createScanner")?, "createScanner")?;
    let node_id = required(function_field(&ctx, &parse_result, "getNodeId")?, "getNodeId")?;
    let for_each_child = function_field(&ctx, &parse_result, "forEachChild")?;
    let kinds = required(object_field(&ctx, &parse_result, "syntaxKinds")?, "syntaxKinds")?;
    let syntax_kinds = SyntaxKindTable::from_object(&kinds).map_err(|err| err.at("syntaxKinds"))?;
    let identity_token: Function = ctx
      .eval(IDENTITY_TOKEN_SOURCE)
      .map_err(|err| BridgeError::caught(&ctx, err).at("identity token"))?;

    let mut holder = ResourceHolder::new("program context");
    let program = holder.retain_object(&program)?;
    let checker = holder.retain_object(&checker)?;
    let scanner_factory = holder.retain_handle(scanner_factory.into_value())?;
    let node_id = holder.retain_handle(node_id.into_value())?;
    let identity_token = holder.retain_handle(identity_token.into_value())?;
    let for_each_child = for_each_child
      .map(|f| holder.retain_handle(f.into_value()))
      .transpose()?;

    debug!(
      syntax_kinds = syntax_kinds.len(),
      for_each_child = for_each_child.is_some(),
      ?options,
      "created program context"
    );

    Ok(ProgramContext {
      inner: Rc::new(ContextInner {
        ctx,
        options,
        holder: RefCell::new(holder),
        program,
        checker,
        scanner_factory,
        node_id,
        identity_token,
        for_each_child,
        syntax_kinds,
        nodes: ObjectCache::new("node"),
        types: ObjectCache::new("type"),
        symbols: ObjectCache::new("symbol"),
        signatures: ObjectCache::new("signature"),
        host_errors: RefCell::new(Vec::new()),
        host_error_tags: Cell::new(0),
      }),
    })
  }

  pub fn ctx(&self) -> &Ctx<'js> {
    &self.inner.ctx
  }

  pub fn options(&self) -> &ContextOptions {
    &self.inner.options
  }

  pub fn syntax_kinds(&self) -> &SyntaxKindTable {
    &self.inner.syntax_kinds
  }

  pub(crate) fn inner(&self) -> &ContextInner<'js> {
    &self.inner
  }

  pub(crate) fn downgrade(&self) -> Weak<ContextInner<'js>> {
    Rc::downgrade(&self.inner)
  }

  pub(crate) fn upgrade(weak: &Weak<ContextInner<'js>>) -> Result<Self, BridgeError> {
    weak
      .upgrade()
      .map(|inner| ProgramContext { inner })
      .ok_or(BridgeError::Lifecycle(LifecycleError::ContextDropped))
  }

  /// Whether two handles refer to the same session.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn is_closed(&self) -> bool {
    self.inner.holder.borrow().is_closed()
  }

  /// Handles currently retained by this session.
  pub fn retained_handles(&self) -> usize {
    self.inner.holder.borrow().live_handles()
  }

  /// Resources other than handles (open scanners) awaiting close.
  pub(crate) fn tracked_resources(&self) -> usize {
    self.inner.holder.borrow().tracked_resources()
  }

  pub fn cache_sizes(&self) -> CacheSizes {
    CacheSizes {
      nodes: self.inner.nodes.len(),
      types: self.inner.types.len(),
      symbols: self.inner.symbols.len(),
      signatures: self.inner.signatures.len(),
    }
  }

  /// Releases every handle of the session: the top-level handles, then every cached proxy's
  /// handle, then any tracked resources. Proxies still held by callers fail with
  /// [`LifecycleError::UseAfterClose`] afterwards.
  pub fn close(&self) -> Result<(), BridgeError> {
    Ok(self.inner.teardown()?)
  }

  // ---- Handle ownership ----

  pub(crate) fn retain_object(&self, object: &Object<'js>) -> Result<HandleId, BridgeError> {
    Ok(self.inner.holder.borrow_mut().retain_object(object)?)
  }

  /// Retains a non-primitive value that has no identity cache of its own.
  pub(crate) fn retain_value(&self, value: Value<'js>) -> Result<HandleId, BridgeError> {
    Ok(self.inner.holder.borrow_mut().retain_handle(value)?)
  }

  /// Releases a handle that has no cache entry (node lists) before the context closes.
  pub(crate) fn release(&self, handle: HandleId) {
    let Ok(mut holder) = self.inner.holder.try_borrow_mut() else {
      return;
    };
    if holder.is_closed() {
      return;
    }
    if let Err(err) = holder.release(handle) {
      warn!(error = %err, "failed to release handle");
    }
  }

  pub(crate) fn track(&self, resource: Box<dyn Close + 'js>) -> Result<(), BridgeError> {
    Ok(self.inner.holder.borrow_mut().track(resource)?)
  }

  /// A caller-owned clone of a retained value.
  pub(crate) fn value(&self, handle: HandleId) -> Result<Value<'js>, BridgeError> {
    Ok(self.inner.holder.borrow().get(handle)?)
  }

  pub(crate) fn object(&self, handle: HandleId) -> Result<Object<'js>, BridgeError> {
    let value = self.value(handle)?;
    let actual = value.type_name();
    value
      .into_object()
      .ok_or_else(|| BridgeError::shape("object", actual))
  }

  fn function(&self, handle: HandleId) -> Result<Function<'js>, BridgeError> {
    let value = self.value(handle)?;
    let actual = value.type_name();
    value
      .into_function()
      .ok_or_else(|| BridgeError::shape("function", actual))
  }

  pub fn program(&self) -> Result<Object<'js>, BridgeError> {
    self.object(self.inner.program)
  }

  pub(crate) fn checker_object(&self) -> Result<Object<'js>, BridgeError> {
    self.object(self.inner.checker)
  }

  pub fn checker(&self) -> TypeChecker<'_, 'js> {
    TypeChecker::new(self)
  }

  // ---- Foreign operations ----

  /// Maps a runtime failure to a [`BridgeError`]. When the exception that escaped is the one a
  /// failed host callback threw, the callback's own error is returned instead.
  pub(crate) fn foreign_error(&self, err: rquickjs::Error) -> BridgeError {
    let caught = CaughtError::from_error(&self.inner.ctx, err);
    let pending = core::mem::take(&mut *self.inner.host_errors.borrow_mut());
    if let CaughtError::Exception(exception) = &caught {
      let thrown: Option<f64> = exception.as_object().get(HOST_ERROR_TAG).ok().flatten();
      if let Some((_, host)) = pending.into_iter().find(|(tag, _)| thrown == Some(*tag as f64)) {
        return host;
      }
    }
    BridgeError::Foreign {
      message: caught.to_string(),
    }
  }

  /// Finishes a foreign call. A host error the foreign side caught and recovered from is
  /// discarded so it cannot be misattributed to a later failure.
  fn settle<T>(&self, result: rquickjs::Result<T>) -> Result<T, BridgeError> {
    match result {
      Ok(value) => {
        self.inner.host_errors.borrow_mut().clear();
        Ok(value)
      }
      Err(err) => Err(self.foreign_error(err)),
    }
  }

  pub(crate) fn property(&self, object: &Object<'js>, name: &str) -> Result<Value<'js>, BridgeError> {
    object
      .get::<_, Value>(name)
      .map_err(|err| self.foreign_error(err))
  }

  pub(crate) fn call_method(
    &self,
    target: &Object<'js>,
    method: &str,
    args: Vec<Value<'js>>,
  ) -> Result<Value<'js>, BridgeError> {
    let value = self.property(target, method)?;
    let actual = value.type_name();
    let Some(function) = value.into_function() else {
      return Err(BridgeError::shape("function", actual));
    };
    self.settle(function.call((This(target.clone()), Rest(args))))
  }

  pub(crate) fn call_function(&self, function: &Function<'js>, args: Vec<Value<'js>>) -> Result<Value<'js>, BridgeError> {
    self.settle(function.call((Rest(args),)))
  }

  /// Reads `object[name]`.
  pub fn get(&self, object: &Object<'js>, name: &str) -> Result<Value<'js>, BridgeError> {
    self.property(object, name).map_err(|err| err.at(name))
  }

  /// Reads `object[name]` and converts it; absence is an error.
  pub fn read<C: Conversion<'js>>(&self, object: &Object<'js>, name: &str, conversion: &C) -> Result<C::Output, BridgeError> {
    self
      .property(object, name)
      .and_then(|value| conversion.convert_non_null(self, value))
      .map_err(|err| err.at(name))
  }

  pub fn read_nullable<C: Conversion<'js>>(
    &self,
    object: &Object<'js>,
    name: &str,
    conversion: &C,
  ) -> Result<Option<C::Output>, BridgeError> {
    self
      .property(object, name)
      .and_then(|value| conversion.convert_nullable(self, value))
      .map_err(|err| err.at(name))
  }

  /// Invokes `target[method](...args)`.
  pub fn invoke(&self, target: &Object<'js>, method: &str, args: Vec<Value<'js>>) -> Result<Value<'js>, BridgeError> {
    self
      .call_method(target, method, args)
      .map_err(|err| err.at(method))
  }

  /// Invokes `target[method](...args)` and converts the result; absence is an error.
  pub fn call<C: Conversion<'js>>(
    &self,
    target: &Object<'js>,
    method: &str,
    args: Vec<Value<'js>>,
    conversion: &C,
  ) -> Result<C::Output, BridgeError> {
    self
      .call_method(target, method, args)
      .and_then(|value| conversion.convert_non_null(self, value))
      .map_err(|err| err.at(method))
  }

  pub fn call_nullable<C: Conversion<'js>>(
    &self,
    target: &Object<'js>,
    method: &str,
    args: Vec<Value<'js>>,
    conversion: &C,
  ) -> Result<Option<C::Output>, BridgeError> {
    self
      .call_method(target, method, args)
      .and_then(|value| conversion.convert_nullable(self, value))
      .map_err(|err| err.at(method))
  }

  /// Converts a host value into a foreign argument.
  pub fn to_foreign<V: IntoJs<'js>>(&self, value: V) -> Result<Value<'js>, BridgeError> {
    value
      .into_js(&self.inner.ctx)
      .map_err(|err| self.foreign_error(err))
  }

  /// Wraps a host closure as a function callable from the embedded runtime.
  ///
  /// The closure sees this context. If it fails, the foreign caller observes a thrown
  /// exception, and the host code that made the enclosing foreign call gets the original
  /// [`BridgeError`] back.
  pub fn host_function<F>(&self, f: F) -> Result<Function<'js>, BridgeError>
  where
    F: Fn(&ProgramContext<'js>, Vec<Value<'js>>) -> Result<Value<'js>, BridgeError> + 'js,
  {
    let weak = self.downgrade();
    Function::new(
      self.inner.ctx.clone(),
      move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
        let cx = match ProgramContext::upgrade(&weak) {
          Ok(cx) => cx,
          Err(err) => return Err(Exception::throw_message(&ctx, &err.to_string())),
        };
        match f(&cx, args.0) {
          Ok(value) => Ok(value),
          Err(err) => {
            let tag = cx.inner.host_error_tags.get() + 1;
            cx.inner.host_error_tags.set(tag);
            let message = err.to_string();
            cx.inner.host_errors.borrow_mut().push((tag, err));
            Err(host_exception(&ctx, &message, tag))
          }
        }
      },
    )
    .map_err(|err| self.foreign_error(err))
  }

  // ---- Identity ----

  pub(crate) fn node_id(&self, node: &Object<'js>) -> Result<NodeId, BridgeError> {
    let function = self.function(self.inner.node_id)?;
    let value = self
      .call_function(&function, vec![node.clone().into_value()])
      .map_err(|err| err.at("getNodeId"))?;
    I64
      .convert_non_null(self, value)
      .map(NodeId)
      .map_err(|err| err.at("getNodeId"))
  }

  /// The identity key of a symbol or signature per `source`.
  pub(crate) fn identity_of(&self, object: &Object<'js>, source: &IdentitySource) -> Result<i64, BridgeError> {
    match source {
      IdentitySource::ObjectToken => {
        let function = self.function(self.inner.identity_token)?;
        let value = self
          .call_function(&function, vec![object.clone().into_value()])
          .map_err(|err| err.at("identity token"))?;
        I64
          .convert_non_null(self, value)
          .map_err(|err| err.at("identity token"))
      }
      IdentitySource::Property(name) => self.read(object, name, &I64),
    }
  }

  /// Resolves `value` to the one proxy of kind `P` for its identity key, retaining a handle only
  /// when the proxy is new. The caller's `value` is never retained and may be dropped freely.
  pub fn resolve<P: CachedProxy<'js>>(&self, value: Value<'js>) -> Result<P, BridgeError> {
    let actual = value.type_name();
    let Some(object) = value.into_object() else {
      return Err(BridgeError::shape(P::KIND, actual));
    };
    let key = P::identity(self, &object)?;
    P::cache(self).get_or_create(key, || {
      let handle = self.retain_object(&object)?;
      Ok(P::wrap(self, key, handle))
    })
  }

  pub(crate) fn for_each_child_function(&self) -> Result<Function<'js>, BridgeError> {
    match self.inner.for_each_child {
      Some(handle) => self.function(handle),
      None => Err(BridgeError::MissingValue.at("forEachChild")),
    }
  }

  pub(crate) fn scanner_factory(&self) -> Result<Function<'js>, BridgeError> {
    self.function(self.inner.scanner_factory)
  }

  // ---- Program ----

  /// `program.getSourceFiles()`.
  pub fn source_files(&self) -> Result<Vec<Node<'js>>, BridgeError> {
    let program = self.program()?;
    self
      .call(&program, "getSourceFiles", Vec::new(), &list(cached::<Node>()))
      .map_err(|err| err.at("program"))
  }

  /// `program.getSourceFile(name)`.
  pub fn source_file(&self, file_name: &str) -> Result<Option<Node<'js>>, BridgeError> {
    let program = self.program()?;
    let name = self.to_foreign(file_name)?;
    self
      .call_nullable(&program, "getSourceFile", vec![name], &cached::<Node>())
      .map_err(|err| err.at("program"))
  }

  /// Opens a scanner over `text`. Scanners left open are closed with the context.
  pub fn scanner(&self, text: &str) -> Result<ScannerContext<'js>, BridgeError> {
    ScannerContext::open(self, text)
  }
}

impl fmt::Debug for ProgramContext<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProgramContext")
      .field("holder", &*self.inner.holder.borrow())
      .field("caches", &self.cache_sizes())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::convert::I32;
  use crate::testing::eval;
  use crate::testing::with_context;
  use crate::EmbeddedRuntime;
  use crate::RuntimeOptions;

  #[test]
  fn missing_parse_result_fields_are_named() {
    let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
    runtime.with(|ctx| {
      let parse_result: Object = ctx
        .eval("({ program: {}, checker: {}, createScanner() {}, syntaxKinds: {} })")
        .unwrap();
      let err = ProgramContext::new(ctx, parse_result, ContextOptions::default()).unwrap_err();
      assert_eq!(err.to_string(), "`getNodeId`: required value is null or undefined");
    });
  }

  #[test]
  fn checker_defaults_to_program_checker() {
    let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
    runtime.with(|ctx| {
      let parse_result: Object = ctx
        .eval("({ program: {}, createScanner() {}, getNodeId() { return 1; }, syntaxKinds: {} })")
        .unwrap();
      let err = ProgramContext::new(ctx, parse_result, ContextOptions::default()).unwrap_err();
      assert_eq!(
        err.to_string(),
        "`program.getTypeChecker`: required value is null or undefined"
      );
    });
  }

  #[test]
  fn resolving_twice_retains_once() {
    with_context(|cx| {
      let before = cx.retained_handles();
      let object = eval(cx, "globalThis.n = { kind: 1, pos: 0, end: 1 }");
      let a: Node = cx.resolve(object).unwrap();
      let b: Node = cx.resolve(eval(cx, "globalThis.n")).unwrap();
      assert_eq!(a, b);
      assert_eq!(cx.retained_handles(), before + 1);
      assert_eq!(cx.cache_sizes().nodes, 1);

      let other: Node = cx.resolve(eval(cx, "({ kind: 1 })")).unwrap();
      assert_ne!(a, other);
      assert_eq!(cx.retained_handles(), before + 2);
    });
  }

  #[test]
  fn host_errors_resurface_unchanged() {
    with_context(|cx| {
      let failing = cx
        .host_function(|_cx, _args| Err(BridgeError::Setup("host refused".into())))
        .unwrap();
      let caller: Function = cx.ctx().eval("(f) => f() + 1").unwrap();
      let err = cx.call_function(&caller, vec![failing.into_value()]).unwrap_err();
      assert!(matches!(err, BridgeError::Setup(ref message) if message == "host refused"), "{err}");

      // The slot is cleared: an ordinary exception is reported as such afterwards.
      let thrower: Function = cx.ctx().eval("() => { throw new Error('plain'); }").unwrap();
      let err = cx.call_function(&thrower, Vec::new()).unwrap_err();
      assert!(matches!(err, BridgeError::Foreign { ref message } if message.contains("plain")), "{err}");
    });
  }

  #[test]
  fn recovered_host_errors_do_not_mask_later_exceptions() {
    with_context(|cx| {
      let failing = || {
        cx.host_function(|_cx, _args| Err(BridgeError::Setup("host refused".into())))
          .unwrap()
          .into_value()
      };
      let swallow: Function = cx
        .ctx()
        .eval("(f) => { try { f(); } catch (e) {} throw new Error('unrelated'); }")
        .unwrap();
      let err = cx.call_function(&swallow, vec![failing()]).unwrap_err();
      assert!(matches!(err, BridgeError::Foreign { ref message } if message.contains("unrelated")), "{err}");

      // Rethrowing the callback's exception later in the same call still surfaces the host error.
      let rethrow: Function = cx
        .ctx()
        .eval("(f) => { let saved; try { f(); } catch (e) { saved = e; } throw saved; }")
        .unwrap();
      let err = cx.call_function(&rethrow, vec![failing()]).unwrap_err();
      assert!(matches!(err, BridgeError::Setup(ref message) if message == "host refused"), "{err}");

      // Each callback failure is matched to its own exception.
      let twice: Function = cx
        .ctx()
        .eval("(f, g) => { let first; try { f(); } catch (e) { first = e; } try { g(); } catch (e) {} throw first; }")
        .unwrap();
      let refuse_second = cx
        .host_function(|_cx, _args| Err(BridgeError::Setup("second".into())))
        .unwrap()
        .into_value();
      let err = cx.call_function(&twice, vec![failing(), refuse_second]).unwrap_err();
      assert!(matches!(err, BridgeError::Setup(ref message) if message == "host refused"), "{err}");
    });
  }

  #[test]
  fn host_functions_see_their_arguments() {
    with_context(|cx| {
      let double = cx
        .host_function(|cx, args| {
          let n = I32.convert_non_null(cx, args.into_iter().next().unwrap())?;
          cx.to_foreign(n * 2)
        })
        .unwrap();
      let caller: Function = cx.ctx().eval("(f) => f(21)").unwrap();
      let value = cx.call_function(&caller, vec![double.into_value()]).unwrap();
      assert_eq!(value.as_int(), Some(42));
    });
  }

  #[test]
  fn close_invalidates_proxies_and_is_not_repeatable() {
    with_context(|cx| {
      let node: Node = cx.resolve(eval(cx, "({ kind: 1, pos: 3, end: 4 })")).unwrap();
      assert_eq!(node.pos().unwrap(), 3);

      cx.close().unwrap();
      assert!(cx.is_closed());
      assert_eq!(cx.cache_sizes(), CacheSizes::default());
      assert_eq!(cx.retained_handles(), 0);

      let err = node.pos().unwrap_err();
      assert!(err.is_lifecycle(), "{err}");
      assert!(matches!(
        err.root(),
        BridgeError::Lifecycle(LifecycleError::UseAfterClose { .. })
      ));
      assert!(matches!(
        cx.close().unwrap_err(),
        BridgeError::Lifecycle(LifecycleError::ClosedTwice { .. })
      ));
      assert!(cx.resolve::<Node>(eval(cx, "({ kind: 1 })")).is_err());
    });
  }

  #[test]
  fn proxies_do_not_keep_the_context_alive() {
    let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
    runtime.with(|ctx| {
      let parse_result: Object = ctx.eval(crate::testing::MINIMAL_PARSE_RESULT).unwrap();
      let cx = ProgramContext::new(ctx, parse_result, ContextOptions::default()).unwrap();
      let node: Node = cx.resolve(eval(&cx, "({ kind: 1, pos: 0 })")).unwrap();
      drop(cx);
      let err = node.pos().unwrap_err();
      assert!(matches!(
        err.root(),
        BridgeError::Lifecycle(LifecycleError::ContextDropped)
      ));
    });
  }
}
