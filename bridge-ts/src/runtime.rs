use crate::error::BridgeError;
use crate::options::RuntimeOptions;
use rquickjs::CatchResultExt;
use rquickjs::Context;
use rquickjs::Ctx;
use rquickjs::Runtime;
use tracing::debug;

/// One QuickJS runtime with a single full context.
///
/// The runtime is single threaded. Run independent instances on separate threads to parse in
/// parallel; nothing created inside [`EmbeddedRuntime::with`] can escape the closure.
pub struct EmbeddedRuntime {
  runtime: Runtime,
  context: Context,
  options: RuntimeOptions,
}

fn setup(err: rquickjs::Error) -> BridgeError {
  BridgeError::Setup(err.to_string())
}

impl EmbeddedRuntime {
  pub fn new(options: RuntimeOptions) -> Result<Self, BridgeError> {
    let runtime = Runtime::new().map_err(setup)?;
    if let Some(limit) = options.memory_limit {
      runtime.set_memory_limit(limit);
    }
    if let Some(limit) = options.max_stack_size {
      runtime.set_max_stack_size(limit);
    }
    if let Some(threshold) = options.gc_threshold {
      runtime.set_gc_threshold(threshold);
    }
    let context = Context::full(&runtime).map_err(setup)?;
    debug!(?options, "created embedded runtime");
    Ok(Self {
      runtime,
      context,
      options,
    })
  }

  pub fn options(&self) -> &RuntimeOptions {
    &self.options
  }

  /// Evaluates a script for its side effects, e.g. a bundled compiler defining globals.
  pub fn load_script(&self, name: &str, source: &str) -> Result<(), BridgeError> {
    self.context.with(|ctx| {
      ctx
        .eval::<(), _>(source)
        .catch(&ctx)
        .map_err(|err| {
          BridgeError::Foreign {
            message: err.to_string(),
          }
          .at(name)
        })
    })?;
    debug!(name, bytes = source.len(), "loaded script");
    Ok(())
  }

  pub fn with<F, R>(&self, f: F) -> R
  where
    F: for<'js> FnOnce(Ctx<'js>) -> R,
  {
    self.context.with(f)
  }

  pub fn run_gc(&self) {
    self.runtime.run_gc();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scripts_define_globals() {
    let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
    runtime
      .load_script("prelude.js", "globalThis.answer = 40 + 2;")
      .unwrap();
    runtime.run_gc();
    let answer: i32 = runtime.with(|ctx| ctx.globals().get("answer").unwrap());
    assert_eq!(answer, 42);
  }

  #[test]
  fn script_exceptions_name_the_script() {
    let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
    let err = runtime
      .load_script("broken.js", "throw new Error('nope');")
      .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("`broken.js`: foreign call failed"), "{message}");
    assert!(message.contains("nope"), "{message}");
  }

  #[test]
  fn memory_limit_is_enforced() {
    let runtime =
      EmbeddedRuntime::new(RuntimeOptions::default().with_memory_limit(4 << 20)).unwrap();
    let result = runtime.load_script(
      "hog.js",
      "const xs = []; for (;;) { xs.push(new Array(1 << 16).fill(1)); }",
    );
    assert!(result.is_err());
  }
}
