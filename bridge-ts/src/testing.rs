use crate::ContextOptions;
use crate::EmbeddedRuntime;
use crate::ProgramContext;
use crate::RuntimeOptions;
use rquickjs::Object;
use rquickjs::Value;

/// The smallest parse result a context accepts.
pub(crate) const MINIMAL_PARSE_RESULT: &str = r#"({
  program: {
    getTypeChecker() { return {}; },
    getSourceFiles() { return []; },
  },
  createScanner(text) {
    let end = 0;
    return {
      resetTokenState(pos) { end = pos; },
      scan() { end = text.length; return 1; },
      getTokenStart() { return 0; },
      getTokenEnd() { return end; },
      getTokenText() { return text; },
    };
  },
  getNodeId: (() => {
    const ids = new WeakMap();
    let next = 1;
    return (node) => {
      if (!ids.has(node)) ids.set(node, next++);
      return ids.get(node);
    };
  })(),
  syntaxKinds: { Unknown: 0, Identifier: 1, SourceFile: 2, 0: "Unknown", 1: "Identifier", 2: "SourceFile" },
})"#;

/// Runs `f` against a fresh context over [`MINIMAL_PARSE_RESULT`], closing it afterwards unless
/// `f` already did.
pub(crate) fn with_context<F>(f: F)
where
  F: for<'js> FnOnce(&ProgramContext<'js>),
{
  let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
  runtime.with(|ctx| {
    let parse_result: Object = ctx.eval(MINIMAL_PARSE_RESULT).unwrap();
    let cx = ProgramContext::new(ctx, parse_result, ContextOptions::default()).unwrap();
    f(&cx);
    if !cx.is_closed() {
      cx.close().unwrap();
    }
  });
}

pub(crate) fn eval<'js>(cx: &ProgramContext<'js>, src: &str) -> Value<'js> {
  cx.ctx().eval(src).unwrap()
}
