#![allow(dead_code)]

use bridge_ts::BridgeError;
use bridge_ts::ContextOptions;
use bridge_ts::EmbeddedRuntime;
use bridge_ts::Node;
use bridge_ts::ProgramContext;
use bridge_ts::RuntimeOptions;
use rquickjs::Ctx;
use rquickjs::Function;
use rquickjs::Object;

pub const MINI_COMPILER: &str = include_str!("mini_compiler.js");

pub fn runtime() -> EmbeddedRuntime {
  let runtime = EmbeddedRuntime::new(RuntimeOptions::default()).unwrap();
  runtime
    .load_script("mini_compiler.js", MINI_COMPILER)
    .unwrap();
  runtime
}

/// Parses `files` with the mini compiler and opens a context over the result.
pub fn open<'js>(
  ctx: Ctx<'js>,
  files: &[(&str, &str)],
  options: ContextOptions,
) -> Result<ProgramContext<'js>, BridgeError> {
  let create: Function = ctx.globals().get("createParseResult").unwrap();
  let sources = Object::new(ctx.clone()).unwrap();
  for (name, text) in files {
    sources.set(*name, *text).unwrap();
  }
  let parse_result: Object = create.call((sources,)).unwrap();
  ProgramContext::new(ctx, parse_result, options)
}

pub fn with_program<F>(files: &[(&str, &str)], f: F)
where
  F: for<'js> FnOnce(&ProgramContext<'js>),
{
  with_program_options(files, ContextOptions::default(), f)
}

pub fn with_program_options<F>(files: &[(&str, &str)], options: ContextOptions, f: F)
where
  F: for<'js> FnOnce(&ProgramContext<'js>),
{
  let runtime = runtime();
  runtime.with(|ctx| {
    let cx = open(ctx, files, options).unwrap();
    f(&cx);
    if !cx.is_closed() {
      cx.close().unwrap();
    }
  });
}

pub fn first_file<'js>(cx: &ProgramContext<'js>) -> Node<'js> {
  cx.source_files().unwrap().into_iter().next().unwrap()
}

/// Depth-first search for the first identifier spelled `text`.
pub fn find_identifier<'js>(node: &Node<'js>, text: &str) -> Option<Node<'js>> {
  if node.is_kind("Identifier").unwrap() && node.get_text().unwrap() == text {
    return Some(node.clone());
  }
  node
    .children()
    .unwrap()
    .iter()
    .find_map(|child| find_identifier(child, text))
}

/// The declaration node of the variable named `name`.
pub fn declaration<'js>(cx: &ProgramContext<'js>, name: &str) -> Node<'js> {
  let file = first_file(cx);
  let identifier = find_identifier(&file, name).unwrap();
  identifier.parent().unwrap().unwrap()
}
