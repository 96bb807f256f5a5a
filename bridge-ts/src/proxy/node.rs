use super::flags::flag_bits;
use super::node_list::NodeList;
use super::node_list::NODE_LIST;
use super::ProxyCore;
use crate::cache::CachedProxy;
use crate::cache::ObjectCache;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::closed;
use crate::convert::enum_from_code;
use crate::convert::Narrow;
use crate::convert::BOOL;
use crate::convert::F64;
use crate::convert::I32;
use crate::convert::I64;
use crate::convert::STRING;
use crate::convert::SYNTAX_KIND;
use crate::error::BridgeError;
use crate::holder::HandleId;
use crate::syntax_kind::ScriptKind;
use crate::syntax_kind::SyntaxKind;
use core::cell::RefCell;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;
use core::ops::ControlFlow;
use rquickjs::Object;
use rquickjs::Value;
use std::rc::Rc;

/// Node identity as assigned by the compiler's `getNodeId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i64);

struct NodeData<'js> {
  id: NodeId,
  core: ProxyCore<'js>,
}

/// A syntax tree node.
#[derive(Clone)]
pub struct Node<'js>(Rc<NodeData<'js>>);

impl<'js> CachedProxy<'js> for Node<'js> {
  type Key = NodeId;

  const KIND: &'static str = "Node";

  fn cache<'a>(cx: &'a ProgramContext<'js>) -> &'a ObjectCache<NodeId, Self> {
    &cx.inner().nodes
  }

  fn identity(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<NodeId, BridgeError> {
    cx.node_id(object)
  }

  fn wrap(cx: &ProgramContext<'js>, key: NodeId, handle: HandleId) -> Self {
    Node(Rc::new(NodeData {
      id: key,
      core: ProxyCore::new(cx, handle, Self::KIND),
    }))
  }
}

impl<'js> Node<'js> {
  pub fn id(&self) -> NodeId {
    self.0.id
  }

  fn core(&self) -> &ProxyCore<'js> {
    &self.0.core
  }

  /// The wrapped foreign object, as an argument for foreign calls.
  pub(crate) fn foreign(&self, cx: &ProgramContext<'js>) -> Result<Value<'js>, BridgeError> {
    self.core().value(cx)
  }

  pub fn syntax_kind(&self) -> Result<SyntaxKind, BridgeError> {
    self.core().read("kind", &SYNTAX_KIND)
  }

  pub fn is_kind(&self, name: &str) -> Result<bool, BridgeError> {
    Ok(self.syntax_kind()? == name)
  }

  /// Full start, including leading trivia.
  pub fn pos(&self) -> Result<i32, BridgeError> {
    self.core().read("pos", &I32)
  }

  pub fn end(&self) -> Result<i32, BridgeError> {
    self.core().read("end", &I32)
  }

  /// Start of the first token, skipping trivia. Falls back to [`Node::pos`] when the node has
  /// no `getStart` method.
  pub fn start(&self) -> Result<i32, BridgeError> {
    if self.core().has_method("getStart")? {
      self.core().call("getStart", Vec::new(), &I32)
    } else {
      self.pos()
    }
  }

  /// Raw `ts.NodeFlags` bits.
  pub fn flags(&self) -> Result<u32, BridgeError> {
    self.core().read("flags", &I64).map(flag_bits)
  }

  /// Source text of the node: `getText()` when available, otherwise the `text` field.
  pub fn get_text(&self) -> Result<String, BridgeError> {
    if self.core().has_method("getText")? {
      self.core().call("getText", Vec::new(), &STRING)
    } else {
      self.core().read("text", &STRING)
    }
  }

  pub fn parent(&self) -> Result<Option<Node<'js>>, BridgeError> {
    self.core().read_nullable("parent", &cached::<Node>())
  }

  /// A single-node child field such as `name` or `expression`.
  pub fn child(&self, field: &str) -> Result<Option<Node<'js>>, BridgeError> {
    self.core().read_nullable(field, &cached::<Node>())
  }

  /// A node-array child field such as `statements` or `parameters`.
  pub fn child_list(&self, field: &str) -> Result<Option<NodeList<'js>>, BridgeError> {
    self.core().read_nullable(field, &NODE_LIST)
  }

  pub fn bool_field(&self, field: &str) -> Result<bool, BridgeError> {
    self.core().read(field, &BOOL)
  }

  pub fn string_field(&self, field: &str) -> Result<String, BridgeError> {
    self.core().read(field, &STRING)
  }

  pub fn optional_string_field(&self, field: &str) -> Result<Option<String>, BridgeError> {
    self.core().read_nullable(field, &STRING)
  }

  pub fn number_field(&self, field: &str) -> Result<f64, BridgeError> {
    self.core().read(field, &F64)
  }

  /// Direct children in source order, as enumerated by the compiler's `forEachChild`.
  pub fn children(&self) -> Result<Vec<Node<'js>>, BridgeError> {
    let run = || {
      let cx = self.core().context()?;
      let walker = cx.for_each_child_function()?;
      let found: Rc<RefCell<Vec<Value<'js>>>> = Rc::default();
      let sink = found.clone();
      let visit = cx.host_function(move |cx, args| {
        if let Some(child) = args.into_iter().next() {
          sink.borrow_mut().push(child);
        }
        // Anything truthy would stop the walk.
        Ok(Value::new_undefined(cx.ctx().clone()))
      })?;
      cx.call_function(&walker, vec![self.foreign(&cx)?, visit.into_value()])?;
      let children = found.take();
      children
        .into_iter()
        .map(|child| cx.resolve::<Node>(child))
        .collect::<Result<Vec<_>, BridgeError>>()
    };
    run().map_err(|err| err.at("Node.forEachChild"))
  }

  /// Visits the direct children until `f` breaks, returning the break value.
  pub fn for_each_child<B>(&self, mut f: impl FnMut(Node<'js>) -> ControlFlow<B>) -> Result<Option<B>, BridgeError> {
    for child in self.children()? {
      if let ControlFlow::Break(b) = f(child) {
        return Ok(Some(b));
      }
    }
    Ok(None)
  }

  /// The source file containing this node.
  pub fn source_file(&self) -> Result<SourceFile<'js>, BridgeError> {
    let node = if self.core().has_method("getSourceFile")? {
      self.core().call("getSourceFile", Vec::new(), &cached::<Node>())?
    } else {
      let mut node = self.clone();
      while let Some(parent) = node.parent()? {
        node = parent;
      }
      node
    };
    node.source_file_view()
  }

  pub fn as_source_file(&self) -> Result<Option<SourceFile<'js>>, BridgeError> {
    SourceFile::narrow(self)
  }

  /// Like [`Node::as_source_file`], but a node of another kind is an error.
  pub fn source_file_view(&self) -> Result<SourceFile<'js>, BridgeError> {
    match SourceFile::narrow(self)? {
      Some(file) => Ok(file),
      None => Err(BridgeError::KindMismatch {
        expected: <SourceFile as Narrow<Node>>::KIND,
        actual: SourceFile::describe(self)?,
      }),
    }
  }
}

impl PartialEq for Node<'_> {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Node<'_> {}

impl Hash for Node<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.id.hash(state)
  }
}

impl fmt::Debug for Node<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Node({})", self.0.id.0)
  }
}

/// The `SourceFile` view of a node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceFile<'js>(Node<'js>);

impl<'js> Narrow<Node<'js>> for SourceFile<'js> {
  const KIND: &'static str = "SourceFile";

  fn narrow(node: &Node<'js>) -> Result<Option<Self>, BridgeError> {
    Ok(node.is_kind("SourceFile")?.then(|| SourceFile(node.clone())))
  }

  fn describe(node: &Node<'js>) -> Result<String, BridgeError> {
    Ok(node.syntax_kind()?.to_string())
  }
}

impl<'js> SourceFile<'js> {
  pub fn node(&self) -> &Node<'js> {
    &self.0
  }

  pub fn into_node(self) -> Node<'js> {
    self.0
  }

  pub fn file_name(&self) -> Result<String, BridgeError> {
    self.0.core().read("fileName", &STRING)
  }

  /// Full text of the file.
  pub fn text(&self) -> Result<String, BridgeError> {
    self.0.core().read("text", &STRING)
  }

  pub fn script_kind(&self) -> Result<Option<ScriptKind>, BridgeError> {
    self
      .0
      .core()
      .read_nullable("scriptKind", &enum_from_code(closed::<ScriptKind>()))
  }

  pub fn is_declaration_file(&self) -> Result<bool, BridgeError> {
    Ok(self.0.core().read_nullable("isDeclarationFile", &BOOL)?.unwrap_or(false))
  }

  pub fn statements(&self) -> Result<NodeList<'js>, BridgeError> {
    self.0.core().read("statements", &NODE_LIST)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::eval;
  use crate::testing::with_context;

  #[test]
  fn identifier_reports_kind_and_text() {
    with_context(|cx| {
      let node: Node = cx.resolve(eval(cx, "({ kind: 1, pos: 0, end: 1, text: 'x' })")).unwrap();
      assert_eq!(node.syntax_kind().unwrap(), "Identifier");
      assert_eq!(node.get_text().unwrap(), "x");
      assert_eq!(node.start().unwrap(), 0);
      assert!(node.as_source_file().unwrap().is_none());
    });
  }

  #[test]
  fn primitive_fields_are_typed() {
    with_context(|cx| {
      let node: Node = cx
        .resolve(eval(
          cx,
          "({ kind: 1, isTypeOnly: true, text: 'x', count: 2.5, label: null, flags: 16 })",
        ))
        .unwrap();
      assert!(node.bool_field("isTypeOnly").unwrap());
      assert_eq!(node.string_field("text").unwrap(), "x");
      assert_eq!(node.number_field("count").unwrap(), 2.5);
      assert_eq!(node.optional_string_field("label").unwrap(), None);
      assert_eq!(node.flags().unwrap(), 16);

      let err = node.bool_field("text").unwrap_err();
      assert_eq!(
        err.to_string(),
        "`Node.text`: shape mismatch: expected boolean, found string"
      );
      let err = node.string_field("missing").unwrap_err();
      assert_eq!(err.to_string(), "`Node.missing`: required value is null or undefined");
    });
  }

  #[test]
  fn unknown_kind_codes_are_version_skew() {
    with_context(|cx| {
      let node: Node = cx.resolve(eval(cx, "({ kind: 77 })")).unwrap();
      let err = node.syntax_kind().unwrap_err();
      assert!(matches!(
        err.root(),
        BridgeError::UnknownCode {
          table: "SyntaxKind",
          code: 77
        }
      ));
    });
  }

  #[test]
  fn source_file_view_is_gated_on_kind() {
    with_context(|cx| {
      let file: Node = cx
        .resolve(eval(
          cx,
          "({ kind: 2, fileName: 'a.ts', text: 'x', scriptKind: 3, statements: Object.assign([], { pos: 0, end: 1 }) })",
        ))
        .unwrap();
      let view = file.source_file_view().unwrap();
      assert_eq!(view.file_name().unwrap(), "a.ts");
      assert_eq!(view.script_kind().unwrap(), Some(ScriptKind::Ts));
      assert!(!view.is_declaration_file().unwrap());
      assert!(view.statements().unwrap().is_empty());
      assert_eq!(view.node(), &file);

      let identifier: Node = cx.resolve(eval(cx, "({ kind: 1 })")).unwrap();
      let err = identifier.source_file_view().unwrap_err();
      assert_eq!(
        err.to_string(),
        "kind mismatch: expected SourceFile, found Identifier"
      );
    });
  }

  #[test]
  fn children_need_a_walker() {
    with_context(|cx| {
      let node: Node = cx.resolve(eval(cx, "({ kind: 1 })")).unwrap();
      let err = node.children().unwrap_err();
      assert!(matches!(err.root(), BridgeError::MissingValue), "{err}");
    });
  }
}
