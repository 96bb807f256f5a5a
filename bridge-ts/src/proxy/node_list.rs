use super::Node;
use super::ProxyCore;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::Conversion;
use crate::convert::BOOL;
use crate::convert::I32;
use crate::error::BridgeError;
use core::fmt;
use rquickjs::Value;
use std::rc::Rc;

/// Owns a list's handle and hands it back to the context when the last clone goes away.
struct ListHandle<'js>(ProxyCore<'js>);

impl Drop for ListHandle<'_> {
  fn drop(&mut self) {
    self.0.release();
  }
}

/// A `ts.NodeArray`. Elements are converted lazily, one per access.
#[derive(Clone)]
pub struct NodeList<'js> {
  core: Rc<ListHandle<'js>>,
  len: usize,
}

impl<'js> NodeList<'js> {
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// The element at `index`, or `None` past the end.
  pub fn get(&self, index: usize) -> Result<Option<Node<'js>>, BridgeError> {
    if index >= self.len {
      return Ok(None);
    }
    let run = || {
      let cx = self.core.0.context()?;
      let value = self.core.0.value(&cx)?;
      let Some(array) = value.as_array() else {
        return Err(BridgeError::shape("array", value.type_name()));
      };
      let element: Value<'js> = array.get(index).map_err(|err| cx.foreign_error(err))?;
      cached::<Node>().convert_non_null(&cx, element).map(Some)
    };
    run().map_err(|err| err.at(format!("{}[{index}]", self.core.0.kind())))
  }

  pub fn iter(&self) -> impl Iterator<Item = Result<Node<'js>, BridgeError>> + '_ {
    (0..self.len).filter_map(move |i| self.get(i).transpose())
  }

  pub fn to_vec(&self) -> Result<Vec<Node<'js>>, BridgeError> {
    self.iter().collect()
  }

  pub fn pos(&self) -> Result<i32, BridgeError> {
    self.core.0.read("pos", &I32)
  }

  pub fn end(&self) -> Result<i32, BridgeError> {
    self.core.0.read("end", &I32)
  }

  pub fn has_trailing_comma(&self) -> Result<bool, BridgeError> {
    Ok(self.core.0.read_nullable("hasTrailingComma", &BOOL)?.unwrap_or(false))
  }
}

impl fmt::Debug for NodeList<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NodeList").field("len", &self.len).finish()
  }
}

/// Wraps a node array. Node arrays have no identity of their own, so each conversion retains
/// a fresh handle, released again once the resulting [`NodeList`] and its clones are dropped.
#[derive(Clone, Copy, Debug)]
pub struct NodeListConversion;

pub const NODE_LIST: NodeListConversion = NodeListConversion;

impl<'js> Conversion<'js> for NodeListConversion {
  type Output = NodeList<'js>;

  fn convert_unsafe(&self, cx: &ProgramContext<'js>, value: Value<'js>) -> Result<NodeList<'js>, BridgeError> {
    let Some(array) = value.as_array() else {
      return Err(BridgeError::shape("array", value.type_name()));
    };
    let len = array.len();
    let handle = cx.retain_value(value.clone())?;
    Ok(NodeList {
      core: Rc::new(ListHandle(ProxyCore::new(cx, handle, "NodeList"))),
      len,
    })
  }
}
