use super::Node;
use super::Type;
use crate::context::ProgramContext;
use crate::convert::cached;
use crate::convert::BOOL;
use crate::error::BridgeError;
use rquickjs::Object;

/// An index signature (`[key: string]: T`) of an object type. A plain value: index infos have
/// no identity and are rebuilt on every query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexInfo<'js> {
  pub key_type: Type<'js>,
  pub value_type: Type<'js>,
  pub is_readonly: bool,
  pub declaration: Option<Node<'js>>,
}

/// Reads a `ts.IndexInfo`; for use with [`builder`](crate::convert::builder).
pub(crate) fn index_info<'js>(cx: &ProgramContext<'js>, object: &Object<'js>) -> Result<IndexInfo<'js>, BridgeError> {
  Ok(IndexInfo {
    key_type: cx.read(object, "keyType", &cached::<Type>())?,
    value_type: cx.read(object, "type", &cached::<Type>())?,
    is_readonly: cx.read_nullable(object, "isReadonly", &BOOL)?.unwrap_or(false),
    declaration: cx.read_nullable(object, "declaration", &cached::<Node>())?,
  })
}
