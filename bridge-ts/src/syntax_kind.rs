use crate::convert::exact_i32;
use crate::error::BridgeError;
use ahash::HashMap;
use ahash::HashMapExt;
use core::fmt;
use rquickjs::Object;
use rquickjs::Value;
use std::sync::Arc;

/// A syntax kind as numbered by the embedded compiler, together with its symbolic name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SyntaxKind {
  code: i32,
  name: Arc<str>,
}

impl SyntaxKind {
  pub fn code(&self) -> i32 {
    self.code
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Debug for SyntaxKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.name, self.code)
  }
}

impl fmt::Display for SyntaxKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

impl PartialEq<str> for SyntaxKind {
  fn eq(&self, other: &str) -> bool {
    &*self.name == other
  }
}

impl PartialEq<&str> for SyntaxKind {
  fn eq(&self, other: &&str) -> bool {
    &*self.name == *other
  }
}

fn is_range_marker(name: &str) -> bool {
  name.starts_with("First") || name.starts_with("Last")
}

/// Syntax kind metadata for one session, loaded once from the compiler's enum object.
#[derive(Clone, Debug, Default)]
pub struct SyntaxKindTable {
  by_code: HashMap<i32, SyntaxKind>,
  by_name: HashMap<Arc<str>, i32>,
}

impl SyntaxKindTable {
  /// Reads a `{ name: code }` object. Reverse-mapped entries (`{ "80": "Identifier" }`, as
  /// TypeScript enums carry) are skipped. When several names share a code the first name that
  /// is not a `First*`/`Last*` range marker is canonical.
  pub fn from_object<'js>(object: &Object<'js>) -> Result<Self, BridgeError> {
    let mut entries = Vec::new();
    for prop in object.props::<String, Value>() {
      let (name, value) = prop.map_err(|err| BridgeError::caught(object.ctx(), err))?;
      let Some(number) = value.as_number() else {
        continue;
      };
      let Some(code) = exact_i32(&value) else {
        return Err(BridgeError::shape("32-bit integer", format!("{number}")).at(name));
      };
      entries.push((name, code));
    }
    Ok(Self::from_entries(entries))
  }

  pub fn from_entries<N: Into<Arc<str>>>(entries: impl IntoIterator<Item = (N, i32)>) -> Self {
    let mut table = SyntaxKindTable {
      by_code: HashMap::new(),
      by_name: HashMap::new(),
    };
    for (name, code) in entries {
      let name: Arc<str> = name.into();
      table.by_name.insert(name.clone(), code);
      let replace = match table.by_code.get(&code) {
        None => true,
        Some(existing) => is_range_marker(existing.name()) && !is_range_marker(&name),
      };
      if replace {
        table.by_code.insert(code, SyntaxKind { code, name });
      }
    }
    table
  }

  pub fn len(&self) -> usize {
    self.by_code.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_code.is_empty()
  }

  pub fn kind(&self, code: i32) -> Option<SyntaxKind> {
    self.by_code.get(&code).cloned()
  }

  pub fn code(&self, name: &str) -> Option<i32> {
    self.by_name.get(name).copied()
  }

  /// Looks up a kind by name, including range-marker aliases.
  pub fn by_name(&self, name: &str) -> Option<SyntaxKind> {
    self.code(name).and_then(|code| self.kind(code))
  }
}

/// A closed enum the embedded compiler encodes as integers.
pub trait CodeEnum: Sized {
  /// Name used in [`BridgeError::UnknownCode`].
  const TABLE: &'static str;

  fn from_code(code: i32) -> Option<Self>;
}

/// `ts.ScriptKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptKind {
  Unknown,
  Js,
  Jsx,
  Ts,
  Tsx,
  External,
  Json,
  Deferred,
}

impl CodeEnum for ScriptKind {
  const TABLE: &'static str = "ScriptKind";

  fn from_code(code: i32) -> Option<Self> {
    Some(match code {
      0 => ScriptKind::Unknown,
      1 => ScriptKind::Js,
      2 => ScriptKind::Jsx,
      3 => ScriptKind::Ts,
      4 => ScriptKind::Tsx,
      5 => ScriptKind::External,
      6 => ScriptKind::Json,
      7 => ScriptKind::Deferred,
      _ => return None,
    })
  }
}

/// `ts.SignatureKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureKind {
  Call,
  Construct,
}

impl SignatureKind {
  pub fn code(self) -> i32 {
    match self {
      SignatureKind::Call => 0,
      SignatureKind::Construct => 1,
    }
  }
}

impl CodeEnum for SignatureKind {
  const TABLE: &'static str = "SignatureKind";

  fn from_code(code: i32) -> Option<Self> {
    match code {
      0 => Some(SignatureKind::Call),
      1 => Some(SignatureKind::Construct),
      _ => None,
    }
  }
}
