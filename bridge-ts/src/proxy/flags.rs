use bitflags::bitflags;

bitflags! {
  /// `ts.TypeFlags`.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct TypeFlags: u32 {
    const ANY = 1 << 0;
    const UNKNOWN = 1 << 1;
    const STRING = 1 << 2;
    const NUMBER = 1 << 3;
    const BOOLEAN = 1 << 4;
    const ENUM = 1 << 5;
    const BIG_INT = 1 << 6;
    const STRING_LITERAL = 1 << 7;
    const NUMBER_LITERAL = 1 << 8;
    const BOOLEAN_LITERAL = 1 << 9;
    const ENUM_LITERAL = 1 << 10;
    const BIG_INT_LITERAL = 1 << 11;
    const ES_SYMBOL = 1 << 12;
    const UNIQUE_ES_SYMBOL = 1 << 13;
    const VOID = 1 << 14;
    const UNDEFINED = 1 << 15;
    const NULL = 1 << 16;
    const NEVER = 1 << 17;
    const TYPE_PARAMETER = 1 << 18;
    const OBJECT = 1 << 19;
    const UNION = 1 << 20;
    const INTERSECTION = 1 << 21;
    const INDEX = 1 << 22;
    const INDEXED_ACCESS = 1 << 23;
    const CONDITIONAL = 1 << 24;
    const SUBSTITUTION = 1 << 25;
    const NON_PRIMITIVE = 1 << 26;
    const TEMPLATE_LITERAL = 1 << 27;
    const STRING_MAPPING = 1 << 28;

    const LITERAL = Self::STRING_LITERAL.bits()
      | Self::NUMBER_LITERAL.bits()
      | Self::BIG_INT_LITERAL.bits()
      | Self::BOOLEAN_LITERAL.bits();
    const UNION_OR_INTERSECTION = Self::UNION.bits() | Self::INTERSECTION.bits();
  }
}

bitflags! {
  /// `ts.ObjectFlags`. Only the low bits with a stable meaning across compiler releases.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct ObjectFlags: u32 {
    const CLASS = 1 << 0;
    const INTERFACE = 1 << 1;
    const REFERENCE = 1 << 2;
    const TUPLE = 1 << 3;
    const ANONYMOUS = 1 << 4;
    const MAPPED = 1 << 5;
    const INSTANTIATED = 1 << 6;
    const OBJECT_LITERAL = 1 << 7;
    const EVOLVING_ARRAY = 1 << 8;
    const OBJECT_LITERAL_PATTERN_WITH_COMPUTED_PROPERTIES = 1 << 9;
    const REVERSE_MAPPED = 1 << 10;
    const JSX_ATTRIBUTES = 1 << 11;
    const JS_LITERAL = 1 << 12;
    const FRESH_LITERAL = 1 << 13;
    const ARRAY_LITERAL = 1 << 14;

    const CLASS_OR_INTERFACE = Self::CLASS.bits() | Self::INTERFACE.bits();
  }
}

bitflags! {
  /// `ts.SymbolFlags`.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct SymbolFlags: u32 {
    const FUNCTION_SCOPED_VARIABLE = 1 << 0;
    const BLOCK_SCOPED_VARIABLE = 1 << 1;
    const PROPERTY = 1 << 2;
    const ENUM_MEMBER = 1 << 3;
    const FUNCTION = 1 << 4;
    const CLASS = 1 << 5;
    const INTERFACE = 1 << 6;
    const CONST_ENUM = 1 << 7;
    const REGULAR_ENUM = 1 << 8;
    const VALUE_MODULE = 1 << 9;
    const NAMESPACE_MODULE = 1 << 10;
    const TYPE_LITERAL = 1 << 11;
    const OBJECT_LITERAL = 1 << 12;
    const METHOD = 1 << 13;
    const CONSTRUCTOR = 1 << 14;
    const GET_ACCESSOR = 1 << 15;
    const SET_ACCESSOR = 1 << 16;
    const SIGNATURE = 1 << 17;
    const TYPE_PARAMETER = 1 << 18;
    const TYPE_ALIAS = 1 << 19;
    const EXPORT_VALUE = 1 << 20;
    const ALIAS = 1 << 21;
    const PROTOTYPE = 1 << 22;
    const EXPORT_STAR = 1 << 23;
    const OPTIONAL = 1 << 24;
    const TRANSIENT = 1 << 25;
    const ASSIGNMENT = 1 << 26;
    const MODULE_EXPORTS = 1 << 27;

    const VARIABLE = Self::FUNCTION_SCOPED_VARIABLE.bits() | Self::BLOCK_SCOPED_VARIABLE.bits();
    const ENUM = Self::REGULAR_ENUM.bits() | Self::CONST_ENUM.bits();
    const ACCESSOR = Self::GET_ACCESSOR.bits() | Self::SET_ACCESSOR.bits();
  }
}

/// Reinterprets a foreign flags word. Unknown bits from newer compilers are kept, not dropped.
pub(crate) fn flag_bits(raw: i64) -> u32 {
  raw as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_bits_survive() {
    let flags = TypeFlags::from_bits_retain(flag_bits(TypeFlags::OBJECT.bits() as i64 | 1 << 30));
    assert!(flags.contains(TypeFlags::OBJECT));
    assert_ne!(flags, TypeFlags::OBJECT);
    assert!(TypeFlags::LITERAL.contains(TypeFlags::STRING_LITERAL));
  }
}
