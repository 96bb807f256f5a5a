//! Typed, identity-stable access to a TypeScript compiler running inside an embedded QuickJS
//! runtime.
//!
//! The compiler lives entirely in the embedded heap; this crate gives host code a typed view of
//! it. It provides:
//! - An owned embedded runtime ([`EmbeddedRuntime`]) that loads the compiler bundle
//! - A per-session [`ProgramContext`] owning the program, type checker and every handle taken
//!   during the session
//! - Typed proxies ([`Node`], [`NodeList`], [`Type`], [`Symbol`], [`Signature`], ...) over
//!   foreign compiler objects
//! - Composable value conversions ([`convert`]) used by every proxy accessor
//! - Scanner sessions ([`ScannerContext`]) for tokenizing text with the compiler's own scanner
//!
//! # Identity
//!
//! Proxies that denote compiler entities are deduplicated per context: resolving the same
//! foreign object twice, or two distinct objects carrying the same checker identity, yields the
//! same proxy, so `==` on proxies means "same entity". Nodes are keyed by the compiler's
//! `getNodeId`, types by their checker-assigned `id`, and symbols and signatures by an
//! [`IdentitySource`] chosen in [`ContextOptions`].
//!
//! # Handle ownership
//!
//! Every foreign handle a proxy wraps is owned by its context's [`ResourceHolder`]. Closing the
//! context releases all of them at once; proxies that outlive the close fail with
//! [`LifecycleError::UseAfterClose`] instead of touching freed memory. Proxies only hold a weak
//! reference to their context, so keeping a proxy around never keeps a session alive.
//!
//! # Example
//!
//! ```no_run
//! use bridge_ts::{ContextOptions, EmbeddedRuntime, ProgramContext, RuntimeOptions};
//!
//! # fn main() -> Result<(), bridge_ts::BridgeError> {
//! let runtime = EmbeddedRuntime::new(RuntimeOptions::default())?;
//! runtime.load_script("typescript.js", "/* compiler bundle */")?;
//! runtime.with(|ctx| -> Result<(), bridge_ts::BridgeError> {
//!   let parse_result = ctx.eval("createParseResult('let x = 1;')").map_err(|err| {
//!     bridge_ts::BridgeError::Foreign { message: err.to_string() }
//!   })?;
//!   let cx = ProgramContext::new(ctx, parse_result, ContextOptions::default())?;
//!   for file in cx.source_files()? {
//!     let file = file.source_file_view()?;
//!     println!("{}: {} statements", file.file_name()?, file.statements()?.len());
//!   }
//!   cx.close()
//! })?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod checker;
mod context;
pub mod convert;
mod error;
mod holder;
mod options;
pub mod proxy;
mod runtime;
mod scanner;
mod syntax_kind;

#[cfg(test)]
mod testing;

pub use crate::cache::CachedProxy;
pub use crate::cache::ObjectCache;
pub use crate::checker::TypeChecker;
pub use crate::context::CacheSizes;
pub use crate::context::ProgramContext;
pub use crate::error::BridgeError;
pub use crate::error::LifecycleError;
pub use crate::holder::Close;
pub use crate::holder::HandleId;
pub use crate::holder::ResourceHolder;
pub use crate::holder::Retained;
pub use crate::options::ContextOptions;
pub use crate::options::IdentitySource;
pub use crate::options::RuntimeOptions;
pub use crate::proxy::IndexInfo;
pub use crate::proxy::LiteralValue;
pub use crate::proxy::Node;
pub use crate::proxy::NodeId;
pub use crate::proxy::NodeList;
pub use crate::proxy::ObjectFlags;
pub use crate::proxy::Signature;
pub use crate::proxy::SignatureId;
pub use crate::proxy::SourceFile;
pub use crate::proxy::Symbol;
pub use crate::proxy::SymbolFlags;
pub use crate::proxy::SymbolId;
pub use crate::proxy::Type;
pub use crate::proxy::TypeFlags;
pub use crate::proxy::TypeId;
pub use crate::runtime::EmbeddedRuntime;
pub use crate::scanner::ScannerContext;
pub use crate::scanner::Token;
pub use crate::syntax_kind::CodeEnum;
pub use crate::syntax_kind::ScriptKind;
pub use crate::syntax_kind::SignatureKind;
pub use crate::syntax_kind::SyntaxKind;
pub use crate::syntax_kind::SyntaxKindTable;
