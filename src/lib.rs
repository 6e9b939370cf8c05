//! Typed-schema engine.
//!
//! Schema files written in OTL declare type hierarchies with fields,
//! attributes and members. The engine loads them incrementally through a
//! module manager, lints and runs them through a visitor pipeline and keeps
//! the resulting types in a shared [`typing::TypeGraph`].
//!
//! # Module Structure
//!
//! ```text
//! logger       log!/debug! macros, watch status line
//! error        EngineError
//! config       typing.toml
//! utils        path helpers
//! vault        FileProvider, MemoryVault, DiskVault, FileEvent
//! module       ModuleManager, Evaluator, DependencyGraph
//! syntax       OTL grammar and syntax trees
//! typing       Value, FieldType, Field, Type, TypeGraph
//! visitor      lint / run / complete visitors
//! interpreter  schema evaluator
//! scripting    script evaluator
//! context      AppContext
//! watch        file watcher
//! cli          command-line interface
//! ```

pub mod logger;

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod module;
pub mod scripting;
pub mod syntax;
pub mod typing;
pub mod utils;
pub mod vault;
pub mod visitor;
pub mod watch;
