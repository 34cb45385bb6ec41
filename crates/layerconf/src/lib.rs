//! Hierarchical configuration trees with layered merging and interpolation.
//!
//! A config is a tree of [`Node`]s: maps, sequences and scalar leaves.
//! Trees are built from plain nested data, composed from several layers
//! (defaults, files, command-line overrides) with [`merge`], and read with
//! `${...}` references resolved on access.
//!
//! # Key Features
//!
//! - **Layered merging**: maps merge recursively, later layers win on
//!   scalars, sequences are replaced as a whole
//! - **Interpolation**: `${a.b}` references other nodes, `${tag:args}` calls
//!   a registered resolver
//! - **Inherited flags**: `readonly` and `struct` apply to a whole subtree
//!   unless overridden below
//! - **Typed schemas**: [`Schema`] describes typed, closed maps whose leaves
//!   coerce assigned values
//!
//! # Example
//!
//! ```rust
//! use layerconf::{Node, Value, merge};
//! use serde_json::json;
//!
//! let defaults = Node::create(Value::from(json!({
//!     "server": {"host": "localhost", "port": 80},
//!     "url": "http://${server.host}:${server.port}",
//! })))
//! .unwrap();
//! let overrides = Node::create(Value::from(json!({"server": {"port": 8080}}))).unwrap();
//!
//! let cfg = merge([&defaults, &overrides]).unwrap();
//! assert_eq!(cfg.select("server.port").unwrap(), Some(Value::from(8080)));
//! assert_eq!(cfg.get("url").unwrap(), Some(Value::from("http://localhost:8080")));
//! ```

mod container;
mod error;
mod export;
mod flags;
pub mod interpolation;
mod key;
mod leaf;
mod map;
mod merge;
mod node;
pub mod resolver;
mod scalar;
mod schema;
mod select;
mod sequence;
mod value;

pub use error::{
    AccessKind,
    ConfigError,
    Result,
};

pub use export::ExportOptions;

pub use flags::{
    Flag,
    Flags,
    open_struct,
    read_write,
};

pub use key::{
    Key,
    format_key_path,
    split_dotted,
};

pub use merge::merge;

pub use node::Node;

pub use resolver::{
    ResolverOptions,
    ResolverRegistry,
};

pub use scalar::{
    EnumType,
    EnumValue,
    MISSING,
    Scalar,
    ScalarType,
};

pub use schema::{
    Field,
    FieldType,
    Schema,
    Structured,
};

pub use select::{
    Selected,
    Selection,
};

pub use value::Value;
