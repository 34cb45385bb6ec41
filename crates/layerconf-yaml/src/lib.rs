//! YAML text and `key=value` overrides for layerconf trees.
//!
//! - [`load_str`] parses a YAML document into a [`layerconf::Node`]
//! - [`dump`] renders a tree back to YAML, raw or resolved
//! - [`from_dotlist`], [`merge_with_dotlist`] and [`from_cli`] apply
//!   command-line style overrides such as `server.port=8080`
//!
//! ```rust
//! use layerconf::{Value, merge};
//! use layerconf_yaml::{from_cli, load_str};
//!
//! let base = load_str("server:\n  host: localhost\n  port: 80\n").unwrap();
//! let cli = from_cli(vec!["server.port=8080".to_string()]).unwrap();
//! let cfg = merge([&base, &cli]).unwrap();
//! assert_eq!(cfg.select("server.port").unwrap(), Some(Value::from(8080)));
//! ```

mod dotlist;
mod dump;
mod error;
mod load;

pub use dotlist::{from_cli, from_dotlist, merge_with_dotlist, parse_scalar, parse_value};
pub use dump::dump;
pub use error::{Result, YamlError};
pub use load::load_str;
