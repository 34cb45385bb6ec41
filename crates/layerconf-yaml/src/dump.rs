//! Config trees to YAML text.

use crate::error::{Result, YamlError};
use layerconf::{ExportOptions, Node, Scalar, Value};
use yaml_rust2::yaml::Hash;
use yaml_rust2::{Yaml, YamlEmitter};

/// Render a tree as a YAML document. With `resolve`, interpolations are
/// replaced by their values; missing values are written as `???` either way.
pub fn dump(node: &Node, resolve: bool) -> Result<String> {
    let options = ExportOptions {
        resolve,
        enum_to_str: false,
        ..ExportOptions::default()
    };
    let exported = node.to_container_with(&options)?;
    let yaml = value_to_yaml(&exported, &node.full_key())?;

    let mut out = String::new();
    YamlEmitter::new(&mut out).dump(&yaml)?;
    out.push('\n');
    Ok(out)
}

fn value_to_yaml(value: &Value, full_key: &str) -> Result<Yaml> {
    Ok(match value {
        Value::Scalar(scalar) => scalar_to_yaml(scalar),
        Value::List(items) => Yaml::Array(
            items
                .iter()
                .map(|item| value_to_yaml(item, full_key))
                .collect::<Result<_>>()?,
        ),
        Value::Map(entries) => {
            let mut hash = Hash::new();
            for (key, item) in entries {
                hash.insert(Yaml::String(key.clone()), value_to_yaml(item, full_key)?);
            }
            Yaml::Hash(hash)
        }
        Value::Node(_) => {
            return Err(YamlError::Unsupported {
                message: "exported tree still holds a node".to_string(),
                full_key: full_key.to_string(),
            });
        }
    })
}

fn scalar_to_yaml(scalar: &Scalar) -> Yaml {
    match scalar {
        Scalar::Null => Yaml::Null,
        Scalar::Bool(b) => Yaml::Boolean(*b),
        Scalar::Int(i) => Yaml::Integer(*i),
        Scalar::Float(f) if f.is_nan() => Yaml::Real(".nan".to_string()),
        Scalar::Float(f) if f.is_infinite() => {
            Yaml::Real(if *f > 0.0 { ".inf" } else { "-.inf" }.to_string())
        }
        Scalar::Float(_) => Yaml::Real(scalar.to_string()),
        Scalar::Str(s) => Yaml::String(s.clone()),
        Scalar::Enum(member) => Yaml::String(member.member.clone()),
    }
}
