//! Node flags and their inheritance.
//!
//! Each node stores a tri-state value per flag: set true, set false, or
//! unset. The effective value of a flag is the nearest set value on the path
//! from the node up to the root, or `false` when none is set.

use crate::node::Node;

/// Flags recognized by the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Blocks every mutation of the node and its descendants.
    Readonly,
    /// Blocks access to keys that are not already present.
    Struct,
}

/// Local (non-inherited) flag values of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    readonly: Option<bool>,
    struct_mode: Option<bool>,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> Option<bool> {
        match flag {
            Flag::Readonly => self.readonly,
            Flag::Struct => self.struct_mode,
        }
    }

    pub fn set(&mut self, flag: Flag, value: Option<bool>) {
        match flag {
            Flag::Readonly => self.readonly = value,
            Flag::Struct => self.struct_mode = value,
        }
    }
}

impl Node {
    /// Set or clear (`None`) a local flag value.
    pub fn set_flag(&self, flag: Flag, value: Option<bool>) {
        self.data_mut().flags.set(flag, value);
    }

    /// The local value of a flag, ignoring ancestors.
    pub fn local_flag(&self, flag: Flag) -> Option<bool> {
        self.data().flags.get(flag)
    }

    /// The inherited value of a flag.
    pub fn effective_flag(&self, flag: Flag) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if let Some(value) = node.local_flag(flag) {
                return value;
            }
            current = node.parent();
        }
        false
    }

    pub fn set_readonly(&self, value: bool) {
        self.set_flag(Flag::Readonly, Some(value));
    }

    pub fn is_readonly(&self) -> bool {
        self.effective_flag(Flag::Readonly)
    }

    pub fn set_struct(&self, value: bool) {
        self.set_flag(Flag::Struct, Some(value));
    }

    pub fn is_struct(&self) -> bool {
        self.effective_flag(Flag::Struct)
    }
}

/// Restores a node's previous local flag value when dropped.
struct FlagOverride {
    node: Node,
    flag: Flag,
    previous: Option<bool>,
}

impl FlagOverride {
    fn new(node: &Node, flag: Flag, value: bool) -> Self {
        let previous = node.local_flag(flag);
        node.set_flag(flag, Some(value));
        Self {
            node: node.clone(),
            flag,
            previous,
        }
    }
}

impl Drop for FlagOverride {
    fn drop(&mut self) {
        self.node.set_flag(self.flag, self.previous);
    }
}

/// Run `f` with `readonly` locally disabled on `node`.
pub fn read_write<R>(node: &Node, f: impl FnOnce(&Node) -> R) -> R {
    let _guard = FlagOverride::new(node, Flag::Readonly, false);
    f(node)
}

/// Run `f` with `struct` locally disabled on `node`.
pub fn open_struct<R>(node: &Node, f: impl FnOnce(&Node) -> R) -> R {
    let _guard = FlagOverride::new(node, Flag::Struct, false);
    f(node)
}
