//! Symbolic memory model
//!
//! Two layers:
//! - [`TypeRegistry`]: program-wide sorts, heap arrays, field arrays and function symbols
//! - [`SymbolicMemory`]: the per-state map from SSA names to solver constants
//!
//! Forking a state clones its [`SymbolicMemory`]; the registry is never cloned, so both
//! children keep agreeing on what a type or field means.

pub mod registry;

pub use registry::{FieldId, SymbolicField, SymbolicType, TypeId, TypeRegistry, INDEX_BITS};

use std::collections::HashMap;

use z3::ast::Dynamic;

use crate::ir::Type;

/// A program variable bound to a solver constant
#[derive(Debug, Clone)]
pub struct SymbolicVar {
    pub value: Dynamic,
    pub ty: TypeId,
    pub is_pointer: bool,
    pub is_struct: bool,
    pub is_array: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolicMemory {
    vars: HashMap<String, SymbolicVar>,
    generations: HashMap<String, u32>,
}

impl SymbolicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a fresh constant of the sort of `ty`
    ///
    /// Re-defining a name (a loop body executed twice on one path) binds a new constant
    /// named `name#n`, leaving earlier constraints over the old one intact.
    pub fn add_variable(
        &mut self,
        name: &str,
        ty: &Type,
        registry: &mut TypeRegistry,
    ) -> &SymbolicVar {
        let id = registry.get_or_create_type(ty);
        let generation = self.generations.entry(name.to_string()).or_insert(0);
        let symbol = if *generation == 0 {
            name.to_string()
        } else {
            format!("{}#{}", name, generation)
        };
        *generation += 1;

        let var = SymbolicVar {
            value: Dynamic::new_const(symbol, registry.sort(id)),
            ty: id,
            is_pointer: ty.is_pointer(),
            is_struct: ty.is_struct(),
            is_array: ty.is_array(),
        };
        self.vars.insert(name.to_string(), var);
        &self.vars[name]
    }

    pub fn get(&self, name: &str) -> Option<&SymbolicVar> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Current bindings, in no particular order
    pub fn variables(&self) -> impl Iterator<Item = (&str, &SymbolicVar)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::ast::Ast;
    use z3::Sort;

    #[test]
    fn test_add_and_get() {
        let mut registry = TypeRegistry::new();
        let mut memory = SymbolicMemory::new();

        memory.add_variable("x", &Type::int(), &mut registry);
        let var = memory.get("x").unwrap();
        assert_eq!(var.value.get_sort(), Sort::bitvector(64));
        assert!(!var.is_pointer);
        assert!(memory.contains("x"));
        assert!(memory.get("y").is_none());
    }

    #[test]
    fn test_shape_flags() {
        let mut registry = TypeRegistry::new();
        let mut memory = SymbolicMemory::new();

        let p = memory
            .add_variable("p", &"*Point".parse().unwrap(), &mut registry)
            .clone();
        assert!(p.is_pointer);
        assert!(!p.is_struct);
        assert_eq!(p.value.get_sort(), Sort::int());

        let s = memory
            .add_variable("s", &"Point".parse().unwrap(), &mut registry)
            .clone();
        assert!(s.is_struct);

        let a = memory
            .add_variable("a", &"[]int".parse().unwrap(), &mut registry)
            .clone();
        assert!(a.is_array);
    }

    #[test]
    fn test_redefinition_is_fresh() {
        let mut registry = TypeRegistry::new();
        let mut memory = SymbolicMemory::new();

        let first = memory.add_variable("t", &Type::int(), &mut registry).clone();
        let second = memory.add_variable("t", &Type::int(), &mut registry).clone();
        assert_ne!(first.value.to_string(), second.value.to_string());
        assert_eq!(memory.len(), 1);
        assert_eq!(
            memory.get("t").unwrap().value.to_string(),
            second.value.to_string()
        );
    }

    #[test]
    fn test_fork_isolation() {
        let mut registry = TypeRegistry::new();
        let mut parent = SymbolicMemory::new();
        parent.add_variable("x", &Type::int(), &mut registry);

        let mut child = parent.clone();
        child.add_variable("y", &Type::Bool, &mut registry);
        assert!(child.contains("y"));
        assert!(!parent.contains("y"));
        assert_eq!(registry.type_count(), 2);
    }
}
