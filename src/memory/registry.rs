//! Program-wide registry of solver sorts, heap arrays, field arrays and
//! uninterpreted functions
//!
//! The registry describes the program, not a path: every exploration state shares the one
//! owned by the engine. All lookups are keyed by interned [`TypeId`]s so repeated requests
//! for the same type, field or function yield the same solver handle.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use z3::ast::Array;
use z3::{FuncDecl, Sort, Symbol};

use crate::ir::Type;

/// Interned handle for a type known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

/// Interned handle for one field of one struct type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

/// Width of the bitvector used for slice and array indices
pub const INDEX_BITS: u32 = 64;

/// Solver view of one program type
#[derive(Debug)]
pub struct SymbolicType {
    pub id: TypeId,
    pub ty: Type,
    pub sort: Sort,
    /// Heap arena: address -> content of this type
    values: Option<Array>,
    /// Container address -> (index -> element), only for slices and arrays
    elements: Option<Array>,
    fields: BTreeMap<usize, FieldId>,
}

/// Storage for one struct field: struct address -> field content
#[derive(Debug)]
pub struct SymbolicField {
    pub owner: TypeId,
    pub index: usize,
    pub ty: TypeId,
    pub array: Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FunctionKey {
    name: String,
    args: Vec<TypeId>,
    result: TypeId,
}

/// Resolve the sort backing a type
///
/// Primitives map onto their own sort. Everything reached through an address (pointers,
/// slices, arrays, structs) or treated as an opaque handle uses the integer sort.
pub fn sort_for(ty: &Type) -> Sort {
    match ty {
        Type::Bool => Sort::bool(),
        Type::Int { bits, .. } => Sort::bitvector(*bits),
        Type::Float32 => Sort::float(8, 24),
        Type::Float64 => Sort::float(11, 53),
        Type::Complex128 => Sort::uninterpreted(Symbol::String("complex128".to_string())),
        Type::Pointer(_)
        | Type::Slice(_)
        | Type::Array { .. }
        | Type::Named(_)
        | Type::Opaque(_) => Sort::int(),
    }
}

#[derive(Default)]
pub struct TypeRegistry {
    types: Vec<SymbolicType>,
    by_name: HashMap<String, TypeId>,
    fields: Vec<SymbolicField>,
    functions: HashMap<FunctionKey, Rc<FuncDecl>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.len())
            .field("fields", &self.fields.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type, creating its sort on first reference
    pub fn get_or_create_type(&mut self, ty: &Type) -> TypeId {
        let name = ty.to_string();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }

        let id = TypeId(self.types.len());
        self.types.push(SymbolicType {
            id,
            ty: ty.clone(),
            sort: sort_for(ty),
            values: None,
            elements: None,
            fields: BTreeMap::new(),
        });
        self.by_name.insert(name, id);
        id
    }

    /// Intern a type given by its listing name
    pub fn get_or_create_type_named(&mut self, name: &str) -> Result<TypeId, String> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }
        let ty: Type = name.parse()?;
        Ok(self.get_or_create_type(&ty))
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: TypeId) -> &SymbolicType {
        &self.types[id.0]
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0].ty
    }

    pub fn sort(&self, id: TypeId) -> &Sort {
        &self.types[id.0].sort
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// The heap arena of a type: `Int -> sort(T)`, created on first use
    pub fn values(&mut self, id: TypeId) -> Array {
        let entry = &mut self.types[id.0];
        if let Some(values) = &entry.values {
            return values.clone();
        }
        let array = Array::new_const(format!("{}:values", entry.ty), &Sort::int(), &entry.sort);
        entry.values = Some(array.clone());
        array
    }

    /// The element storage of a slice or array type: `Int -> (BV64 -> sort(elem))`
    ///
    /// Returns `None` for types that cannot be indexed.
    pub fn elements(&mut self, id: TypeId) -> Option<Array> {
        if let Some(elements) = &self.types[id.0].elements {
            return Some(elements.clone());
        }

        let container = self.types[id.0].ty.clone();
        let elem = container.element()?.clone();
        let elem_id = self.get_or_create_type(&elem);
        let inner = Sort::array(&Sort::bitvector(INDEX_BITS), self.sort(elem_id));
        let array = Array::new_const(format!("{}:elements", container), &Sort::int(), &inner);
        self.types[id.0].elements = Some(array.clone());
        Some(array)
    }

    /// Register a field of a struct type, creating its array on first use
    pub fn add_field(&mut self, owner: TypeId, index: usize, field_ty: &Type) -> FieldId {
        if let Some(id) = self.types[owner.0].fields.get(&index) {
            return *id;
        }

        let ty = self.get_or_create_type(field_ty);
        let array = Array::new_const(
            format!("{}:{}:mem", self.types[owner.0].ty, index),
            &Sort::int(),
            self.sort(ty),
        );
        let id = FieldId(self.fields.len());
        self.fields.push(SymbolicField {
            owner,
            index,
            ty,
            array,
        });
        self.types[owner.0].fields.insert(index, id);
        id
    }

    pub fn field(&self, id: FieldId) -> &SymbolicField {
        &self.fields[id.0]
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Uninterpreted function for `name: (args...) -> result`, declared once per signature
    pub fn get_or_create_function(
        &mut self,
        name: &str,
        args: &[TypeId],
        result: TypeId,
    ) -> Rc<FuncDecl> {
        let key = FunctionKey {
            name: name.to_string(),
            args: args.to_vec(),
            result,
        };
        if let Some(decl) = self.functions.get(&key) {
            return Rc::clone(decl);
        }

        let domain: Vec<&Sort> = args.iter().map(|id| &self.types[id.0].sort).collect();
        let decl = Rc::new(FuncDecl::new(name, &domain, &self.types[result.0].sort));
        self.functions.insert(key, Rc::clone(&decl));
        decl
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
