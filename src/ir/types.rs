//! Value types of the SSA IR

use std::fmt;

/// Types carried by SSA values
///
/// Names follow Go's spelling (`int`, `uint8`, `*T`, `[]T`, `[4]T`) since that is what the
/// SSA front-end emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    /// Fixed-width integer; `int`/`uint`/`uintptr` are 64 bits wide
    Int { bits: u32, signed: bool },
    Float32,
    Float64,
    Complex128,
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array { len: u64, elem: Box<Type> },
    /// A named (struct) type, accessed through field arrays
    Named(String),
    /// Types the memory model only sees as opaque handles: strings, maps, channels,
    /// functions, interfaces and tuples
    Opaque(String),
}

impl Type {
    pub fn int() -> Self {
        Type::Int {
            bits: 64,
            signed: true,
        }
    }

    pub fn uint() -> Self {
        Type::Int {
            bits: 64,
            signed: false,
        }
    }

    pub fn pointer_to(ty: Type) -> Self {
        Type::Pointer(Box::new(ty))
    }

    pub fn slice_of(ty: Type) -> Self {
        Type::Slice(Box::new(ty))
    }

    /// Primitive types map straight onto a solver sort and are accessed directly
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::Int { .. } | Type::Float32 | Type::Float64 | Type::Complex128
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Named(_))
    }

    /// Slices and fixed-size arrays; both index through an element array
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Slice(_) | Type::Array { .. })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Int { signed: true, .. })
    }

    /// The pointee of a pointer type
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// The element type reached by indexing: `[]T`, `[N]T` and `*[N]T` all yield `T`
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Slice(elem) | Type::Array { elem, .. } => Some(elem),
            Type::Pointer(inner) => match inner.as_ref() {
                Type::Array { elem, .. } => Some(elem),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int { bits: 64, signed: true } => write!(f, "int"),
            Type::Int { bits: 64, signed: false } => write!(f, "uint"),
            Type::Int { bits, signed: true } => write!(f, "int{}", bits),
            Type::Int { bits, signed: false } => write!(f, "uint{}", bits),
            Type::Float32 => write!(f, "float32"),
            Type::Float64 => write!(f, "float64"),
            Type::Complex128 => write!(f, "complex128"),
            Type::Pointer(inner) => write!(f, "*{}", inner),
            Type::Slice(elem) => write!(f, "[]{}", elem),
            Type::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            Type::Named(name) | Type::Opaque(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for Type {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty type".to_string());
        }

        if let Some(inner) = s.strip_prefix('*') {
            return Ok(Type::pointer_to(inner.parse()?));
        }
        if let Some(elem) = s.strip_prefix("[]") {
            return Ok(Type::slice_of(elem.parse()?));
        }
        if let Some(rest) = s.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| format!("unterminated array type: {}", s))?;
            let len = rest[..close]
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid array length in '{}': {}", s, e))?;
            let elem = rest[close + 1..].parse()?;
            return Ok(Type::Array {
                len,
                elem: Box::new(elem),
            });
        }

        let ty = match s {
            "bool" => Type::Bool,
            "int" => Type::int(),
            "uint" | "uintptr" => Type::uint(),
            "int8" => Type::Int { bits: 8, signed: true },
            "int16" => Type::Int { bits: 16, signed: true },
            "int32" | "rune" => Type::Int { bits: 32, signed: true },
            "int64" => Type::Int { bits: 64, signed: true },
            "uint8" | "byte" => Type::Int { bits: 8, signed: false },
            "uint16" => Type::Int { bits: 16, signed: false },
            "uint32" => Type::Int { bits: 32, signed: false },
            "uint64" => Type::Int { bits: 64, signed: false },
            "float32" => Type::Float32,
            "float64" => Type::Float64,
            "complex128" => Type::Complex128,
            _ if is_opaque_name(s) => Type::Opaque(s.to_string()),
            _ if is_identifier(s) => Type::Named(s.to_string()),
            _ => return Err(format!("unknown type: {}", s)),
        };
        Ok(ty)
    }
}

fn is_opaque_name(s: &str) -> bool {
    s == "string"
        || s == "error"
        || s == "any"
        || s.starts_with("map[")
        || s.starts_with("chan ")
        || s.starts_with("<-chan ")
        || s.starts_with("func(")
        || s.starts_with("interface{")
        || s.starts_with('(')
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
