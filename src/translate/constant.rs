//! Typed constant literals

use z3::ast::{Bool, Dynamic, Float, BV};

use crate::error::TranslateError;
use crate::ir::Type;

fn invalid(literal: &str, ty: &Type) -> TranslateError {
    TranslateError::InvalidConstant {
        literal: literal.to_string(),
        ty: ty.to_string(),
    }
}

fn parse_signed(literal: &str) -> Option<i128> {
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Build the solver value of `literal` read as a constant of type `ty`
pub fn constant(literal: &str, ty: &Type) -> Result<Dynamic, TranslateError> {
    match ty {
        Type::Bool => match literal {
            "true" => Ok(Dynamic::from_ast(&Bool::from_bool(true))),
            "false" => Ok(Dynamic::from_ast(&Bool::from_bool(false))),
            _ => Err(invalid(literal, ty)),
        },
        Type::Int { bits, signed: true } => {
            let value = parse_signed(literal).ok_or_else(|| invalid(literal, ty))?;
            let bits = *bits;
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(invalid(literal, ty));
            }
            Ok(Dynamic::from_ast(&BV::from_i64(value as i64, bits)))
        }
        Type::Int {
            bits,
            signed: false,
        } => {
            let value = parse_signed(literal).ok_or_else(|| invalid(literal, ty))?;
            if value < 0 || value >= (1i128 << *bits) {
                return Err(invalid(literal, ty));
            }
            Ok(Dynamic::from_ast(&BV::from_u64(value as u64, *bits)))
        }
        Type::Float32 => {
            let value: f32 = literal.parse().map_err(|_| invalid(literal, ty))?;
            Ok(Dynamic::from_ast(&Float::from_f32(value)))
        }
        Type::Float64 => {
            let value: f64 = literal.parse().map_err(|_| invalid(literal, ty))?;
            Ok(Dynamic::from_ast(&Float::from_f64(value)))
        }
        // complex literals have no solver representation
        Type::Complex128 => Err(invalid(literal, ty)),
        Type::Pointer(_)
        | Type::Slice(_)
        | Type::Array { .. }
        | Type::Named(_)
        | Type::Opaque(_) => Err(invalid(literal, ty)),
    }
}
