// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Scalar Kernels Module
//!
//! Element-level counterparts of every operation for plain scalars. The
//! generic loop bottoms out here once recursion reaches flat array elements.
//!
//! Mixed kinds are promoted to the higher [`ScalarKind`] first. Integer
//! arithmetic wraps, integer `truediv` produces `float64`, and floor division
//! and modulo round towards negative infinity.

use crate::enums::error::ErrorKind;
use crate::enums::operators::{CompareOp, OpId, Slot};
use crate::enums::scalar::{Scalar, ScalarKind};
use crate::traits::type_unions::{Float, Integer};

/// Evaluates `op` on scalar operands.
pub fn eval(op: OpId, slot: Slot, args: &[Scalar]) -> Result<Scalar, ErrorKind> {
    if args.len() != op.arity() {
        return Err(ErrorKind::Arity { op: op.name(), expected: op.arity(), found: args.len() });
    }
    match (op, args) {
        (OpId::RichCompare, [a, b]) => match slot {
            Slot::Compare(cmp) => Ok(Scalar::Boolean(compare(cmp, *a, *b))),
            _ => Err(ErrorKind::TypeError(
                "rich comparison requires a comparison selector".to_string(),
            )),
        },
        (OpId::Select, [mask, t, f]) => {
            let kind = t.kind().max(f.kind());
            let pick = if mask.bool() { *t } else { *f };
            Ok(pick.cast(kind))
        }
        (OpId::All | OpId::Any, [x]) => Ok(Scalar::Boolean(x.bool())),
        (OpId::SinCos | OpId::SinCosh, _) => Err(ErrorKind::TypeError(format!(
            "{} produces a pair and has no element-wise form",
            op
        ))),
        (_, [x]) => unary(op, *x),
        (_, [a, b]) => binary(op, *a, *b),
        (_, [a, b, c]) => fma(op, *a, *b, *c),
        _ => Err(ErrorKind::Arity { op: op.name(), expected: op.arity(), found: args.len() }),
    }
}

fn undefined(op: OpId, kind: ScalarKind) -> ErrorKind {
    ErrorKind::TypeError(format!("{} is not defined for {}", op, kind))
}

fn unary(op: OpId, x: Scalar) -> Result<Scalar, ErrorKind> {
    match (op, x) {
        (OpId::Erf, Scalar::Float32(v)) => Ok(Scalar::Float32(erf(v as f64) as f32)),
        (OpId::Erf, Scalar::Float64(v)) => Ok(Scalar::Float64(erf(v))),
        (_, Scalar::Float32(v)) => float_unary(op, v).map(Scalar::Float32),
        (_, Scalar::Float64(v)) => float_unary(op, v).map(Scalar::Float64),
        (_, Scalar::Int32(v)) => int_unary(op, v).map(Scalar::Int32),
        (_, Scalar::Int64(v)) => int_unary(op, v).map(Scalar::Int64),
        (_, Scalar::UInt32(v)) => int_unary(op, v).map(Scalar::UInt32),
        (_, Scalar::UInt64(v)) => int_unary(op, v).map(Scalar::UInt64),
        (OpId::Invert, Scalar::Boolean(v)) => Ok(Scalar::Boolean(!v)),
        (_, Scalar::Boolean(_)) => Err(undefined(op, ScalarKind::Boolean)),
    }
}

fn float_unary<T: Float>(op: OpId, v: T) -> Result<T, ErrorKind> {
    Ok(match op {
        OpId::Neg => -v,
        OpId::Abs => v.abs(),
        OpId::Sqrt => v.sqrt(),
        OpId::Rcp => v.recip(),
        OpId::Rsqrt => v.sqrt().recip(),
        OpId::Cbrt => v.cbrt(),
        OpId::Exp => v.exp(),
        OpId::Exp2 => v.exp2(),
        OpId::Log => v.ln(),
        OpId::Log2 => v.log2(),
        OpId::Sin => v.sin(),
        OpId::Cos => v.cos(),
        OpId::Tan => v.tan(),
        OpId::Asin => v.asin(),
        OpId::Acos => v.acos(),
        OpId::Atan => v.atan(),
        OpId::Sinh => v.sinh(),
        OpId::Cosh => v.cosh(),
        OpId::Tanh => v.tanh(),
        OpId::Asinh => v.asinh(),
        OpId::Acosh => v.acosh(),
        OpId::Atanh => v.atanh(),
        _ => return Err(ErrorKind::TypeError(format!("{} is not defined for floats", op))),
    })
}

fn int_unary<T: Integer>(op: OpId, v: T) -> Result<T, ErrorKind> {
    Ok(match op {
        OpId::Neg => v.wrapping_neg(),
        OpId::Abs => v.wrapping_abs_val(),
        OpId::Invert => !v,
        _ => return Err(ErrorKind::TypeError(format!("{} is not defined for integers", op))),
    })
}

fn binary(op: OpId, a: Scalar, b: Scalar) -> Result<Scalar, ErrorKind> {
    let kind = a.kind().max(b.kind());
    if op == OpId::TrueDiv && kind.is_integer() {
        return Ok(Scalar::Float64(a.f64() / b.f64()));
    }
    match (a.cast(kind), b.cast(kind)) {
        (Scalar::Float32(x), Scalar::Float32(y)) => float_binary(op, x, y).map(Scalar::Float32),
        (Scalar::Float64(x), Scalar::Float64(y)) => float_binary(op, x, y).map(Scalar::Float64),
        (Scalar::Int32(x), Scalar::Int32(y)) => int_binary(op, x, y).map(Scalar::Int32),
        (Scalar::Int64(x), Scalar::Int64(y)) => int_binary(op, x, y).map(Scalar::Int64),
        (Scalar::UInt32(x), Scalar::UInt32(y)) => int_binary(op, x, y).map(Scalar::UInt32),
        (Scalar::UInt64(x), Scalar::UInt64(y)) => int_binary(op, x, y).map(Scalar::UInt64),
        (Scalar::Boolean(x), Scalar::Boolean(y)) => match op {
            OpId::And | OpId::Minimum => Ok(Scalar::Boolean(x && y)),
            OpId::Or | OpId::Maximum => Ok(Scalar::Boolean(x || y)),
            OpId::Xor => Ok(Scalar::Boolean(x != y)),
            _ => Err(undefined(op, kind)),
        },
        _ => Err(undefined(op, kind)),
    }
}

fn float_binary<T: Float>(op: OpId, a: T, b: T) -> Result<T, ErrorKind> {
    Ok(match op {
        OpId::Add => a + b,
        OpId::Sub => a - b,
        OpId::Mul => a * b,
        OpId::TrueDiv => a / b,
        OpId::FloorDiv => (a / b).floor(),
        OpId::Mod => a - b * (a / b).floor(),
        OpId::Minimum => a.min(b),
        OpId::Maximum => a.max(b),
        OpId::Atan2 => a.atan2(b),
        _ => return Err(ErrorKind::TypeError(format!("{} is not defined for floats", op))),
    })
}

fn int_binary<T: Integer>(op: OpId, a: T, b: T) -> Result<T, ErrorKind> {
    let zero = T::zero();
    let bits = (std::mem::size_of::<T>() * 8) as u32;
    let shift = || -> Result<usize, ErrorKind> {
        b.to_u32()
            .map(|n| (n % bits) as usize)
            .ok_or_else(|| ErrorKind::Kernel("negative shift count".to_string()))
    };
    Ok(match op {
        OpId::Add => a.wrapping_add(&b),
        OpId::Sub => a.wrapping_sub(&b),
        OpId::Mul => a.wrapping_mul(&b),
        OpId::FloorDiv | OpId::Mod if b == zero => {
            return Err(ErrorKind::Kernel("integer division by zero".to_string()));
        }
        OpId::FloorDiv => match a.checked_div(&b) {
            Some(q) if a % b != zero && ((a % b < zero) != (b < zero)) => q - T::one(),
            Some(q) => q,
            // MIN / -1
            None => a.wrapping_neg(),
        },
        OpId::Mod => match a.checked_div(&b) {
            Some(_) => {
                let r = a % b;
                if r != zero && ((r < zero) != (b < zero)) { r + b } else { r }
            }
            None => zero,
        },
        OpId::LShift => a << shift()?,
        OpId::RShift => a >> shift()?,
        OpId::Minimum => a.min(b),
        OpId::Maximum => a.max(b),
        OpId::And => a & b,
        OpId::Or => a | b,
        OpId::Xor => a ^ b,
        _ => return Err(ErrorKind::TypeError(format!("{} is not defined for integers", op))),
    })
}

fn fma(op: OpId, a: Scalar, b: Scalar, c: Scalar) -> Result<Scalar, ErrorKind> {
    if op != OpId::Fma {
        return Err(ErrorKind::Arity { op: op.name(), expected: op.arity(), found: 3 });
    }
    let kind = a.kind().max(b.kind()).max(c.kind());
    match (a.cast(kind), b.cast(kind), c.cast(kind)) {
        (Scalar::Float32(x), Scalar::Float32(y), Scalar::Float32(z)) => {
            Ok(Scalar::Float32(x.mul_add(y, z)))
        }
        (Scalar::Float64(x), Scalar::Float64(y), Scalar::Float64(z)) => {
            Ok(Scalar::Float64(x.mul_add(y, z)))
        }
        (Scalar::Int32(x), Scalar::Int32(y), Scalar::Int32(z)) => {
            Ok(Scalar::Int32(x.wrapping_mul(y).wrapping_add(z)))
        }
        (Scalar::Int64(x), Scalar::Int64(y), Scalar::Int64(z)) => {
            Ok(Scalar::Int64(x.wrapping_mul(y).wrapping_add(z)))
        }
        (Scalar::UInt32(x), Scalar::UInt32(y), Scalar::UInt32(z)) => {
            Ok(Scalar::UInt32(x.wrapping_mul(y).wrapping_add(z)))
        }
        (Scalar::UInt64(x), Scalar::UInt64(y), Scalar::UInt64(z)) => {
            Ok(Scalar::UInt64(x.wrapping_mul(y).wrapping_add(z)))
        }
        _ => Err(undefined(op, kind)),
    }
}

/// Compares after promoting both sides to a common kind.
pub fn compare(cmp: CompareOp, a: Scalar, b: Scalar) -> bool {
    let kind = a.kind().max(b.kind());
    match (a.cast(kind), b.cast(kind)) {
        (Scalar::Float32(x), Scalar::Float32(y)) => ordered(cmp, x, y),
        (Scalar::Float64(x), Scalar::Float64(y)) => ordered(cmp, x, y),
        (Scalar::Int32(x), Scalar::Int32(y)) => ordered(cmp, x, y),
        (Scalar::Int64(x), Scalar::Int64(y)) => ordered(cmp, x, y),
        (Scalar::UInt32(x), Scalar::UInt32(y)) => ordered(cmp, x, y),
        (Scalar::UInt64(x), Scalar::UInt64(y)) => ordered(cmp, x, y),
        (Scalar::Boolean(x), Scalar::Boolean(y)) => ordered(cmp, x, y),
        _ => false,
    }
}

#[inline]
pub(crate) fn ordered<T: PartialOrd>(cmp: CompareOp, a: T, b: T) -> bool {
    match cmp {
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

/// Error function, Abramowitz and Stegun 7.1.26 (absolute error below 1.5e-7).
fn erf(x: f64) -> f64 {
    const A: [f64; 5] = [0.254829592, -0.284496736, 1.421413741, -1.453152027, 1.061405429];
    const P: f64 = 0.3275911;
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
