// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Native Kernels Module
//!
//! Vectorised kernels for flat float and boolean arrays, installed as
//! [`crate::OpEntry::Native`] on the stock types.
//!
//! Each kernel maps whole buffers at once and writes the finished buffer into
//! the result. Length-1 inputs broadcast against longer ones.

use vec64::Vec64;

use crate::enums::error::ErrorKind;
use crate::enums::operators::CompareOp;
use crate::kernels::scalar::ordered;
use crate::structs::array::{Array, ArrayData, UninitArray};

/// Apply a binary function element-wise with broadcasting.
///
/// If one input has length 1 and the other has length N, the length-1
/// input is broadcast to match.
pub fn zip_map<A: Copy, B: Copy, R, F>(lhs: &[A], rhs: &[B], f: F) -> Result<Vec64<R>, ErrorKind>
where
    F: Fn(A, B) -> R,
{
    let n = lhs.len().max(rhs.len());
    if [lhs.len(), rhs.len()].iter().any(|&len| len != 1 && len != n) {
        return Err(ErrorKind::SizeIncompatible { sizes: vec![lhs.len(), rhs.len()] });
    }
    let step_l = (lhs.len() != 1) as usize;
    let step_r = (rhs.len() != 1) as usize;
    let mut out = Vec64::with_capacity(n);
    for i in 0..n {
        out.push(f(lhs[i * step_l], rhs[i * step_r]));
    }
    Ok(out)
}

#[inline]
fn store(out: &mut UninitArray, data: impl Into<ArrayData>) -> Result<(), ErrorKind> {
    *out.data_mut() = data.into();
    Ok(())
}

fn unsupported(kernel: &str, arrays: &[&Array]) -> ErrorKind {
    let kinds: Vec<String> = arrays
        .iter()
        .map(|a| a.data().kind().map_or("nested", |k| k.name()).to_string())
        .collect();
    ErrorKind::Kernel(format!("{} has no kernel for ({})", kernel, kinds.join(", ")))
}

macro_rules! float_unary {
    ($name:ident, |$x:ident| $body:expr) => {
        pub fn $name(a: &Array, out: &mut UninitArray) -> Result<(), ErrorKind> {
            match a.data() {
                ArrayData::Float32(v) => {
                    store(out, v.iter().map(|&$x: &f32| $body).collect::<Vec64<f32>>())
                }
                ArrayData::Float64(v) => {
                    store(out, v.iter().map(|&$x: &f64| $body).collect::<Vec64<f64>>())
                }
                _ => Err(unsupported(stringify!($name), &[a])),
            }
        }
    };
}

macro_rules! float_binary {
    ($name:ident, |$x:ident, $y:ident| $body:expr) => {
        pub fn $name(a: &Array, b: &Array, out: &mut UninitArray) -> Result<(), ErrorKind> {
            match (a.data(), b.data()) {
                (ArrayData::Float32(l), ArrayData::Float32(r)) => {
                    store(out, zip_map(l, r, |$x: f32, $y: f32| $body)?)
                }
                (ArrayData::Float64(l), ArrayData::Float64(r)) => {
                    store(out, zip_map(l, r, |$x: f64, $y: f64| $body)?)
                }
                _ => Err(unsupported(stringify!($name), &[a, b])),
            }
        }
    };
}

macro_rules! bool_binary {
    ($name:ident, |$x:ident, $y:ident| $body:expr) => {
        pub fn $name(a: &Array, b: &Array, out: &mut UninitArray) -> Result<(), ErrorKind> {
            match (a.data(), b.data()) {
                (ArrayData::Boolean(l), ArrayData::Boolean(r)) => {
                    store(out, zip_map(l, r, |$x: bool, $y: bool| $body)?)
                }
                _ => Err(unsupported(stringify!($name), &[a, b])),
            }
        }
    };
}

float_unary!(neg, |x| -x);
float_unary!(abs, |x| x.abs());
float_unary!(sqrt, |x| x.sqrt());

float_binary!(add, |x, y| x + y);
float_binary!(sub, |x, y| x - y);
float_binary!(mul, |x, y| x * y);
float_binary!(minimum, |x, y| x.min(y));
float_binary!(maximum, |x, y| x.max(y));

bool_binary!(and, |x, y| x && y);
bool_binary!(or, |x, y| x || y);
bool_binary!(xor, |x, y| x != y);

/// `a * b + c` for float arrays.
pub fn fma(a: &Array, b: &Array, c: &Array, out: &mut UninitArray) -> Result<(), ErrorKind> {
    match (a.data(), b.data(), c.data()) {
        (ArrayData::Float32(x), ArrayData::Float32(y), ArrayData::Float32(z)) => {
            let xy = zip_map(x, y, |p: f32, q: f32| (p, q))?;
            store(out, zip_map(&xy, z, |(p, q): (f32, f32), r: f32| p.mul_add(q, r))?)
        }
        (ArrayData::Float64(x), ArrayData::Float64(y), ArrayData::Float64(z)) => {
            let xy = zip_map(x, y, |p: f64, q: f64| (p, q))?;
            store(out, zip_map(&xy, z, |(p, q): (f64, f64), r: f64| p.mul_add(q, r))?)
        }
        _ => Err(unsupported("fma", &[a, b, c])),
    }
}

/// Rich comparison of float arrays into a boolean mask.
pub fn compare(a: &Array, b: &Array, cmp: CompareOp, out: &mut UninitArray) -> Result<(), ErrorKind> {
    match (a.data(), b.data()) {
        (ArrayData::Float32(l), ArrayData::Float32(r)) => {
            store(out, zip_map(l, r, |x, y| ordered(cmp, x, y))?)
        }
        (ArrayData::Float64(l), ArrayData::Float64(r)) => {
            store(out, zip_map(l, r, |x, y| ordered(cmp, x, y))?)
        }
        _ => Err(unsupported("compare", &[a, b])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::scalar::ScalarKind;
    use crate::structs::descriptor::TypeKey;

    fn arr<T>(v: Vec<T>) -> Array
    where
        ArrayData: From<Vec<T>>,
    {
        Array::new(TypeKey::from_index(0), ArrayData::from(v))
    }

    fn out(kind: ScalarKind) -> UninitArray {
        UninitArray::new(Array::new(TypeKey::from_index(0), ArrayData::empty_flat(kind)))
    }

    #[test]
    fn test_add_broadcasts_length_one() {
        let mut o = out(ScalarKind::Float32);
        add(&arr(vec![2.0f32]), &arr(vec![1.0f32, 2.0, 3.0]), &mut o).unwrap();
        assert_eq!(o.mark_ready().as_f32(), Some(&[3.0f32, 4.0, 5.0][..]));
    }

    #[test]
    fn test_size_mismatch() {
        let mut o = out(ScalarKind::Float64);
        let err = mul(&arr(vec![1.0f64, 2.0]), &arr(vec![1.0f64, 2.0, 3.0]), &mut o).unwrap_err();
        assert_eq!(err, ErrorKind::SizeIncompatible { sizes: vec![2, 3] });
    }

    #[test]
    fn test_compare_produces_mask() {
        let mut o = out(ScalarKind::Boolean);
        compare(&arr(vec![1.0f32, 5.0]), &arr(vec![3.0f32]), CompareOp::Lt, &mut o).unwrap();
        assert_eq!(o.mark_ready().as_bool(), Some(&[true, false][..]));
    }

    #[test]
    fn test_kind_mismatch_reports_kernel_error() {
        let mut o = out(ScalarKind::Float32);
        let err = sqrt(&arr(vec![1i32]), &mut o).unwrap_err();
        assert!(matches!(err, ErrorKind::Kernel(_)));
    }

    #[test]
    fn test_fma_and_bool_ops() {
        let mut o = out(ScalarKind::Float64);
        fma(&arr(vec![2.0f64, 3.0]), &arr(vec![4.0f64]), &arr(vec![1.0f64, 1.0]), &mut o).unwrap();
        assert_eq!(o.mark_ready().as_f64(), Some(&[9.0, 13.0][..]));
        let mut o = out(ScalarKind::Boolean);
        xor(&arr(vec![true, false]), &arr(vec![true, true]), &mut o).unwrap();
        assert_eq!(o.mark_ready().as_bool(), Some(&[false, true][..]));
    }
}
