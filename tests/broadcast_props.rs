//! Property tests for length and shape broadcasting

#![cfg(feature = "builtin_types")]

use minapply::builtin::{self, FLOAT64X};
use minapply::kernels::routing::broadcast::{broadcast_index, reconcile_lengths, reconcile_shapes};
use minapply::{ApplyMode, OpId, Slot, apply};
use proptest::prelude::*;

/// Row-major source offset of destination offset `flat`, pinning extent-1 axes.
fn reference_index(src: &[usize], dst: &[usize], mut flat: usize) -> usize {
    let mut coords = vec![0; dst.len()];
    for axis in (0..dst.len()).rev() {
        coords[axis] = flat % dst[axis];
        flat /= dst[axis];
    }
    let mut offset = 0;
    for (axis, &extent) in src.iter().enumerate() {
        let c = if extent == 1 { 0 } else { coords[axis] };
        offset = offset * extent + c;
    }
    offset
}

/// A destination shape plus a source shape that collapses some of its axes to 1.
fn shape_pair() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    prop::collection::vec((1usize..5, any::<bool>()), 1..4).prop_map(|axes| {
        let dst: Vec<usize> = axes.iter().map(|&(d, _)| d).collect();
        let src: Vec<usize> = axes.iter().map(|&(d, keep)| if keep { d } else { 1 }).collect();
        (src, dst)
    })
}

proptest! {
    #[test]
    fn lengths_of_one_follow_the_longest(n in 1usize..64, pattern in prop::collection::vec(any::<bool>(), 1..6)) {
        let mut lens: Vec<usize> = pattern.iter().map(|&full| if full { n } else { 1 }).collect();
        lens.push(n);
        prop_assert_eq!(reconcile_lengths(&lens).unwrap(), n);
    }

    #[test]
    fn mismatched_lengths_are_rejected(a in 2usize..32, b in 2usize..32) {
        prop_assume!(a != b);
        prop_assert!(reconcile_lengths(&[a, b]).is_err());
    }

    #[test]
    fn gather_matches_coordinates((src, dst) in shape_pair()) {
        let index = broadcast_index(&src, &dst);
        prop_assert_eq!(index.len(), dst.iter().product::<usize>());
        for (flat, &i) in index.iter().enumerate() {
            prop_assert_eq!(i, reference_index(&src, &dst, flat));
        }
    }

    #[test]
    fn collapsed_shapes_reconcile_to_the_full_one((src, dst) in shape_pair()) {
        prop_assert_eq!(reconcile_shapes(&[src.clone(), dst.clone()]).unwrap(), dst.clone());
        prop_assert_eq!(reconcile_shapes(&[Vec::new(), src, dst.clone()]).unwrap(), dst);
    }

    #[test]
    fn single_element_operand_broadcasts(xs in prop::collection::vec(-1e3f64..1e3, 1..32), s in -1e3f64..1e3) {
        let reg = builtin::registry().unwrap();
        let a = reg.array(FLOAT64X, xs.clone()).unwrap();
        let b = reg.array(FLOAT64X, vec![s]).unwrap();
        let out = apply(&reg, ApplyMode::Normal, OpId::Sub, Slot::Method, &mut [a, b])
            .unwrap()
            .value()
            .unwrap();
        let expected: Vec<f64> = xs.iter().map(|x| x - s).collect();
        prop_assert_eq!(out.as_array().unwrap().as_f64().unwrap(), expected.as_slice());
    }
}
