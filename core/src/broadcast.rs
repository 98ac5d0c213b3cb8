//! Two-way tensor broadcast
use crate::internal::*;

/// Right-align two shapes and compute the shape they broadcast to.
///
/// Returns both operand shapes left-padded with 1 to the common rank, and
/// the output shape.
pub fn broadcast_shapes(
    a: &[usize],
    b: &[usize],
) -> UmbraResult<(TVec<usize>, TVec<usize>, TVec<usize>)> {
    let rank = a.len().max(b.len());
    let pad = |shape: &[usize]| -> TVec<usize> {
        std::iter::repeat_n(1, rank - shape.len()).chain(shape.iter().copied()).collect()
    };
    let (a, b) = (pad(a), pad(b));
    let out = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            if x == y || y == 1 {
                Ok(x)
            } else if x == 1 {
                Ok(y)
            } else {
                bail!("Can not broadcast {:?} against {:?}", a, b)
            }
        })
        .collect::<UmbraResult<TVec<usize>>>()?;
    Ok((a, b, out))
}
