use crate::error::DepthError;
use ndarray::{Array2, ArrayD, Axis, Ix2};

/// Single-channel depth surface, row-major `[height, width]`
pub type DepthSurface = Array2<f32>;

/// Collapse a raw model output into a 2-D surface
///
/// Backends disagree about wrapper dimensions (`[1, H, W]`, `[1, 1, H, W]`,
/// `[H, W, 1]`, ...), so leading axes are peeled off until two remain:
/// 1. a leading axis of length 1 is dropped
/// 2. a rank-3 tensor loses all of its length-1 axes
/// 3. otherwise the first slice of the leading axis is kept
pub fn normalize_output(raw: ArrayD<f32>) -> Result<DepthSurface, DepthError> {
    let mut surface = raw;

    while surface.ndim() > 2 {
        let shape = surface.shape();
        if shape[0] == 1 {
            surface = surface.index_axis_move(Axis(0), 0);
        } else if shape.len() == 3 && shape.contains(&1) {
            surface = squeeze(surface);
        } else {
            tracing::debug!("Dropping leading axis of output shape {:?}", shape);
            surface = surface.index_axis_move(Axis(0), 0);
        }
    }

    if surface.ndim() < 2 {
        return Err(DepthError::OutputRank(surface.ndim()));
    }

    let surface = surface
        .into_dimensionality::<Ix2>()
        .map_err(|_| DepthError::OutputRank(2))?;

    let (height, width) = surface.dim();
    if height == 0 || width == 0 {
        return Err(DepthError::EmptySurface { height, width });
    }

    Ok(surface)
}

/// Remove every axis of length 1
fn squeeze(mut array: ArrayD<f32>) -> ArrayD<f32> {
    for axis in (0..array.ndim()).rev() {
        if array.len_of(Axis(axis)) == 1 {
            array = array.index_axis_move(Axis(axis), 0);
        }
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn ramp(shape: &[usize]) -> ArrayD<f32> {
        let len: usize = shape.iter().product();
        ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn strips_batch_and_channel() {
        let surface = normalize_output(ramp(&[1, 1, 4, 6])).unwrap();
        assert_eq!(surface.dim(), (4, 6));
        assert_eq!(surface[[1, 0]], 6.0);
    }

    #[test]
    fn strips_single_batch() {
        let surface = normalize_output(ramp(&[1, 5, 3])).unwrap();
        assert_eq!(surface.dim(), (5, 3));
    }

    #[test]
    fn squeezes_trailing_channel() {
        let surface = normalize_output(ramp(&[4, 6, 1])).unwrap();
        assert_eq!(surface.dim(), (4, 6));
        assert_eq!(surface[[3, 5]], 23.0);
    }

    #[test]
    fn keeps_first_slice_when_nothing_is_singleton() {
        let surface = normalize_output(ramp(&[2, 3, 4])).unwrap();
        assert_eq!(surface.dim(), (3, 4));
        assert_eq!(surface[[0, 0]], 0.0);
        assert_eq!(surface[[2, 3]], 11.0);

        let surface = normalize_output(ramp(&[2, 2, 3, 4])).unwrap();
        assert_eq!(surface.dim(), (3, 4));
    }

    #[test]
    fn passes_2d_through() {
        let surface = normalize_output(ramp(&[3, 3])).unwrap();
        assert_eq!(surface.dim(), (3, 3));
    }

    #[test]
    fn rejects_low_rank() {
        assert!(matches!(
            normalize_output(ramp(&[8])),
            Err(DepthError::OutputRank(1))
        ));
        assert!(matches!(
            normalize_output(ramp(&[2, 1, 1])),
            Err(DepthError::OutputRank(1))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            normalize_output(ramp(&[1, 0, 4])),
            Err(DepthError::EmptySurface { .. })
        ));
    }
}
