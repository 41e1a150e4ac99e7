use crate::error::{OcError, OcResult};
use ndarray::{Array2, Array3, ArrayBase, Data, Dimension};

/// Returns `control + step * direction`, with every element whose magnitude
/// exceeds `u_max` replaced by `sign * u_max`.
pub fn update_control_with_limit(
    control: &Array3<f64>,
    step: f64,
    direction: &Array3<f64>,
    u_max: Option<f64>,
) -> Array3<f64> {
    let mut control_new = control + &(direction * step);
    if let Some(u_max) = u_max {
        saturate(&mut control_new, u_max);
    }
    control_new
}

pub fn saturate(control: &mut Array3<f64>, u_max: f64) {
    control.mapv_inplace(|u| if u.abs() > u_max { u.signum() * u_max } else { u });
}

/// True if any element is NaN or infinite.
pub fn has_diverged<S, D>(arr: &ArrayBase<S, D>) -> bool
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    arr.iter().any(|x| !x.is_finite())
}

pub fn max_abs<S, D>(arr: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if has_diverged(arr) {
        return f64::INFINITY;
    }
    arr.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

pub fn validate_binary_mask(mask: &Array2<f64>, name: &'static str) -> OcResult<()> {
    if mask.iter().any(|&x| x != 0.0 && x != 1.0) {
        return Err(OcError::NonBinaryMask { mask: name });
    }
    Ok(())
}
