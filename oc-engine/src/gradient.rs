use crate::{
    error::{check_shape, OcError, OcResult},
    system::ControlJacobian,
};
use ndarray::{Array2, Array3};

/// Assembles the gradient of the total cost w.r.t. the control:
///
/// `grad[n, v, t] = df_du[n, v, t] + adjoint[n, v, t] * mask[n, v] * d_du[v, v]`
///
/// Only the diagonal of the control Jacobian is contracted. Each control
/// channel is assumed to act on its own state variable alone, so cross-channel
/// entries of `d_du` are ignored.
pub fn compute_gradient(
    df_du: &Array3<f64>,
    adjoint: &Array3<f64>,
    control_mask: &Array2<f64>,
    d_du: &ControlJacobian,
) -> OcResult<Array3<f64>> {
    let (n_nodes, n_out, n_steps) = df_du.dim();
    let (adj_nodes, adj_vars, adj_steps) = adjoint.dim();
    if adj_nodes != n_nodes || adj_vars < n_out || adj_steps != n_steps {
        return Err(too_small("adjoint state", &[n_nodes, n_out, n_steps], adjoint.shape()));
    }
    check_shape("control mask", &[n_nodes, n_out], control_mask.shape())?;

    let mut grad = Array3::<f64>::zeros((n_nodes, n_out, n_steps));
    match d_du {
        ControlJacobian::Constant(d_du) => {
            if d_du.nrows() < n_out || d_du.ncols() < n_out {
                return Err(too_small("control jacobian", &[n_out, n_out], d_du.shape()));
            }
            for n in 0..n_nodes {
                for v in 0..n_out {
                    let factor = control_mask[[n, v]] * d_du[[v, v]];
                    for t in 0..n_steps {
                        grad[[n, v, t]] = df_du[[n, v, t]] + adjoint[[n, v, t]] * factor;
                    }
                }
            }
        }
        ControlJacobian::TimeVarying(d_du) => {
            let shape = d_du.shape();
            if shape[0] != n_nodes || shape[1] < n_out || shape[2] < n_out || shape[3] != n_steps {
                return Err(too_small(
                    "control jacobian",
                    &[n_nodes, n_out, n_out, n_steps],
                    shape,
                ));
            }
            for n in 0..n_nodes {
                for v in 0..n_out {
                    let mask = control_mask[[n, v]];
                    for t in 0..n_steps {
                        grad[[n, v, t]] =
                            df_du[[n, v, t]] + adjoint[[n, v, t]] * mask * d_du[[n, v, v, t]];
                    }
                }
            }
        }
    }
    Ok(grad)
}

fn too_small(what: &'static str, expected: &[usize], actual: &[usize]) -> OcError {
    OcError::ShapeMismatch {
        what,
        expected: expected.to_vec(),
        actual: actual.to_vec(),
    }
}
