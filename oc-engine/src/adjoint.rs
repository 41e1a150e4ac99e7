use crate::error::{check_shape, OcError, OcResult};
use ndarray::{s, Array1, Array3, Array4, Array5};

/// Integrates the adjoint state backwards in time.
///
/// `fx` is the cost derivative w.r.t. the output variables (`N x V_out x T`,
/// `V_out <= V`) and is zero-padded to the full state. The terminal condition
/// is zero, and each step applies explicit Euler to `-y' = fx + Hx^T y`, where
/// `Hx` combines the node's own Jacobian `hx` with the coupling Jacobians
/// `hx_nw[n2, n]` of every node `n2` that depends on node `n`.
pub fn solve_adjoint(
    hx: &Array4<f64>,
    hx_nw: &Array5<f64>,
    fx: &Array3<f64>,
    state_dim: (usize, usize, usize),
    dt: f64,
) -> OcResult<Array3<f64>> {
    let (n_nodes, n_vars, n_steps) = state_dim;
    check_shape("local jacobian", &[n_nodes, n_steps, n_vars, n_vars], hx.shape())?;
    check_shape(
        "coupling jacobian",
        &[n_nodes, n_nodes, n_steps, n_vars, n_vars],
        hx_nw.shape(),
    )?;
    let n_out = fx.shape()[1];
    if n_out > n_vars {
        return Err(OcError::ShapeMismatch {
            what: "cost state derivative",
            expected: vec![n_nodes, n_vars, n_steps],
            actual: fx.shape().to_vec(),
        });
    }
    check_shape("cost state derivative", &[n_nodes, n_out, n_steps], fx.shape())?;

    let mut fx_full = Array3::<f64>::zeros(state_dim);
    fx_full.slice_mut(s![.., ..n_out, ..]).assign(fx);

    let mut adjoint = Array3::<f64>::zeros(state_dim);
    if n_steps < 2 {
        return Ok(adjoint);
    }

    let mut der = Array1::<f64>::zeros(n_vars);
    for t in (0..n_steps - 1).rev() {
        for n in 0..n_nodes {
            der.assign(&fx_full.slice(s![n, .., t + 1]));
            for k in 0..n_vars {
                for i in 0..n_vars {
                    der[k] += adjoint[[n, i, t + 1]] * hx[[n, t + 1, i, k]];
                }
            }
            for n2 in 0..n_nodes {
                for k in 0..n_vars {
                    for i in 0..n_vars {
                        der[k] += adjoint[[n2, i, t + 1]] * hx_nw[[n2, n, t + 1, i, k]];
                    }
                }
            }
            for k in 0..n_vars {
                adjoint[[n, k, t]] = adjoint[[n, k, t + 1]] - der[k] * dt;
            }
        }
    }
    Ok(adjoint)
}
