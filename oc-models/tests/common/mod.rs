#![allow(dead_code)]

use ndarray::{Array1, Array3, ArrayView1};
use oc_engine::{ControlledSystem, CostFunctional, Dynamics, OptimalControl};
use oc_models::NodeDynamics;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub fn uniform(shape: (usize, usize, usize), low: f64, high: f64, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn(shape, |_| rng.gen_range(low..high))
}

/// Compares the adjoint gradient (scaled by `dt`) against central finite
/// differences of the total cost at the current control.
pub fn assert_gradient_matches_finite_differences<S, C>(oc: &mut OptimalControl<S, C>)
where
    S: ControlledSystem,
    C: CostFunctional,
{
    let control0 = oc.control().clone();
    oc.simulate_forward();
    let grad = oc.compute_gradient().unwrap();
    let dt = oc.system().dt();
    let (n_nodes, n_vars, n_steps) = control0.dim();

    let eps = 1e-6;
    for n in 0..n_nodes {
        for v in 0..n_vars {
            for t in (0..n_steps).step_by(3).chain([n_steps - 2, n_steps - 1]) {
                let mut cost_at = |delta: f64| {
                    let mut control = control0.clone();
                    control[[n, v, t]] += delta;
                    oc.set_control(control).unwrap();
                    oc.simulate_forward();
                    oc.compute_total_cost()
                };
                let fd = (cost_at(eps) - cost_at(-eps)) / (2.0 * eps);
                let adjoint = grad[[n, v, t]] * dt;
                assert!(
                    (adjoint - fd).abs() < 1e-6 + 1e-4 * fd.abs(),
                    "({}, {}, {}): adjoint {} vs finite difference {}",
                    n,
                    v,
                    t,
                    adjoint,
                    fd
                );
            }
        }
    }
    oc.set_control(control0).unwrap();
}

fn derivative<D: NodeDynamics>(
    node: &D,
    x: ArrayView1<f64>,
    network_input: f64,
    input: ArrayView1<f64>,
) -> Array1<f64> {
    let mut out = Array1::zeros(node.n_vars());
    node.derivative(x, network_input, input, out.view_mut());
    out
}

/// Checks the analytic node Jacobians against central differences of the
/// node derivative.
pub fn assert_node_jacobians<D: NodeDynamics>(
    node: &D,
    x: &Array1<f64>,
    network_input: f64,
    input: &Array1<f64>,
) {
    let h = 1e-6;
    let n_vars = node.n_vars();
    let close = |a: f64, b: f64| (a - b).abs() < 1e-6 * (1.0 + b.abs());

    let hx = node.state_jacobian(x.view(), network_input, input.view());
    for k in 0..n_vars {
        let (mut plus, mut minus) = (x.clone(), x.clone());
        plus[k] += h;
        minus[k] -= h;
        let df = (derivative(node, plus.view(), network_input, input.view())
            - derivative(node, minus.view(), network_input, input.view()))
            / (2.0 * h);
        for i in 0..n_vars {
            assert!(
                close(hx[[i, k]], -df[i]),
                "state jacobian [{}, {}]: {} vs {}",
                i,
                k,
                hx[[i, k]],
                -df[i]
            );
        }
    }

    let df_nw = (derivative(node, x.view(), network_input + h, input.view())
        - derivative(node, x.view(), network_input - h, input.view()))
        / (2.0 * h);
    let sensitivity = node.coupling_sensitivity(x.view(), network_input, input.view());
    assert!(
        close(sensitivity, df_nw[0]),
        "coupling sensitivity: {} vs {}",
        sensitivity,
        df_nw[0]
    );
    for i in 1..n_vars {
        assert!(df_nw[i].abs() < 1e-9);
    }

    let d_du = match node.constant_control_jacobian() {
        Some(d_du) => d_du,
        None => node.control_jacobian_at(x.view(), network_input, input.view()).unwrap(),
    };
    for v in 0..n_vars {
        let (mut plus, mut minus) = (input.clone(), input.clone());
        plus[v] += h;
        minus[v] -= h;
        let df = (derivative(node, x.view(), network_input, plus.view())
            - derivative(node, x.view(), network_input, minus.view()))
            / (2.0 * h);
        assert!(
            close(d_du[[v, v]], -df[v]),
            "control jacobian [{}]: {} vs {}",
            v,
            d_du[[v, v]],
            -df[v]
        );
    }
}
