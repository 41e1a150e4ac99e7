use ndarray::{Array3, Array4, Array5};
use oc_engine::{solve_adjoint, OcError};

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
}

#[test]
fn test_adjoint_zero_without_cost() {
    let hx = Array4::from_elem((2, 5, 2, 2), 0.3);
    let hx_nw = Array5::from_elem((2, 2, 5, 2, 2), -0.1);
    let fx = Array3::zeros((2, 2, 5));
    let adjoint = solve_adjoint(&hx, &hx_nw, &fx, (2, 2, 5), 0.1).unwrap();
    assert!(adjoint.iter().all(|&x| x == 0.0));
}

#[test]
fn test_adjoint_single_node_recursion() {
    let hx = Array4::from_elem((1, 3, 1, 1), 1.0);
    let hx_nw = Array5::zeros((1, 1, 3, 1, 1));
    let fx = Array3::ones((1, 1, 3));
    let adjoint = solve_adjoint(&hx, &hx_nw, &fx, (1, 1, 3), 0.1).unwrap();
    assert_close(adjoint[[0, 0, 2]], 0.0);
    assert_close(adjoint[[0, 0, 1]], -0.1);
    assert_close(adjoint[[0, 0, 0]], -0.19);
}

#[test]
fn test_adjoint_propagates_through_coupling() {
    // node 1 listens to node 0, only node 1 is penalized
    let hx = Array4::zeros((2, 3, 1, 1));
    let mut hx_nw = Array5::zeros((2, 2, 3, 1, 1));
    for t in 0..3 {
        hx_nw[[1, 0, t, 0, 0]] = -2.0;
    }
    let mut fx = Array3::zeros((2, 1, 3));
    for t in 0..3 {
        fx[[1, 0, t]] = 1.0;
    }
    let adjoint = solve_adjoint(&hx, &hx_nw, &fx, (2, 1, 3), 0.1).unwrap();
    assert_close(adjoint[[1, 0, 1]], -0.1);
    assert_close(adjoint[[1, 0, 0]], -0.2);
    assert_close(adjoint[[0, 0, 2]], 0.0);
    assert_close(adjoint[[0, 0, 1]], 0.0);
    assert_close(adjoint[[0, 0, 0]], -0.02);
}

#[test]
fn test_adjoint_linear_in_cost_derivative() {
    let hx = Array4::from_shape_fn((2, 6, 2, 2), |(n, t, i, k)| {
        0.1 * (n + 1) as f64 - 0.05 * t as f64 + 0.2 * i as f64 - 0.3 * k as f64
    });
    let hx_nw = Array5::from_shape_fn((2, 2, 6, 2, 2), |(n1, n2, _, i, k)| {
        if n1 != n2 && i == 0 && k == 0 {
            -0.4
        } else {
            0.0
        }
    });
    let fx = Array3::from_shape_fn((2, 1, 6), |(n, _, t)| (n as f64 - t as f64) * 0.3);
    let adjoint = solve_adjoint(&hx, &hx_nw, &fx, (2, 2, 6), 0.05).unwrap();
    let scaled = solve_adjoint(&hx, &hx_nw, &(&fx * 3.0), (2, 2, 6), 0.05).unwrap();
    for (a, b) in adjoint.iter().zip(scaled.iter()) {
        assert!((3.0 * a - b).abs() < 1e-12);
    }
    // terminal condition
    assert!(adjoint.slice(ndarray::s![.., .., 5]).iter().all(|&x| x == 0.0));
}

#[test]
fn test_adjoint_single_time_point() {
    let adjoint = solve_adjoint(
        &Array4::zeros((1, 1, 1, 1)),
        &Array5::zeros((1, 1, 1, 1, 1)),
        &Array3::ones((1, 1, 1)),
        (1, 1, 1),
        0.1,
    )
    .unwrap();
    assert_eq!(adjoint, Array3::<f64>::zeros((1, 1, 1)));
}

#[test]
fn test_adjoint_rejects_shape_mismatch() {
    let result = solve_adjoint(
        &Array4::zeros((1, 4, 2, 2)),
        &Array5::zeros((1, 1, 5, 2, 2)),
        &Array3::zeros((1, 2, 5)),
        (1, 2, 5),
        0.1,
    );
    assert!(matches!(
        result,
        Err(OcError::ShapeMismatch {
            what: "local jacobian",
            ..
        })
    ));

    let result = solve_adjoint(
        &Array4::zeros((1, 5, 2, 2)),
        &Array5::zeros((1, 1, 5, 2, 2)),
        &Array3::zeros((1, 3, 5)),
        (1, 2, 5),
        0.1,
    );
    assert!(matches!(result, Err(OcError::ShapeMismatch { .. })));
}
