mod common;

use common::{assert_gradient_matches_finite_differences, assert_node_jacobians, uniform};
use ndarray::{array, Array2, Array3};
use oc_engine::{ControlJacobian, Dynamics, Jacobians, OptimalControl};
use oc_models::{
    build_network_model, AnyModel, FitzHughNagumo, Hopf, Linear, NodeDynamics, WilsonCowan,
};
use oc_structs::config::{
    CostWeights, Coupling, FhnParams, HopfParams, Interval, ModelConfig, NetworkConfig,
    NoiseConfig, OptimizerConfig, SimulationConfig, WilsonCowanParams,
};

fn simulation(duration: f64) -> SimulationConfig {
    SimulationConfig {
        dt: 0.1,
        duration,
        initial_state: None,
        noise: NoiseConfig::default(),
    }
}

fn two_nodes(coupling: Coupling) -> NetworkConfig {
    NetworkConfig {
        cmat: vec![vec![0.0, 1.0], vec![0.6, 0.0]],
        k_gl: 0.5,
        coupling,
    }
}

fn optimizer() -> OptimizerConfig {
    OptimizerConfig {
        weights: CostWeights {
            w_p: 1.0,
            w_2: 0.1,
            w_1: 0.0,
        },
        cost_interval: Interval::new(Some(2), Some(-1)),
        ..Default::default()
    }
}

fn check_network_gradient<D: NodeDynamics + Clone>(
    node: D,
    initial_state: Array2<f64>,
    amplitude: f64,
    seed: u64,
) {
    for coupling in [Coupling::Additive, Coupling::Diffusive] {
        let model = build_network_model(node.clone(), &simulation(2.0), Some(&two_nodes(coupling)))
            .unwrap()
            .with_initial_state(initial_state.clone())
            .unwrap();
        let target = uniform((2, 2, 21), -0.5, 0.5, seed);
        let cost_mask = array![[1.0, 0.0], [1.0, 1.0]];
        let mut oc =
            OptimalControl::new(model, target, optimizer(), None, Some(cost_mask)).unwrap();
        oc.set_control(uniform((2, 2, 21), -amplitude, amplitude, seed + 1))
            .unwrap();
        assert_gradient_matches_finite_differences(&mut oc);
    }
}

#[test]
fn test_fhn_jacobians() {
    let node = FitzHughNagumo::default();
    assert_node_jacobians(&node, &array![0.4, -0.3], 0.2, &array![0.1, -0.5]);
    assert_node_jacobians(&node, &array![-1.2, 0.8], -0.7, &array![0.0, 0.3]);

    let custom = FitzHughNagumo::new(FhnParams {
        alpha: 1.0,
        beta: 0.5,
        gamma: 0.3,
        delta: 0.2,
        epsilon: 1.5,
        tau: 4.0,
    });
    assert_node_jacobians(&custom, &array![0.9, 0.1], 0.0, &array![0.2, 0.2]);
}

#[test]
fn test_hopf_jacobians() {
    assert_node_jacobians(&Hopf::default(), &array![0.5, -0.2], 0.3, &array![0.1, 0.0]);
    assert_node_jacobians(
        &Hopf::new(HopfParams { a: -0.5, w: 1.3 }),
        &array![-0.7, 0.9],
        -0.1,
        &array![0.0, 0.4],
    );
}

#[test]
fn test_wilson_cowan_jacobians() {
    let node = WilsonCowan::default();
    assert_node_jacobians(&node, &array![0.3, 0.1], 0.5, &array![1.0, 0.2]);
    assert_node_jacobians(&node, &array![0.05, 0.4], -0.2, &array![2.5, -1.0]);
}

#[test]
fn test_linear_jacobians() {
    let node = Linear::new(array![[-1.0, 0.4], [0.2, -2.0]]).unwrap();
    assert_node_jacobians(&node, &array![0.3, -0.6], 0.8, &array![0.1, 0.2]);
    assert!(Linear::new(array![[1.0, 2.0]]).is_err());
}

#[test]
fn test_fhn_gradient_matches_finite_differences() {
    check_network_gradient(
        FitzHughNagumo::default(),
        array![[0.1, -0.2], [0.3, 0.0]],
        0.3,
        11,
    );
}

#[test]
fn test_hopf_gradient_matches_finite_differences() {
    check_network_gradient(Hopf::default(), array![[0.2, 0.1], [-0.1, 0.3]], 0.5, 21);
}

#[test]
fn test_wilson_cowan_gradient_matches_finite_differences() {
    check_network_gradient(
        WilsonCowan::default(),
        array![[0.1, 0.05], [0.2, 0.1]],
        1.5,
        31,
    );
}

#[test]
fn test_wilson_cowan_control_is_additive() {
    let background = vec![vec![vec![0.5; 11], vec![0.25; 11]]];
    let params = WilsonCowanParams {
        background: Some(background),
        ..Default::default()
    };
    let model = AnyModel::from_config(
        &ModelConfig::WilsonCowan(params),
        &simulation(1.0),
        None,
    )
    .unwrap();
    assert_eq!(model.initial_control(), Array3::<f64>::zeros((1, 2, 11)));

    let mut model = model;
    model.apply_control(&Array3::from_elem((1, 2, 11), 0.5));
    assert!((model.initial_control()[[0, 1, 4]] - 0.5).abs() < 1e-15);

    model.simulate();
    match model.control_jacobian().unwrap() {
        ControlJacobian::TimeVarying(d_du) => {
            assert_eq!(d_du.shape(), &[1, 2, 2, 11]);
            assert!(d_du.iter().all(|d| *d <= 0.0));
            assert_eq!(d_du[[0, 0, 1, 3]], 0.0);
        }
        ControlJacobian::Constant(_) => {
            panic!("Wilson-Cowan control jacobian depends on the state")
        }
    }
}

#[test]
fn test_replacing_models_expose_input_as_control() {
    let model = build_network_model(FitzHughNagumo::default(), &simulation(1.0), None)
        .unwrap()
        .with_external_input(Array3::from_elem((1, 2, 11), 0.7))
        .unwrap();
    assert_eq!(model.initial_control(), Array3::from_elem((1, 2, 11), 0.7));
    assert_eq!(
        model.control_jacobian().unwrap(),
        ControlJacobian::Constant(-Array2::<f64>::eye(2))
    );
}

#[test]
fn test_simulation_starts_from_initial_state() {
    let network = two_nodes(Coupling::Diffusive);
    let mut model = build_network_model(Hopf::default(), &simulation(1.0), Some(&network))
        .unwrap()
        .with_initial_state(array![[0.5, 0.0], [0.0, -0.5]])
        .unwrap();
    model.simulate();
    let trajectory = model.trajectory();
    assert_eq!(trajectory.shape(), &[2, 2, 11]);
    assert_eq!(trajectory[[0, 0, 0]], 0.5);
    assert_eq!(trajectory[[1, 1, 0]], -0.5);

    // first Euler step by hand for node 0, x variable
    let (a, w) = (0.25, 0.2);
    let (x, y) = (0.5, 0.0);
    let network_input = 0.5 * 1.0 * (0.0 - 0.5);
    let expected = x + 0.1 * ((a - x * x - y * y) * x - w * y + network_input);
    assert!((trajectory[[0, 0, 1]] - expected).abs() < 1e-15);

    let mut single = build_network_model(Hopf::default(), &simulation(1.0), None).unwrap();
    assert!(single.clone().with_initial_state(Array2::zeros((2, 2))).is_err());
    single.simulate();
    assert!(single.trajectory().iter().all(|x| *x == 0.0));
}
