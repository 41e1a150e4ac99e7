#![allow(dead_code)]

use ndarray::{s, Array2, Array3, Array4, Array5, ArrayView3};
use oc_engine::{ControlJacobian, Dynamics, Jacobians, OcResult, SystemShape};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Linear network `x' = A x + K C x_0 + u` integrated with explicit Euler.
pub struct LinearTestSystem {
    pub a: Array2<f64>,
    pub cmat: Array2<f64>,
    pub k_gl: f64,
    pub dt: f64,
    pub n_output_vars: usize,
    pub x0: Array2<f64>,
    pub input: Array3<f64>,
    /// Amplitude of uniform additive noise.
    pub noise: f64,
    /// Control magnitude beyond which the output becomes NaN.
    pub blow_up: Option<f64>,
    /// Simulation calls (counted from 1) whose output becomes NaN.
    pub diverge_on: Option<fn(usize) -> bool>,
    pub simulations: usize,
    rng: StdRng,
    state: Array3<f64>,
}

impl LinearTestSystem {
    pub fn new(a: Array2<f64>, cmat: Array2<f64>, k_gl: f64, dt: f64, n_steps: usize) -> Self {
        let n_nodes = cmat.nrows();
        let n_vars = a.nrows();
        Self {
            x0: Array2::zeros((n_nodes, n_vars)),
            input: Array3::zeros((n_nodes, n_vars, n_steps)),
            state: Array3::zeros((n_nodes, n_vars, n_steps)),
            n_output_vars: n_vars,
            noise: 0.0,
            blow_up: None,
            diverge_on: None,
            simulations: 0,
            rng: StdRng::seed_from_u64(42),
            a,
            cmat,
            k_gl,
            dt,
        }
    }

    /// Single node, single variable `x' = a x + u`.
    pub fn scalar(a: f64, dt: f64, n_steps: usize) -> Self {
        Self::new(
            Array2::from_elem((1, 1), a),
            Array2::zeros((1, 1)),
            0.0,
            dt,
            n_steps,
        )
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_blow_up(mut self, limit: f64) -> Self {
        self.blow_up = Some(limit);
        self
    }

    pub fn with_divergence_on(mut self, calls: fn(usize) -> bool) -> Self {
        self.diverge_on = Some(calls);
        self
    }
}

impl Dynamics for LinearTestSystem {
    fn name(&self) -> &'static str {
        "linear_test"
    }

    fn shape(&self) -> SystemShape {
        let (n_nodes, n_state_vars, n_steps) = self.state.dim();
        SystemShape {
            n_nodes,
            n_state_vars,
            n_output_vars: self.n_output_vars,
            n_steps,
        }
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn is_stochastic(&self) -> bool {
        self.noise > 0.0
    }

    fn initial_control(&self) -> Array3<f64> {
        self.input
            .slice(s![.., ..self.n_output_vars, ..])
            .to_owned()
    }

    fn apply_control(&mut self, control: &Array3<f64>) {
        let n_out = self.n_output_vars;
        self.input.slice_mut(s![.., ..n_out, ..]).assign(control);
    }

    fn simulate(&mut self) {
        self.simulations += 1;
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        self.state.fill(0.0);
        self.state.slice_mut(s![.., .., 0]).assign(&self.x0);
        if let Some(limit) = self.blow_up {
            if self.input.iter().any(|u| u.abs() > limit) {
                self.state.fill(f64::NAN);
                return;
            }
        }
        if let Some(diverges) = self.diverge_on {
            if diverges(self.simulations) {
                self.state.fill(f64::NAN);
                return;
            }
        }
        for t in 0..n_steps - 1 {
            for n in 0..n_nodes {
                let mut nw = 0.0;
                for l in 0..n_nodes {
                    nw += self.k_gl * self.cmat[[n, l]] * self.state[[l, 0, t]];
                }
                for v in 0..n_vars {
                    let mut d = self.input[[n, v, t]];
                    for k in 0..n_vars {
                        d += self.a[[v, k]] * self.state[[n, k, t]];
                    }
                    if v == 0 {
                        d += nw;
                    }
                    if self.noise > 0.0 {
                        d += self.noise * (self.rng.gen::<f64>() - 0.5);
                    }
                    self.state[[n, v, t + 1]] = self.state[[n, v, t]] + self.dt * d;
                }
            }
        }
    }

    fn trajectory(&self) -> ArrayView3<f64> {
        self.state.slice(s![.., ..self.n_output_vars, ..])
    }
}

impl Jacobians for LinearTestSystem {
    fn local_jacobian(&self) -> OcResult<Array4<f64>> {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        let mut hx = Array4::zeros((n_nodes, n_steps, n_vars, n_vars));
        for n in 0..n_nodes {
            for t in 0..n_steps {
                hx.slice_mut(s![n, t, .., ..]).assign(&(-&self.a));
            }
        }
        Ok(hx)
    }

    fn coupling_jacobian(&self) -> OcResult<Array5<f64>> {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        let mut hx_nw = Array5::zeros((n_nodes, n_nodes, n_steps, n_vars, n_vars));
        for n1 in 0..n_nodes {
            for n2 in 0..n_nodes {
                for t in 0..n_steps {
                    hx_nw[[n1, n2, t, 0, 0]] = -self.k_gl * self.cmat[[n1, n2]];
                }
            }
        }
        Ok(hx_nw)
    }

    fn control_jacobian(&self) -> OcResult<ControlJacobian> {
        Ok(ControlJacobian::Constant(-Array2::<f64>::eye(self.a.nrows())))
    }
}

/// `0` before `switch`, `1` from `switch` on.
pub fn step_target(n_steps: usize, switch: usize) -> Array3<f64> {
    Array3::from_shape_fn((1, 1, n_steps), |(_, _, t)| if t >= switch { 1.0 } else { 0.0 })
}
