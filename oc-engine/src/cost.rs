use crate::{
    control::validate_binary_mask,
    error::{check_shape, OcError, OcResult},
};
use ndarray::{Array2, Array3, ArrayView3, Zip};
use oc_structs::config::{CostWeights, Interval};
use oc_utils::convert_interval;

/// Scalar cost of a simulated trajectory under a control, with derivatives.
///
/// Derivatives are returned without the integration weight `dt`; the adjoint
/// recursion applies it.
pub trait CostFunctional {
    fn total_cost(&self, trajectory: ArrayView3<f64>, control: ArrayView3<f64>) -> f64;

    /// `N x V_out x T`.
    fn state_derivative(&self, trajectory: ArrayView3<f64>) -> Array3<f64>;

    /// `N x V_out x T`.
    fn control_derivative(&self, control: ArrayView3<f64>) -> Array3<f64>;
}

/// Weighted sum of a masked tracking (precision) term, an L2 energy term and
/// an L1 sparsity term.
#[derive(Debug, Clone)]
pub struct TrackingCost {
    target: Array3<f64>,
    weights: CostWeights,
    cost_mask: Array2<f64>,
    interval: (usize, usize),
    dt: f64,
}

impl TrackingCost {
    pub fn new(
        target: Array3<f64>,
        weights: CostWeights,
        cost_mask: Option<Array2<f64>>,
        interval: Interval,
        dt: f64,
    ) -> OcResult<Self> {
        let (n_nodes, n_vars, n_steps) = target.dim();
        let cost_mask = cost_mask.unwrap_or_else(|| Array2::ones((n_nodes, n_vars)));
        check_shape("cost mask", &[n_nodes, n_vars], cost_mask.shape())?;
        validate_binary_mask(&cost_mask, "cost_mask")?;
        let interval = convert_interval(interval, n_steps).map_err(|e| OcError::InvalidInterval {
            reason: e.to_string(),
        })?;
        if !(dt > 0.0) {
            return Err(OcError::InvalidConfig {
                field: "dt",
                reason: format!("must be positive, got {}", dt),
            });
        }
        Ok(Self {
            target,
            weights,
            cost_mask,
            interval,
            dt,
        })
    }

    pub fn target(&self) -> &Array3<f64> {
        &self.target
    }

    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    pub fn cost_mask(&self) -> &Array2<f64> {
        &self.cost_mask
    }

    /// `[start, end)` on the time axis.
    pub fn interval(&self) -> (usize, usize) {
        self.interval
    }

    pub fn precision_cost(&self, trajectory: ArrayView3<f64>) -> f64 {
        let (n_nodes, n_vars, _) = self.target.dim();
        let (start, end) = self.interval;
        let mut cost = 0.0;
        for n in 0..n_nodes {
            for v in 0..n_vars {
                if self.cost_mask[[n, v]] == 0.0 {
                    continue;
                }
                for t in start..end {
                    cost += (self.target[[n, v, t]] - trajectory[[n, v, t]]).powi(2);
                }
            }
        }
        self.weights.w_p * self.dt * 0.5 * cost
    }

    pub fn energy_cost(&self, control: ArrayView3<f64>) -> f64 {
        self.weights.w_2 * self.dt * 0.5 * control.iter().map(|u| u * u).sum::<f64>()
    }

    pub fn sparsity_cost(&self, control: ArrayView3<f64>) -> f64 {
        self.weights.w_1 * self.dt * control.iter().map(|u| u.abs()).sum::<f64>()
    }
}

impl CostFunctional for TrackingCost {
    fn total_cost(&self, trajectory: ArrayView3<f64>, control: ArrayView3<f64>) -> f64 {
        let mut cost = self.precision_cost(trajectory);
        if self.weights.w_2 != 0.0 {
            cost += self.energy_cost(control);
        }
        if self.weights.w_1 != 0.0 {
            cost += self.sparsity_cost(control);
        }
        cost
    }

    fn state_derivative(&self, trajectory: ArrayView3<f64>) -> Array3<f64> {
        let (n_nodes, n_vars, _) = self.target.dim();
        let (start, end) = self.interval;
        let mut derivative = Array3::zeros(self.target.dim());
        for n in 0..n_nodes {
            for v in 0..n_vars {
                let mask = self.cost_mask[[n, v]];
                for t in start..end {
                    derivative[[n, v, t]] =
                        -self.weights.w_p * (self.target[[n, v, t]] - trajectory[[n, v, t]]) * mask;
                }
            }
        }
        derivative
    }

    fn control_derivative(&self, control: ArrayView3<f64>) -> Array3<f64> {
        let (w_2, w_1) = (self.weights.w_2, self.weights.w_1);
        let mut derivative = Array3::zeros(control.raw_dim());
        Zip::from(&mut derivative).and(&control).for_each(|d, &u| {
            let sign = if u > 0.0 {
                1.0
            } else if u < 0.0 {
                -1.0
            } else {
                0.0
            };
            *d = w_2 * u + w_1 * sign;
        });
        derivative
    }
}
