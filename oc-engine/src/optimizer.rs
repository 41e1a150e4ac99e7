use crate::{
    adjoint::solve_adjoint,
    control::{has_diverged, max_abs, update_control_with_limit, validate_binary_mask},
    cost::{CostFunctional, TrackingCost},
    error::{check_shape, OcError, OcResult},
    gradient::compute_gradient,
    store::OptimizationHistory,
    system::ControlledSystem,
};
use log::{debug, info, warn};
use logging_timer::time;
use ndarray::{Array2, Array3};
use oc_structs::{config::OptimizerConfig, core::TerminationReason};

/// Upper bound on simulations per requested noise realization when diverged
/// realizations are discarded.
const MAX_ATTEMPTS_PER_REALIZATION: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub termination: TerminationReason,
    /// Gradient descent iterations that performed a step size search.
    pub iterations: usize,
    /// Last recorded cost (deterministic) or the lowest recorded cost (stochastic).
    pub final_cost: f64,
    pub validation_cost: Option<f64>,
}

/// Gradient descent on the control signal of a [`ControlledSystem`].
///
/// The engine owns the system adapter. Every control it evaluates is written
/// into the adapter through `apply_control` before simulating, and the
/// trajectory is always read back from the adapter.
pub struct OptimalControl<S: ControlledSystem, C: CostFunctional = TrackingCost> {
    pub(crate) system: S,
    pub(crate) cost: C,
    pub(crate) config: OptimizerConfig,
    pub(crate) control_mask: Array2<f64>,
    pub(crate) control: Array3<f64>,
    pub(crate) adjoint_state: Array3<f64>,
    pub(crate) step: f64,
    pub(crate) zero_step_encountered: bool,
    pub(crate) cost_validation: Option<f64>,
    pub(crate) history: OptimizationHistory,
}

impl<S: ControlledSystem> OptimalControl<S, TrackingCost> {
    /// Tracks `target` (`N x V_out x T`) with the weights and cost interval of
    /// `config`. Masks default to all ones.
    pub fn new(
        system: S,
        target: Array3<f64>,
        config: OptimizerConfig,
        control_mask: Option<Array2<f64>>,
        cost_mask: Option<Array2<f64>>,
    ) -> OcResult<Self> {
        let shape = system.shape();
        check_shape(
            "target",
            &[shape.n_nodes, shape.n_output_vars, shape.n_steps],
            target.shape(),
        )?;
        let cost = TrackingCost::new(
            target,
            config.weights.clone(),
            cost_mask,
            config.cost_interval,
            system.dt(),
        )?;
        Self::with_cost(system, cost, config, control_mask)
    }
}

impl<S: ControlledSystem, C: CostFunctional> OptimalControl<S, C> {
    pub fn with_cost(
        mut system: S,
        cost: C,
        config: OptimizerConfig,
        control_mask: Option<Array2<f64>>,
    ) -> OcResult<Self> {
        validate_config(&config)?;
        let shape = system.shape();
        if shape.n_output_vars > shape.n_state_vars {
            return Err(OcError::ShapeMismatch {
                what: "output variables",
                expected: vec![shape.n_state_vars],
                actual: vec![shape.n_output_vars],
            });
        }
        let control_mask =
            control_mask.unwrap_or_else(|| Array2::ones((shape.n_nodes, shape.n_output_vars)));
        check_shape(
            "control mask",
            &[shape.n_nodes, shape.n_output_vars],
            control_mask.shape(),
        )?;
        validate_binary_mask(&control_mask, "control_mask")?;

        let initial = system.initial_control();
        let (n, v, t) = shape.control_dim();
        check_shape("initial control", &[n, v, t], initial.shape())?;
        let control = update_control_with_limit(
            &initial,
            0.0,
            &Array3::zeros(initial.raw_dim()),
            config.maximum_control_strength,
        );
        system.apply_control(&control);

        if system.is_stochastic() && !config.is_stochastic() {
            warn!(
                "Model '{}' is noisy, use more than one noise realization to optimize it",
                system.name()
            );
        } else if !system.is_stochastic() && config.is_stochastic() {
            warn!(
                "Model '{}' is deterministic, noise realization settings have no effect",
                system.name()
            );
        }

        Ok(Self {
            adjoint_state: Array3::zeros(shape.state_dim()),
            step: config.initial_step,
            system,
            cost,
            config,
            control_mask,
            control,
            zero_step_encountered: false,
            cost_validation: None,
            history: OptimizationHistory::new(),
        })
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn cost_functional(&self) -> &C {
        &self.cost
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn control(&self) -> &Array3<f64> {
        &self.control
    }

    pub fn control_mask(&self) -> &Array2<f64> {
        &self.control_mask
    }

    pub fn adjoint_state(&self) -> &Array3<f64> {
        &self.adjoint_state
    }

    pub fn history(&self) -> &OptimizationHistory {
        &self.history
    }

    pub fn cost_validation(&self) -> Option<f64> {
        self.cost_validation
    }

    pub fn zero_step_encountered(&self) -> bool {
        self.zero_step_encountered
    }

    /// Step size the next search starts from.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Replaces the control (saturated) and writes it into the system.
    pub fn set_control(&mut self, control: Array3<f64>) -> OcResult<()> {
        check_shape("control", self.control.shape(), control.shape())?;
        let u_max = self.config.maximum_control_strength;
        let zeros = Array3::zeros(control.raw_dim());
        let control = update_control_with_limit(&control, 0.0, &zeros, u_max);
        self.write_control(control);
        Ok(())
    }

    pub(crate) fn write_control(&mut self, control: Array3<f64>) {
        self.control = control;
        self.system.apply_control(&self.control);
    }

    pub fn simulate_forward(&mut self) {
        self.system.simulate();
    }

    /// Cost of the last simulated trajectory under the current control.
    pub fn compute_total_cost(&self) -> f64 {
        self.cost
            .total_cost(self.system.trajectory(), self.control.view())
    }

    pub fn solve_adjoint(&mut self) -> OcResult<()> {
        let hx = self.system.local_jacobian()?;
        let hx_nw = self.system.coupling_jacobian()?;
        let df_dx = self.cost.state_derivative(self.system.trajectory());
        self.adjoint_state = solve_adjoint(
            &hx,
            &hx_nw,
            &df_dx,
            self.system.shape().state_dim(),
            self.system.dt(),
        )?;
        Ok(())
    }

    /// Gradient of the total cost w.r.t. the control around the last
    /// simulated trajectory.
    pub fn compute_gradient(&mut self) -> OcResult<Array3<f64>> {
        self.solve_adjoint()?;
        let df_du = self.cost.control_derivative(self.control.view());
        let d_du = self.system.control_jacobian()?;
        compute_gradient(&df_du, &self.adjoint_state, &self.control_mask, &d_du)
    }

    /// Average cost over `realizations` simulations of the current control.
    /// Returns `None` as soon as one of them diverges.
    pub(crate) fn evaluate(&mut self, realizations: usize) -> Option<f64> {
        let mut cost = 0.0;
        for _ in 0..realizations {
            self.simulate_forward();
            if has_diverged(&self.system.trajectory()) {
                return None;
            }
            cost += self.compute_total_cost();
        }
        let cost = cost / realizations as f64;
        if cost.is_finite() {
            Some(cost)
        } else {
            None
        }
    }

    /// Average cost over `realizations` finite noise realizations. Diverged
    /// realizations are discarded and redrawn.
    pub fn compute_cost_noisy(&mut self, realizations: usize) -> f64 {
        let mut cost = 0.0;
        let mut collected = 0;
        let mut attempts = 0;
        while collected < realizations && attempts < realizations * MAX_ATTEMPTS_PER_REALIZATION {
            attempts += 1;
            self.simulate_forward();
            if has_diverged(&self.system.trajectory()) {
                continue;
            }
            cost += self.compute_total_cost();
            collected += 1;
        }
        if collected == 0 {
            warn!("No finite noise realization in {} attempts", attempts);
            return f64::INFINITY;
        }
        cost / collected as f64
    }

    /// Runs at most `n_max_iterations` gradient descent iterations, the
    /// deterministic scheme for one noise realization and the noise-averaged
    /// scheme otherwise. History accumulates across calls.
    #[time]
    pub fn optimize(&mut self, n_max_iterations: usize) -> OcResult<OptimizationOutcome> {
        let control = update_control_with_limit(
            &self.control,
            0.0,
            &Array3::zeros(self.control.raw_dim()),
            self.config.maximum_control_strength,
        );
        self.write_control(control);
        self.zero_step_encountered = false;

        if self.config.is_stochastic() {
            info!("Compute control for a noisy system");
            self.optimize_noisy(n_max_iterations)
        } else {
            info!("Compute control for a deterministic system");
            self.optimize_deterministic(n_max_iterations)
        }
    }

    fn optimize_deterministic(&mut self, n_max_iterations: usize) -> OcResult<OptimizationOutcome> {
        let tolerance = self.config.convergence_tolerance;

        self.simulate_forward();
        let mut cost = self.compute_total_cost();
        info!("Cost in iteration 0: {}", cost);
        if self.history.cost_history.is_empty() {
            self.history.cost_history.push(cost);
        }

        let mut termination = TerminationReason::MaxIterations;
        let mut iterations = 0;
        for i in 1..=n_max_iterations {
            let grad = self.compute_gradient()?;
            if max_abs(&grad) < tolerance {
                termination = TerminationReason::VanishingGradient;
                break;
            }
            iterations = i;

            let control0 = self.control.clone();
            let search = self.step_size(&-&grad);
            self.simulate_forward();
            cost = self.compute_total_cost();
            self.report(i, cost);
            self.history.cost_history.push(cost);

            if search.stagnated {
                termination = TerminationReason::Stagnation;
                break;
            }
            if max_abs(&(&self.control - &control0)) < tolerance {
                termination = TerminationReason::VanishingUpdate;
                break;
            }
        }

        if termination.is_converged() {
            info!(
                "Converged in iteration {} with cost {}: {}",
                iterations, cost, termination
            );
        }
        info!("Final cost: {}", cost);
        Ok(OptimizationOutcome {
            termination,
            iterations,
            final_cost: cost,
            validation_cost: None,
        })
    }

    fn optimize_noisy(&mut self, n_max_iterations: usize) -> OcResult<OptimizationOutcome> {
        let tolerance = self.config.convergence_tolerance;
        let mut consecutive_zero_step = 0;

        if self.history.control_history.is_empty() {
            self.history.control_history.push(self.control.clone());
        }
        let (mut grad, mut cost) = self.sample_gradient_and_cost()?;
        info!("Mean cost in iteration 0: {}", cost);
        if self.history.cost_history.is_empty() {
            self.history.cost_history.push(cost);
        }

        let mut termination = TerminationReason::MaxIterations;
        let mut iterations = 0;
        for i in 1..=n_max_iterations {
            if max_abs(&grad) < tolerance {
                termination = TerminationReason::VanishingGradient;
                break;
            }
            iterations = i;

            let direction = -&grad;
            let mut stagnated = true;
            for _ in 0..self.config.count_noisy_step {
                self.zero_step_encountered = false;
                if !self.step_size(&direction).stagnated {
                    stagnated = false;
                    break;
                }
            }

            if stagnated {
                consecutive_zero_step += 1;
                warn!("Failed to improve further for noisy system");
                if consecutive_zero_step > 2 {
                    warn!("No improvement in three consecutive iterations, stop optimization");
                    termination = TerminationReason::Stagnation;
                    break;
                }
            } else {
                consecutive_zero_step = 0;
            }

            self.history.control_history.push(self.control.clone());
            (grad, cost) = self.sample_gradient_and_cost()?;
            self.report(i, cost);
            self.history.cost_history.push(cost);
        }

        let best = self.history.best_index().unwrap_or(0);
        info!("Minimal cost found at iteration {}", best);
        if let Some(control) = self.history.best_control().cloned() {
            self.write_control(control);
        }

        let realizations = self.config.validation_realizations();
        let validation = self.compute_cost_noisy(realizations);
        self.cost_validation = Some(validation);
        info!(
            "Final cost validated with {} noise realizations: {}",
            realizations, validation
        );

        Ok(OptimizationOutcome {
            termination,
            iterations,
            final_cost: self.history.cost_history.get(best).copied().unwrap_or(cost),
            validation_cost: Some(validation),
        })
    }

    /// Mean gradient and cost over the configured noise realizations. With
    /// `validate_per_step` the cost is re-estimated from the validation
    /// realizations instead.
    fn sample_gradient_and_cost(&mut self) -> OcResult<(Array3<f64>, f64)> {
        let realizations = self.config.num_noise_realizations.max(1);
        let mut grad = Array3::<f64>::zeros(self.control.raw_dim());
        let mut cost = 0.0;
        let mut collected = 0;
        let mut attempts = 0;
        while collected < realizations && attempts < realizations * MAX_ATTEMPTS_PER_REALIZATION {
            attempts += 1;
            self.simulate_forward();
            if has_diverged(&self.system.trajectory()) {
                continue;
            }
            cost += self.compute_total_cost();
            grad += &self.compute_gradient()?;
            collected += 1;
        }
        if collected == 0 {
            warn!("No finite noise realization in {} attempts", attempts);
            return Ok((grad, f64::INFINITY));
        }
        grad /= collected as f64;
        cost /= collected as f64;

        if self.config.validate_per_step {
            cost = self.compute_cost_noisy(self.config.validation_realizations());
        }
        Ok((grad, cost))
    }

    fn report(&self, iteration: usize, cost: f64) {
        let label = if self.config.is_stochastic() {
            "Mean cost"
        } else {
            "Cost"
        };
        if self.config.print_array.contains(&iteration) {
            info!("{} in iteration {}: {}", label, iteration, cost);
        } else {
            debug!("{} in iteration {}: {}", label, iteration, cost);
        }
    }
}

fn validate_config(config: &OptimizerConfig) -> OcResult<()> {
    let invalid =
        |field: &'static str, reason: String| Err(OcError::InvalidConfig { field, reason });

    if !(config.factor_down > 0.0 && config.factor_down < 1.0) {
        return invalid(
            "factor_down",
            format!("must be in (0, 1), got {}", config.factor_down),
        );
    }
    if !(config.factor_up > 1.0) || !config.factor_up.is_finite() {
        return invalid(
            "factor_up",
            format!("must be greater than 1, got {}", config.factor_up),
        );
    }
    if !(config.initial_step > 0.0) || !config.initial_step.is_finite() {
        return invalid(
            "initial_step",
            format!("must be positive, got {}", config.initial_step),
        );
    }
    if config.count_step == 0 {
        return invalid("count_step", "must be at least 1".to_string());
    }
    if config.count_noisy_step == 0 {
        return invalid("count_noisy_step", "must be at least 1".to_string());
    }
    if config.num_noise_realizations == 0 {
        return invalid("num_noise_realizations", "must be at least 1".to_string());
    }
    if let Some(u_max) = config.maximum_control_strength {
        if !(u_max > 0.0) {
            return invalid(
                "maximum_control_strength",
                format!("must be positive, got {}", u_max),
            );
        }
    }
    if !(config.convergence_tolerance >= 0.0) {
        return invalid(
            "convergence_tolerance",
            format!("must not be negative, got {}", config.convergence_tolerance),
        );
    }
    Ok(())
}
