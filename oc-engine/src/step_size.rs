use crate::{
    control::update_control_with_limit, cost::CostFunctional, optimizer::OptimalControl,
    system::ControlledSystem,
};
use log::{debug, warn};
use ndarray::Array3;

/// Result of one step size search.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepSearch {
    pub step: f64,
    /// Shrink or growth iterations performed after stabilization.
    pub loops: usize,
    /// No step improved on the cost; the control was left unchanged.
    pub stagnated: bool,
}

impl StepSearch {
    fn stagnated(loops: usize) -> Self {
        Self {
            step: 0.0,
            loops,
            stagnated: true,
        }
    }
}

impl<S: ControlledSystem, C: CostFunctional> OptimalControl<S, C> {
    /// Moves the control along `direction` by the largest step found that
    /// does not increase the cost.
    ///
    /// The reference cost of the current control averages finite noise
    /// realizations only; if none is finite the search stagnates right away.
    /// The search starts from the step accepted last time. Steps producing a
    /// non-finite trajectory in any noise realization are first shrunk by
    /// `factor_down^2` until the output is finite. A step whose cost exceeds
    /// the current cost is then shrunk by `factor_down`, and a step that
    /// improves it is grown by `factor_up` for as long as the cost keeps
    /// improving. When nothing works the control is restored, the step is
    /// reported as `0` and the search counts as stagnated.
    ///
    /// On return the control applied to the system is the accepted one.
    pub fn step_size(&mut self, direction: &Array3<f64>) -> StepSearch {
        let realizations = self.config.num_noise_realizations.max(1);
        let u_max = self.config.maximum_control_strength;
        let control0 = self.control.clone();
        let cost0 = if realizations > 1 {
            self.compute_cost_noisy(realizations)
        } else {
            self.evaluate(realizations).unwrap_or(f64::INFINITY)
        };
        if !cost0.is_finite() {
            warn!("Model output diverges for the current control, skip step size search");
            return self.finish_search(StepSearch::stagnated(0));
        }

        let mut step = self.step;
        let mut shrinks = 0;
        let stable_cost = loop {
            self.write_control(update_control_with_limit(&control0, step, direction, u_max));
            if let Some(cost) = self.evaluate(realizations) {
                break Some(cost);
            }
            if shrinks == self.config.max_stabilization_steps {
                break None;
            }
            shrinks += 1;
            step *= self.config.factor_down.powi(2);
            warn!("Diverging model output, decrease step size to {}", step);
        };

        let search = match stable_cost {
            None => {
                warn!(
                    "Model output still diverges after {} step size reductions",
                    shrinks
                );
                self.write_control(control0);
                StepSearch::stagnated(0)
            }
            Some(cost) if cost > cost0 => {
                self.decrease_step(cost, cost0, step, &control0, direction)
            }
            Some(cost) if cost < cost0 => self.increase_step(cost, step, &control0, direction),
            Some(_) => {
                debug!("Step size search did not change the cost");
                self.write_control(control0);
                StepSearch::stagnated(0)
            }
        };
        self.finish_search(search)
    }

    fn finish_search(&mut self, search: StepSearch) -> StepSearch {
        if search.stagnated {
            self.zero_step_encountered = true;
        } else {
            self.step = search.step;
        }
        self.history.record_step(search.step, search.loops);
        search
    }

    fn decrease_step(
        &mut self,
        mut cost: f64,
        cost0: f64,
        mut step: f64,
        control0: &Array3<f64>,
        direction: &Array3<f64>,
    ) -> StepSearch {
        let realizations = self.config.num_noise_realizations.max(1);
        let u_max = self.config.maximum_control_strength;
        let mut counter = 0;
        while cost > cost0 {
            if counter == self.config.count_step {
                debug!(
                    "Cost did not decrease within {} step size reductions",
                    counter
                );
                self.write_control(control0.clone());
                return StepSearch::stagnated(counter);
            }
            step *= self.config.factor_down;
            counter += 1;
            self.write_control(update_control_with_limit(control0, step, direction, u_max));
            cost = self.evaluate(realizations).unwrap_or(f64::INFINITY);
        }
        StepSearch {
            step,
            loops: counter,
            stagnated: false,
        }
    }

    fn increase_step(
        &mut self,
        cost: f64,
        mut step: f64,
        control0: &Array3<f64>,
        direction: &Array3<f64>,
    ) -> StepSearch {
        let realizations = self.config.num_noise_realizations.max(1);
        let u_max = self.config.maximum_control_strength;
        let mut best_cost = cost;
        let mut counter = 0;
        while counter < self.config.count_step {
            let trial = step * self.config.factor_up;
            counter += 1;
            self.write_control(update_control_with_limit(control0, trial, direction, u_max));
            match self.evaluate(realizations) {
                Some(trial_cost) if trial_cost < best_cost => {
                    step = trial;
                    best_cost = trial_cost;
                }
                outcome => {
                    if outcome.is_none() {
                        debug!("Diverging model output at step size {}", trial);
                    }
                    self.write_control(update_control_with_limit(control0, step, direction, u_max));
                    break;
                }
            }
        }
        StepSearch {
            step,
            loops: counter,
            stagnated: false,
        }
    }
}
