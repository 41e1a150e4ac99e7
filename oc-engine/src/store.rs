use ndarray::Array3;

/// Append-only record of an optimization run.
///
/// In stochastic mode `control_history[i]` is the control whose cost is
/// `cost_history[i]`.
#[derive(Debug, Clone, Default)]
pub struct OptimizationHistory {
    pub cost_history: Vec<f64>,
    pub step_sizes_history: Vec<f64>,
    pub step_sizes_loops_history: Vec<usize>,
    pub control_history: Vec<Array3<f64>>,
}

impl OptimizationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, step: f64, loops: usize) {
        self.step_sizes_history.push(step);
        self.step_sizes_loops_history.push(loops);
    }

    /// Index of the lowest recorded cost. The first minimum wins on ties and
    /// NaN entries are never selected.
    pub fn best_index(&self) -> Option<usize> {
        self.cost_history
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (i, &c)| match best {
                Some((_, best_cost)) if best_cost <= c => best,
                _ => Some((i, c)),
            })
            .map(|(i, _)| i)
    }

    pub fn best_control(&self) -> Option<&Array3<f64>> {
        self.best_index().and_then(|i| self.control_history.get(i))
    }
}
