use ndarray::Zip;

use super::ForecastNetwork;

/// Adam with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    steps: i32,
    first_moment: ForecastNetwork,
    second_moment: ForecastNetwork,
}

impl Adam {
    pub fn new(network: &ForecastNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            steps: 0,
            first_moment: network.zeros_like(),
            second_moment: network.zeros_like(),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn step(&mut self, network: &mut ForecastNetwork, grads: &ForecastNetwork) {
        self.steps += 1;

        let Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps,
            first_moment,
            second_moment,
        } = self;
        let (lr, beta1, beta2, epsilon) = (*learning_rate, *beta1, *beta2, *epsilon);
        let first_correction = 1.0 - beta1.powi(*steps);
        let second_correction = 1.0 - beta2.powi(*steps);

        let params = network
            .tensors_mut()
            .into_iter()
            .zip(grads.tensors())
            .zip(first_moment.tensors_mut())
            .zip(second_moment.tensors_mut());

        for (((param, grad), m), v) in params {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / first_correction;
                    let v_hat = *v / second_correction;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
    }
}

/// Multiplies the learning rate by `factor` once the monitored loss has failed to improve for
/// more than `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    factor: f64,
    patience: usize,
    threshold: f64,
    best: f64,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(factor: f64, patience: usize) -> Self {
        Self {
            factor,
            patience,
            threshold: 1e-4,
            best: f64::INFINITY,
            bad_epochs: 0,
        }
    }

    /// Returns true if the learning rate was reduced.
    pub fn step(&mut self, loss: f64, optimizer: &mut Adam) -> bool {
        if loss < self.best * (1.0 - self.threshold) {
            self.best = loss;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.bad_epochs > self.patience {
            optimizer.set_learning_rate(optimizer.learning_rate() * self.factor);
            self.bad_epochs = 0;
            true
        } else {
            false
        }
    }
}
