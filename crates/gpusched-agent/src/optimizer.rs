//! Parameter update rules for the local network

use gpusched_core::OptimizerKind;
use ndarray::{Array, Dimension, Zip};

use crate::network::{Gradients, QNetwork};

/// Applies one gradient step to a network
pub trait Optimizer: Send {
    fn step(&mut self, network: &mut QNetwork, grads: &Gradients);
}

/// Build the optimizer selected by configuration
pub fn build(kind: OptimizerKind, learning_rate: f32) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Adam => Box::new(Adam::new(learning_rate)),
        OptimizerKind::Sgd => Box::new(Sgd::new(learning_rate)),
    }
}

/// Plain gradient descent with a fixed learning rate
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, network: &mut QNetwork, grads: &Gradients) {
        for (layer, grad) in network.layers_mut().iter_mut().zip(&grads.layers) {
            layer.weight.scaled_add(-self.learning_rate, &grad.weight);
            layer.bias.scaled_add(-self.learning_rate, &grad.bias);
        }
    }
}

struct Moments<D: Dimension> {
    first: Array<f32, D>,
    second: Array<f32, D>,
}

impl<D: Dimension> Moments<D> {
    fn zeros_like(param: &Array<f32, D>) -> Self {
        Self {
            first: Array::zeros(param.raw_dim()),
            second: Array::zeros(param.raw_dim()),
        }
    }
}

/// Adam with the usual decay rates (0.9, 0.999)
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: i32,
    weights: Vec<Moments<ndarray::Ix2>>,
    biases: Vec<Moments<ndarray::Ix1>>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            steps: 0,
            weights: Vec::new(),
            biases: Vec::new(),
        }
    }

    fn update<D: Dimension>(
        &self,
        param: &mut Array<f32, D>,
        moments: &mut Moments<D>,
        grad: &Array<f32, D>,
    ) {
        let (b1, b2) = (self.beta1, self.beta2);
        let correction1 = 1.0 - b1.powi(self.steps);
        let correction2 = 1.0 - b2.powi(self.steps);
        let (lr, eps) = (self.learning_rate, self.epsilon);
        Zip::from(param)
            .and(&mut moments.first)
            .and(&mut moments.second)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut QNetwork, grads: &Gradients) {
        if self.weights.is_empty() {
            for layer in network.layers() {
                self.weights.push(Moments::zeros_like(&layer.weight));
                self.biases.push(Moments::zeros_like(&layer.bias));
            }
        }
        self.steps = self.steps.saturating_add(1);

        let mut weights = std::mem::take(&mut self.weights);
        let mut biases = std::mem::take(&mut self.biases);
        for (((layer, grad), wm), bm) in network
            .layers_mut()
            .iter_mut()
            .zip(&grads.layers)
            .zip(weights.iter_mut())
            .zip(biases.iter_mut())
        {
            self.update(&mut layer.weight, wm, &grad.weight);
            self.update(&mut layer.bias, bm, &grad.bias);
        }
        self.weights = weights;
        self.biases = biases;
    }
}
