// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Step decay with an optional linear warm-up (epochs are 0-based):
//
//   warm-up (epoch < warmup_epochs)   base · (epoch + 1) / warmup_epochs
//   afterwards                        base · gamma^(#milestones ≤ epoch)

use crate::application::config::SolverConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct MultiStepLr {
    base_lr:       f64,
    milestones:    Vec<usize>,
    gamma:         f64,
    warmup_epochs: Option<usize>,
}

impl MultiStepLr {
    pub fn new(base_lr: f64, milestones: Vec<usize>, gamma: f64) -> Self {
        Self { base_lr, milestones, gamma, warmup_epochs: None }
    }

    pub fn with_warmup(mut self, epochs: usize) -> Self {
        self.warmup_epochs = (epochs > 0).then_some(epochs);
        self
    }

    pub fn lr(&self, epoch: usize) -> f64 {
        if let Some(warmup) = self.warmup_epochs {
            if epoch < warmup {
                return self.base_lr * (epoch + 1) as f64 / warmup as f64;
            }
        }
        let decays = self.milestones.iter().filter(|&&m| m <= epoch).count();
        self.base_lr * self.gamma.powi(decays as i32)
    }
}

impl From<&SolverConfig> for MultiStepLr {
    fn from(s: &SolverConfig) -> Self {
        let schedule = Self::new(s.base_lr, s.lr_milestones.clone(), s.lr_gamma);
        if s.warmup {
            schedule.with_warmup(s.warmup_epochs)
        } else {
            schedule
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_decay_at_milestones() {
        let s = MultiStepLr::from(&SolverConfig::default());
        assert!(close(s.lr(0), 0.01));
        assert!(close(s.lr(29), 0.01));
        assert!(close(s.lr(30), 0.001));
        assert!(close(s.lr(60), 0.0001));
        assert!(close(s.lr(95), 0.00001));
    }

    #[test]
    fn test_linear_warmup() {
        let s = MultiStepLr::new(0.1, vec![], 0.5).with_warmup(4);
        assert!(close(s.lr(0), 0.025));
        assert!(close(s.lr(3), 0.1));
        assert!(close(s.lr(10), 0.1));
    }

    #[test]
    fn test_warmup_flag_from_config() {
        let cfg = SolverConfig { warmup: true, warmup_epochs: 10, ..SolverConfig::default() };
        let s = MultiStepLr::from(&cfg);
        assert!(close(s.lr(4), 0.005));
    }
}
