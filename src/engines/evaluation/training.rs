use crate::error::{GpError, Result};
use std::fmt;
use std::sync::Arc;

/// One labeled example: the input handed to terminal evaluators and the
/// value the tree should produce for it.
#[derive(Debug, Clone)]
pub struct TrainingCase<I> {
    pub input: I,
    pub expected: f64,
}

impl<I> TrainingCase<I> {
    pub fn new(input: I, expected: f64) -> Self {
        Self { input, expected }
    }
}

pub type CaseProvider<I> = Arc<dyn Fn() -> anyhow::Result<Vec<TrainingCase<I>>> + Send + Sync>;

/// Where the cases come from. A provider is called once per organism
/// evaluation, so it may hand out a different sample every time.
pub enum TrainingSet<I> {
    Static(Vec<TrainingCase<I>>),
    Provider(CaseProvider<I>),
}

impl<I> TrainingSet<I> {
    pub fn provider<F>(provider: F) -> Self
    where
        F: Fn() -> anyhow::Result<Vec<TrainingCase<I>>> + Send + Sync + 'static,
    {
        TrainingSet::Provider(Arc::new(provider))
    }

    /// Resolves the cases and hands them to `f`. An empty resolution is an
    /// error: the fitness mean is undefined over zero cases.
    pub fn with_cases<R>(&self, f: impl FnOnce(&[TrainingCase<I>]) -> Result<R>) -> Result<R> {
        match self {
            TrainingSet::Static(cases) => {
                if cases.is_empty() {
                    return Err(GpError::TrainingSet("Training set is empty".to_string()));
                }
                f(cases)
            }
            TrainingSet::Provider(provider) => {
                let cases = provider().map_err(|e| {
                    GpError::TrainingSet(format!("Training provider failed: {:#}", e))
                })?;
                if cases.is_empty() {
                    return Err(GpError::TrainingSet(
                        "Training provider returned no cases".to_string(),
                    ));
                }
                f(&cases)
            }
        }
    }

    /// Checks a static set up front; providers are only checked when called.
    pub fn validate(&self) -> Result<()> {
        match self {
            TrainingSet::Static(cases) if cases.is_empty() => {
                Err(GpError::TrainingSet("Training set is empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl<I> From<Vec<TrainingCase<I>>> for TrainingSet<I> {
    fn from(cases: Vec<TrainingCase<I>>) -> Self {
        TrainingSet::Static(cases)
    }
}

impl<I> fmt::Debug for TrainingSet<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingSet::Static(cases) => write!(f, "TrainingSet::Static({} cases)", cases.len()),
            TrainingSet::Provider(_) => write!(f, "TrainingSet::Provider"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_cases_are_passed_through() {
        let set: TrainingSet<f64> = vec![TrainingCase::new(1.0, 2.0), TrainingCase::new(3.0, 4.0)].into();
        let total = set
            .with_cases(|cases| Ok(cases.iter().map(|c| c.expected).sum::<f64>()))
            .unwrap();
        assert_eq!(total, 6.0);
    }

    #[test]
    fn test_empty_static_set_is_rejected() {
        let set: TrainingSet<f64> = TrainingSet::Static(Vec::new());
        assert!(set.validate().is_err());
        assert!(matches!(
            set.with_cases(|_| Ok(())),
            Err(GpError::TrainingSet(_))
        ));
    }

    #[test]
    fn test_provider_failure_is_reported() {
        let set: TrainingSet<f64> = TrainingSet::provider(|| anyhow::bail!("feed offline"));
        assert!(set.validate().is_ok());
        match set.with_cases(|_| Ok(())) {
            Err(GpError::TrainingSet(message)) => assert!(message.contains("feed offline")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
