//! End-of-command summary of per-component failures
//!
//! A failure that only concerns one component is recorded and the command
//! moves on to the next component; anything else aborts right away.

use crate::error::{RegistryError, Result};

/// Failures collected while a command runs
#[derive(Debug, Default)]
pub struct Summary {
    failures: Vec<(String, RegistryError)>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a per-component failure of `component`; pass everything else through
    ///
    /// Returns `Ok(None)` when the failure was recorded.
    pub fn record<T>(&mut self, component: &str, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_per_component() => {
                tracing::error!("{component}: {e}");
                self.failures.push((component.to_string(), e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Merge the failures of a nested run
    pub fn absorb(&mut self, other: Summary) {
        self.failures.extend(other.failures);
    }

    /// `Ok` when nothing failed, else one error carrying every failure
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        for (component, failure) in &self.failures {
            if let RegistryError::PatchConflict { report, .. } = failure {
                tracing::warn!("Conflicts in '{component}':\n{report}");
            }
        }
        Err(RegistryError::ComponentFailures {
            failures: self.failures.into_iter().map(|(_, e)| e).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_ENVIRONMENT, EXIT_USER};

    fn refused() -> RegistryError {
        RegistryError::Refused {
            action: "remove".to_string(),
        }
    }

    #[test]
    fn test_per_component_failures_are_collected() {
        let mut summary = Summary::new();
        assert_eq!(summary.record("a", Ok(1)).unwrap(), Some(1));
        assert_eq!(summary.record::<()>("b", Err(refused())).unwrap(), None);
        assert_eq!(summary.len(), 1);

        let err = summary.into_result().unwrap_err();
        assert!(matches!(err, RegistryError::ComponentFailures { ref failures } if failures.len() == 1));
        assert_eq!(err.exit_code(), EXIT_USER);
    }

    #[test]
    fn test_other_failures_abort() {
        let mut summary = Summary::new();
        let err = summary
            .record::<()>("a", Err(RegistryError::IoError { message: "disk".into() }))
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_ENVIRONMENT);
        assert!(summary.is_empty());
        assert!(summary.into_result().is_ok());
    }

    #[test]
    fn test_absorb() {
        let mut outer = Summary::new();
        let mut inner = Summary::new();
        inner.record::<()>("dep", Err(refused())).unwrap();
        outer.absorb(inner);
        assert_eq!(outer.len(), 1);
    }
}
