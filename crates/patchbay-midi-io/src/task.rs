//! Named worker threads owned by ports, devices and connectors.

use crate::error::{Error, Result};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// A set of spawned loops that are joined together on shutdown.
#[derive(Default)]
pub struct Tasks {
    handles: Vec<(String, JoinHandle<Result<()>>)>,
}

impl Tasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new()
            .name(format!("patchbay-{}", name))
            .spawn(f)
            .map_err(|e| Error::Thread(format!("failed to spawn {}: {}", name, e)))?;
        debug!("Spawned {}", name);
        self.handles.push((name, handle));
        Ok(())
    }

    pub fn extend(&mut self, other: Tasks) {
        self.handles.extend(other.handles);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every loop to finish. All loops are joined even if some
    /// failed; the first failure is returned.
    pub fn join(self) -> Result<()> {
        let mut first_error = None;
        for (name, handle) in self.handles {
            let result = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(Error::Thread(format!("{} panicked", name))),
            };
            if let Err(e) = result {
                error!("{} terminated with error: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for Tasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handles.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Tasks").field("threads", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_returns_first_error() {
        let mut tasks = Tasks::new();
        tasks.spawn("ok", || Ok(())).unwrap();
        tasks
            .spawn("fails", || Err(Error::Transport("gone".into())))
            .unwrap();
        assert_eq!(tasks.len(), 2);

        let err = tasks.join().unwrap_err();
        assert!(matches!(err, Error::Transport(msg) if msg == "gone"));
    }

    #[test]
    fn test_join_reports_panic() {
        let mut tasks = Tasks::new();
        tasks.spawn("boom", || panic!("loop exploded")).unwrap();
        assert!(matches!(tasks.join(), Err(Error::Thread(_))));
    }

    #[test]
    fn test_extend_and_empty() {
        let mut tasks = Tasks::new();
        assert!(tasks.is_empty());
        let mut other = Tasks::new();
        other.spawn("one", || Ok(())).unwrap();
        tasks.extend(other);
        assert_eq!(tasks.len(), 1);
        tasks.join().unwrap();
    }
}
