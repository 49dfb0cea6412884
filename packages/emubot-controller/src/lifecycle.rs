//! Lifecycle of an emulator instance
//!
//! `Uncreated -> Created -> Configured -> Running -> Stopped`, with restart
//! and re-creation out of `Stopped`. Backends embed a [`Lifecycle`] and route
//! every operation through it, so an out-of-order call is an
//! [`ControllerError::InvalidLifecycle`] instead of a silent no-op.

use std::{
    fmt::Display,
    sync::{Mutex, MutexGuard},
};

use log::trace;

use crate::{ControllerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uncreated,
    Created,
    Configured,
    Running,
    Stopped,
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Uncreated => "uncreated",
            LifecycleState::Created => "created",
            LifecycleState::Configured => "configured",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Create,
    Configure,
    Start,
    Restart,
    Stop,
    /// Input, screencap and app management, all of which need a running instance
    Interact,
}

impl Display for LifecycleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleOp::Create => "create",
            LifecycleOp::Configure => "configure",
            LifecycleOp::Start => "start",
            LifecycleOp::Restart => "restart",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Interact => "interact",
        };
        f.write_str(s)
    }
}

impl LifecycleOp {
    /// The state reached by applying `self` in `from`, `None` if not allowed.
    pub fn target(self, from: LifecycleState) -> Option<LifecycleState> {
        use LifecycleState::*;

        match (self, from) {
            (LifecycleOp::Create, Uncreated | Stopped) => Some(Created),
            (LifecycleOp::Configure, Created | Configured | Stopped) => Some(Configured),
            (LifecycleOp::Start, Created | Configured | Stopped) => Some(Running),
            (LifecycleOp::Restart, Running | Stopped) => Some(Running),
            (LifecycleOp::Stop, Created | Configured | Running) => Some(Stopped),
            (LifecycleOp::Interact, Running) => Some(Running),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    /// Held across a whole [`Lifecycle::run`], transitions never interleave.
    transition: Mutex<()>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock()
    }

    /// Validate `op` against the current state without applying it.
    pub fn check(&self, op: LifecycleOp) -> Result<LifecycleState> {
        let state = self.state();
        op.target(state)
            .ok_or(ControllerError::InvalidLifecycle { op, state })
    }

    /// Validate `op`, run `f`, and move to the target state only if `f` succeeded.
    ///
    /// Concurrent transitions are serialized: a second `stop` racing the first
    /// sees `Stopped` and fails instead of running its side effects again.
    /// `f` may read the state but must not start another transition.
    pub fn run<T>(&self, op: LifecycleOp, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _transition = self
            .transition
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let target = self.check(op)?;
        let res = f()?;
        let mut state = self.lock();
        trace!("lifecycle: {} --{}--> {}", *state, op, target);
        *state = target;
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_ops_before_create_are_rejected() {
        let lifecycle = Lifecycle::new();
        for op in [
            LifecycleOp::Configure,
            LifecycleOp::Start,
            LifecycleOp::Restart,
            LifecycleOp::Stop,
            LifecycleOp::Interact,
        ] {
            let err = lifecycle.run(op, || Ok(())).unwrap_err();
            assert!(matches!(
                err,
                ControllerError::InvalidLifecycle {
                    state: LifecycleState::Uncreated,
                    ..
                }
            ));
        }
        assert_eq!(lifecycle.state(), LifecycleState::Uncreated);
    }

    #[test]
    fn test_full_lifecycle() {
        let lifecycle = Lifecycle::new();
        lifecycle.run(LifecycleOp::Create, || Ok(())).unwrap();
        lifecycle.run(LifecycleOp::Configure, || Ok(())).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Configured);
        lifecycle.run(LifecycleOp::Start, || Ok(())).unwrap();
        lifecycle.check(LifecycleOp::Interact).unwrap();
        lifecycle.run(LifecycleOp::Restart, || Ok(())).unwrap();
        lifecycle.run(LifecycleOp::Stop, || Ok(())).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);

        assert!(lifecycle.check(LifecycleOp::Interact).is_err());
        assert!(lifecycle.check(LifecycleOp::Stop).is_err());
        lifecycle.run(LifecycleOp::Restart, || Ok(())).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Running);
    }

    #[test]
    fn test_failed_op_keeps_state() {
        let lifecycle = Lifecycle::new();
        let res: Result<()> = lifecycle.run(LifecycleOp::Create, || {
            Err(ControllerError::Command {
                command: "adb connect".to_string(),
                reason: "refused".to_string(),
            })
        });
        assert!(res.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Uncreated);
    }

    #[test]
    fn test_concurrent_stops_tear_down_once() {
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.run(LifecycleOp::Create, || Ok(())).unwrap();
        lifecycle.run(LifecycleOp::Start, || Ok(())).unwrap();

        let disconnects = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));
        let handles = (0..2)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                let disconnects = Arc::clone(&disconnects);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    lifecycle.run(LifecycleOp::Stop, || {
                        thread::sleep(Duration::from_millis(100));
                        disconnects.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            })
            .collect::<Vec<_>>();
        let results = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
        assert!(results.iter().any(|res| matches!(
            res,
            Err(ControllerError::InvalidLifecycle {
                op: LifecycleOp::Stop,
                state: LifecycleState::Stopped,
            })
        )));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_state_readable_during_transition() {
        let lifecycle = Lifecycle::new();
        lifecycle.run(LifecycleOp::Create, || Ok(())).unwrap();
        lifecycle
            .run(LifecycleOp::Start, || {
                assert_eq!(lifecycle.state(), LifecycleState::Created);
                assert!(lifecycle.check(LifecycleOp::Interact).is_err());
                Ok(())
            })
            .unwrap();
        lifecycle.check(LifecycleOp::Interact).unwrap();
    }
}
