//! Execution control flags shared between the REPL and the todo batch loop.
//!
//! The flags are plain atomics polled at well-defined check points (between
//! items and inside the pause wait); control never travels through thread
//! interruption or unwinding.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Stopped,
    Running,
    Paused,
    Cancelled,
}

impl ExecutionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ExecutionState::Running,
            2 => ExecutionState::Paused,
            3 => ExecutionState::Cancelled,
            _ => ExecutionState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ExecutionState::Stopped => 0,
            ExecutionState::Running => 1,
            ExecutionState::Paused => 2,
            ExecutionState::Cancelled => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Stopped => "STOPPED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Paused => "PAUSED",
            ExecutionState::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionControls {
    state: AtomicU8,
    should_stop: AtomicBool,
    should_pause: AtomicBool,
}

impl ExecutionControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: ExecutionState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    pub fn should_pause(&self) -> bool {
        self.should_pause.load(Ordering::SeqCst)
    }

    /// Arm the batch loop: Running, with both flags cleared.
    pub fn begin_run(&self) {
        self.should_stop.store(false, Ordering::SeqCst);
        self.should_pause.store(false, Ordering::SeqCst);
        self.set_state(ExecutionState::Running);
    }

    /// Reset to Stopped after a batch finishes, preserving a Cancelled state
    /// so the status display can report it.
    pub fn finish_run(&self) {
        if self.state() != ExecutionState::Cancelled {
            self.set_state(ExecutionState::Stopped);
        }
        self.should_stop.store(false, Ordering::SeqCst);
        self.should_pause.store(false, Ordering::SeqCst);
    }

    /// Returns false with no effect unless currently Running.
    pub fn request_pause(&self) -> bool {
        if self.state() != ExecutionState::Running {
            return false;
        }
        self.should_pause.store(true, Ordering::SeqCst);
        self.set_state(ExecutionState::Paused);
        true
    }

    /// Returns false with no effect unless currently Paused.
    pub fn request_resume(&self) -> bool {
        if self.state() != ExecutionState::Paused {
            return false;
        }
        self.should_pause.store(false, Ordering::SeqCst);
        self.set_state(ExecutionState::Running);
        true
    }

    /// Returns false with no effect unless Running or Paused.
    pub fn request_stop(&self) -> bool {
        if !matches!(
            self.state(),
            ExecutionState::Running | ExecutionState::Paused
        ) {
            return false;
        }
        self.should_stop.store(true, Ordering::SeqCst);
        self.should_pause.store(false, Ordering::SeqCst);
        self.set_state(ExecutionState::Stopped);
        true
    }

    /// Same mechanics as stop; the difference is in reporting.
    pub fn request_cancel(&self) -> bool {
        if !matches!(
            self.state(),
            ExecutionState::Running | ExecutionState::Paused
        ) {
            return false;
        }
        self.should_stop.store(true, Ordering::SeqCst);
        self.should_pause.store(false, Ordering::SeqCst);
        self.set_state(ExecutionState::Cancelled);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_resume_cycle() {
        let controls = ExecutionControls::new();
        controls.begin_run();
        assert_eq!(controls.state(), ExecutionState::Running);

        assert!(controls.request_pause());
        assert_eq!(controls.state(), ExecutionState::Paused);
        assert!(controls.should_pause());

        assert!(controls.request_resume());
        assert_eq!(controls.state(), ExecutionState::Running);
        assert!(!controls.should_pause());
    }

    #[test]
    fn test_stop_from_paused() {
        let controls = ExecutionControls::new();
        controls.begin_run();
        controls.request_pause();

        assert!(controls.request_stop());
        assert!(controls.should_stop());
        assert_eq!(controls.state(), ExecutionState::Stopped);
    }

    #[test]
    fn test_controls_are_noops_when_idle() {
        let controls = ExecutionControls::new();
        assert!(!controls.request_pause());
        assert!(!controls.request_resume());
        assert!(!controls.request_stop());
        assert!(!controls.request_cancel());
        assert_eq!(controls.state(), ExecutionState::Stopped);
    }

    #[test]
    fn test_cancel_is_reported_after_finish() {
        let controls = ExecutionControls::new();
        controls.begin_run();
        assert!(controls.request_cancel());
        controls.finish_run();
        assert_eq!(controls.state(), ExecutionState::Cancelled);
    }
}
