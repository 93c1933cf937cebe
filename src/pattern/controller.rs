use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::segment::SegmentSequence;

use crate::utils::sync::{lock, read, write};

use super::tags::{PhaseTag, PhaseTagList};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RebuildState {
    Idle,
    Rebuilding,
}

impl Default for RebuildState {
    fn default() -> Self {
        RebuildState::Idle
    }
}

pub type RebuildListener = Arc<dyn Fn(&SegmentSequence) + Send + Sync>;

/// Held for the duration of one mutation and its rebuild. Dropping it returns
/// the controller to `Idle`, whichever way the mutation exits.
pub struct RebuildGuard {
    state: Arc<Mutex<RebuildState>>,
}

impl Drop for RebuildGuard {
    fn drop(&mut self) {
        *lock(&self.state) = RebuildState::Idle;
    }
}

struct PatternInner {
    tags: PhaseTagList,
    current: SegmentSequence,
}

/// Owns the phase tag list and the segment sequence compiled from it.
#[derive(Clone)]
pub struct PatternController {
    inner: Arc<Mutex<PatternInner>>,
    rebuild: Arc<Mutex<RebuildState>>,
    listeners: Arc<RwLock<Vec<RebuildListener>>>,
}

impl PatternController {
    pub fn new() -> Self {
        Self::with_tags(PhaseTagList::new())
    }

    pub fn with_tags(tags: PhaseTagList) -> Self {
        let current = tags.segments();
        Self {
            inner: Arc::new(Mutex::new(PatternInner { tags, current })),
            rebuild: Arc::new(Mutex::new(RebuildState::Idle)),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Registers a callback run after every rebuild, while the rebuild guard
    /// is still held.
    pub fn on_rebuild<F>(&self, listener: F)
    where
        F: Fn(&SegmentSequence) + Send + Sync + 'static,
    {
        write(&self.listeners).push(Arc::new(listener));
    }

    pub fn rebuild_state(&self) -> RebuildState {
        *lock(&self.rebuild)
    }

    /// Check-and-set `Idle -> Rebuilding`. `None` while another rebuild runs.
    pub fn try_begin_rebuild(&self) -> Option<RebuildGuard> {
        let mut state = lock(&self.rebuild);
        if *state == RebuildState::Rebuilding {
            return None;
        }
        *state = RebuildState::Rebuilding;
        Some(RebuildGuard {
            state: Arc::clone(&self.rebuild),
        })
    }

    pub fn tags(&self) -> Vec<PhaseTag> {
        lock(&self.inner).tags.tags()
    }

    pub fn tag_list(&self) -> PhaseTagList {
        lock(&self.inner).tags.clone()
    }

    pub fn current_segments(&self) -> SegmentSequence {
        lock(&self.inner).current.clone()
    }

    pub fn add_phase_from_input(&self, input: &str) -> Option<PhaseTag> {
        self.mutate("add phase", |tags| tags.add_phase_from_input(input))
    }

    pub fn push_phase(&self, duration_ms: u64) -> Option<PhaseTag> {
        self.mutate("add phase", |tags| tags.push_phase(duration_ms))
    }

    pub fn remove_phase(&self, index: usize) -> bool {
        self.mutate("remove phase", |tags| tags.remove_phase(index).then_some(()))
            .is_some()
    }

    pub fn invert(&self) -> bool {
        self.mutate("invert", |tags| {
            if tags.is_empty() {
                return None;
            }
            tags.invert();
            Some(())
        })
        .is_some()
    }

    pub fn set_duration(&self, index: usize, input: &str) -> bool {
        self.mutate("edit duration", |tags| {
            tags.set_duration(index, input).then_some(())
        })
        .is_some()
    }

    pub fn clear(&self) -> bool {
        self.mutate("clear", |tags| {
            tags.clear();
            Some(())
        })
        .is_some()
    }

    /// Swaps in a whole list, e.g. one loaded from the gateway.
    pub fn replace(&self, list: PhaseTagList) -> bool {
        self.mutate("replace", move |tags| {
            *tags = list;
            Some(())
        })
        .is_some()
    }

    fn mutate<R>(&self, op: &str, apply: impl FnOnce(&mut PhaseTagList) -> Option<R>) -> Option<R> {
        let Some(_guard) = self.try_begin_rebuild() else {
            log_warn!("{op} ignored: pattern rebuild already in progress");
            return None;
        };

        let (result, snapshot) = {
            let mut inner = lock(&self.inner);
            let result = apply(&mut inner.tags)?;
            inner.current = inner.tags.segments();
            (result, inner.current.clone())
        };

        log_debug!(
            "{op}: rebuilt {} segments, {} ms",
            snapshot.len(),
            snapshot.total_duration()
        );

        let listeners: Vec<RebuildListener> = read(&self.listeners).clone();
        for listener in listeners {
            listener(&snapshot);
        }

        Some(result)
    }
}

impl Default for PatternController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Level, Segment};
    use pretty_assertions::assert_eq;

    #[test]
    fn every_mutation_rebuilds_the_sequence() {
        let controller = PatternController::new();
        controller.push_phase(100);
        controller.push_phase(50);
        controller.push_phase(30);
        assert_eq!(controller.current_segments().total_duration(), 180);

        assert!(controller.remove_phase(1));
        assert_eq!(
            controller.current_segments().segments(),
            &[Segment::high(130)]
        );

        assert!(controller.invert());
        assert_eq!(controller.current_segments().first_level(), Some(Level::Low));

        assert!(controller.clear());
        assert!(controller.current_segments().is_empty());
        assert_eq!(controller.rebuild_state(), RebuildState::Idle);
    }

    #[test]
    fn listeners_see_each_rebuild() {
        let controller = PatternController::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.on_rebuild(move |seq| sink.lock().unwrap().push(seq.total_duration()));

        controller.add_phase_from_input("100");
        controller.add_phase_from_input("nope");
        controller.set_duration(0, "40");

        assert_eq!(*seen.lock().unwrap(), vec![100, 40]);
    }

    #[test]
    fn reentrant_mutation_is_rejected_and_guard_released() {
        let controller = PatternController::new();
        let nested = Arc::new(Mutex::new(Vec::new()));
        let (inner_controller, sink) = (controller.clone(), Arc::clone(&nested));
        controller.on_rebuild(move |_| {
            assert_eq!(inner_controller.rebuild_state(), RebuildState::Rebuilding);
            sink.lock()
                .unwrap()
                .push(inner_controller.push_phase(1).is_some());
        });

        assert!(controller.push_phase(100).is_some());
        assert_eq!(*nested.lock().unwrap(), vec![false]);
        assert_eq!(controller.rebuild_state(), RebuildState::Idle);
        assert_eq!(controller.tags().len(), 1);
    }

    #[test]
    fn rejected_mutations_release_the_guard() {
        let controller = PatternController::new();
        assert!(!controller.remove_phase(0));
        assert!(!controller.invert());
        assert_eq!(controller.add_phase_from_input("-1"), None);
        assert_eq!(controller.rebuild_state(), RebuildState::Idle);
        assert!(controller.try_begin_rebuild().is_some());
    }

    #[test]
    fn guard_blocks_mutations_while_held() {
        let controller = PatternController::new();
        let guard = controller.try_begin_rebuild().unwrap();
        assert!(controller.try_begin_rebuild().is_none());
        assert_eq!(controller.push_phase(10), None);
        drop(guard);
        assert!(controller.push_phase(10).is_some());
    }

    #[test]
    fn invert_twice_restores_sequence() {
        let controller = PatternController::new();
        for d in [100, 50, 200] {
            controller.push_phase(d);
        }
        let before = controller.current_segments();
        controller.invert();
        controller.invert();
        assert_eq!(controller.current_segments(), before);
    }
}
