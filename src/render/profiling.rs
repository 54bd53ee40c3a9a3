use std::collections::BTreeMap;
use std::time::Duration;

use crate::render::kernel::SampleTiming;

/// Aggregated timing of one named scope over a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeTiming {
    /// Sum of all samples with this name.
    pub total: Duration,
    /// Number of samples.
    pub count: u32,
}

/// Frame-delayed profiling results.
///
/// Timings submitted during frame `N` only become readable after `begin_frame` starts frame
/// `N + 1`, the way GPU timestamp queries resolve a frame late.
#[derive(Clone, Debug, Default)]
pub struct Profiler {
    frame: u64,
    pending: Vec<SampleTiming>,
    visible: BTreeMap<String, ScopeTiming>,
    visible_frame: Option<u64>,
}

impl Profiler {
    /// Start a new frame, publishing the timings recorded during the previous one.
    pub fn begin_frame(&mut self) {
        if !self.pending.is_empty() || self.visible_frame.is_some() {
            self.visible.clear();
            for s in self.pending.drain(..) {
                let e = self.visible.entry(s.name).or_default();
                e.total += s.duration;
                e.count += 1;
            }
            self.visible_frame = Some(self.frame);
        }
        self.frame += 1;
    }

    /// Queue timings from a submit of the current frame.
    pub fn record(&mut self, timings: impl IntoIterator<Item = SampleTiming>) {
        self.pending.extend(timings);
    }

    /// Index of the current frame (number of `begin_frame` calls).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Frame whose timings are currently visible.
    pub fn visible_frame(&self) -> Option<u64> {
        self.visible_frame
    }

    /// Timing of a scope from the last published frame.
    pub fn scope(&self, name: &str) -> Option<ScopeTiming> {
        self.visible.get(name).copied()
    }

    /// All published scopes, sorted by name.
    pub fn scopes(&self) -> impl Iterator<Item = (&str, ScopeTiming)> {
        self.visible.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of timings waiting for the next frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
