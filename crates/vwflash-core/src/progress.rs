//! Progress relay between transfer collaborators and the caller's display

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One status update from a transfer pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Coarse state name (e.g. "ERASING")
    pub phase: String,
    /// Human-readable status line
    pub status_message: String,
    /// Completion percentage, 0.0 - 100.0
    pub percent_complete: f64,
}

/// Caller-supplied display that can only move forward.
///
/// `delta` is how far to advance since the previous call; it is never
/// negative.
pub trait ProgressSink {
    fn advance(&mut self, delta: f64, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, &ProgressEvent),
{
    fn advance(&mut self, delta: f64, event: &ProgressEvent) {
        self(delta, event)
    }
}

/// Turns absolute percentages from a collaborator into deltas for a sink.
///
/// Holds the last percentage observed; a fresh relay is created for every
/// pipeline invocation.
pub struct ProgressRelay<'a> {
    sink: &'a mut dyn ProgressSink,
    last_percent: f64,
    events: usize,
}

impl<'a> ProgressRelay<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            last_percent: 0.0,
            events: 0,
        }
    }

    /// Report a status update. Called by transfer collaborators.
    pub fn report(&mut self, phase: &str, status_message: &str, percent_complete: f64) {
        let percent = if percent_complete.is_nan() {
            self.last_percent
        } else {
            percent_complete.clamp(0.0, 100.0)
        };

        let delta = if percent < self.last_percent {
            warn!(
                phase,
                previous = self.last_percent,
                reported = percent,
                "Progress went backwards"
            );
            0.0
        } else {
            let delta = percent - self.last_percent;
            self.last_percent = percent;
            delta
        };

        debug!(phase, percent, "{}", status_message);
        self.events += 1;

        let event = ProgressEvent {
            phase: phase.to_string(),
            status_message: status_message.to_string(),
            percent_complete: percent,
        };
        self.sink.advance(delta, &event);
    }

    /// Highest percentage observed so far
    pub fn last_percent(&self) -> f64 {
        self.last_percent
    }

    /// Number of updates relayed
    pub fn events(&self) -> usize {
        self.events
    }

    /// Close out the relay after a successful transfer
    pub fn finish(self) -> f64 {
        if self.last_percent < 100.0 {
            warn!(
                last = self.last_percent,
                "Transfer finished without reporting 100%"
            );
        }
        self.last_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        deltas: Vec<f64>,
        phases: Vec<String>,
    }

    impl ProgressSink for Recorder {
        fn advance(&mut self, delta: f64, event: &ProgressEvent) {
            self.deltas.push(delta);
            self.phases.push(event.phase.clone());
        }
    }

    #[test]
    fn test_deltas_from_absolute_percent() {
        let mut rec = Recorder::default();
        let mut relay = ProgressRelay::new(&mut rec);
        relay.report("SETUP", "Connecting", 5.0);
        relay.report("TRANSFER", "Block 1", 50.0);
        relay.report("TRANSFER", "Block 1", 50.0);
        relay.report("DONE", "Complete", 100.0);
        assert_eq!(relay.events(), 4);
        assert_eq!(relay.finish(), 100.0);

        assert_eq!(rec.deltas, vec![5.0, 45.0, 0.0, 50.0]);
        assert_eq!(rec.phases, vec!["SETUP", "TRANSFER", "TRANSFER", "DONE"]);
    }

    #[test]
    fn test_regression_is_not_forwarded() {
        let mut rec = Recorder::default();
        let mut relay = ProgressRelay::new(&mut rec);
        relay.report("A", "", 40.0);
        relay.report("B", "", 30.0);
        relay.report("C", "", 60.0);
        assert_eq!(relay.last_percent(), 60.0);
        drop(relay);

        assert_eq!(rec.deltas, vec![40.0, 0.0, 20.0]);
        assert_eq!(rec.deltas.iter().sum::<f64>(), 60.0);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let mut total = 0.0;
        let mut sink = |delta: f64, _: &ProgressEvent| total += delta;
        let mut relay = ProgressRelay::new(&mut sink);
        relay.report("A", "", -10.0);
        relay.report("B", "", 250.0);
        relay.report("C", "", f64::NAN);
        assert_eq!(relay.finish(), 100.0);
        assert_eq!(total, 100.0);
    }
}
