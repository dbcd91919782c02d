use crate::{SynthError, TimeStamp, MIN_TIME};

/*
Parameter Automation
====================

A gain stage in a voice is driven by a list of timestamped events rather than
by a per-sample state machine. Control code writes events ahead of time
("reach this level at t = 2.4"), and the render loop simply asks the curve
for its value at each frame's timestamp. Nothing here reads a clock: every
call takes the time it is about.

Event Kinds
-----------

  SetValue     Jump to `value` at `time` and hold it.

  LinearRamp   Move in a straight line from the previous event's value (at
               the previous event's time) to `value` at `end_time`.

  SetTarget    Starting at `start_time`, approach `target` exponentially:

                   v(t) = target + (v0 - target) * e^(-(t - start) / tau)

               where v0 is the curve's value at `start_time`. The curve gets
               close to the target but never lands on it, which is fine:
               only monotonic proximity matters to the ear.


Why Exponential Approaches
--------------------------

    Level
      │         ╭──────────────      linear ramps meet at corners: the
      │       ╭─╯                    slope jumps, and a slope jump on a
      │     ╭─╯                      gain envelope is an audible click
      │   ╭─╯
      │  ╱
      └─╱─────────────────────→ t

An exponential approach starts from wherever the previous segment left off
and bends smoothly toward its target, so retargeting mid-flight (release
during attack) stays continuous.


Cancelling
----------

  cancel_scheduled_values(t)  Drop every event at or after t.

  cancel_and_hold(t)          Sample the curve at t, drop events at or after
                              t, and pin the sampled value at t. If a linear
                              ramp was in flight it is shortened to end at t
                              on that value, so the frames before t still
                              ramp instead of jumping.


Realtime Safety
---------------

Events live in a Vec preallocated to MAX_AUTOMATION_EVENTS. Inserting beyond
capacity is refused with SynthError::AutomationFull instead of reallocating.
The render loop calls `discard_before` once per block to fold past events
into a single anchor, which keeps both the list and the per-frame evaluation
short.
*/

pub const MAX_AUTOMATION_EVENTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    SetValue {
        value: f32,
        time: TimeStamp,
    },
    LinearRamp {
        value: f32,
        end_time: TimeStamp,
    },
    SetTarget {
        target: f32,
        start_time: TimeStamp,
        time_constant: f64,
    },
}

impl AutomationEvent {
    pub fn time(&self) -> TimeStamp {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::LinearRamp { end_time, .. } => end_time,
            AutomationEvent::SetTarget { start_time, .. } => start_time,
        }
    }
}

/// Curve state after folding a prefix of the event list.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    time: TimeStamp,
    value: f32,
    approach: Option<(f32, f64)>,
}

impl Anchor {
    fn eval(&self, t: TimeStamp) -> f32 {
        match self.approach {
            Some((target, time_constant)) => {
                let elapsed = (t - self.time).max(0.0);
                target + (self.value - target) * (-elapsed / time_constant).exp() as f32
            }
            None => self.value,
        }
    }

    fn fold(self, event: &AutomationEvent) -> Anchor {
        match *event {
            AutomationEvent::SetValue { value, time } => Anchor {
                time,
                value,
                approach: None,
            },
            AutomationEvent::LinearRamp { value, end_time } => Anchor {
                time: end_time,
                value,
                approach: None,
            },
            AutomationEvent::SetTarget {
                target,
                start_time,
                time_constant,
            } => Anchor {
                time: start_time,
                value: self.eval(start_time),
                approach: Some((target, time_constant)),
            },
        }
    }
}

/// Timestamped automation for a single scalar parameter.
#[derive(Debug, Clone)]
pub struct AutomationCurve {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationCurve {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::with_capacity(MAX_AUTOMATION_EVENTS),
        }
    }

    /// Drop every event and restart from `default_value`, keeping capacity.
    pub fn reset(&mut self, default_value: f32) {
        self.default_value = default_value;
        self.events.clear();
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn set_value_at(&mut self, value: f32, time: TimeStamp) -> Result<(), SynthError> {
        self.insert(AutomationEvent::SetValue { value, time })
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: TimeStamp) -> Result<(), SynthError> {
        self.insert(AutomationEvent::LinearRamp { value, end_time })
    }

    /// Exponential approach toward `target`. Non-positive time constants are
    /// raised to one frame at 48 kHz.
    pub fn set_target_at(
        &mut self,
        target: f32,
        start_time: TimeStamp,
        time_constant: f64,
    ) -> Result<(), SynthError> {
        self.insert(AutomationEvent::SetTarget {
            target,
            start_time,
            time_constant: time_constant.max(MIN_TIME),
        })
    }

    /// Events with equal timestamps keep their insertion order.
    fn insert(&mut self, event: AutomationEvent) -> Result<(), SynthError> {
        if self.events.len() >= MAX_AUTOMATION_EVENTS {
            return Err(SynthError::AutomationFull {
                capacity: MAX_AUTOMATION_EVENTS,
            });
        }
        let time = event.time();
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
        Ok(())
    }

    pub fn cancel_scheduled_values(&mut self, time: TimeStamp) {
        let keep = self.events.partition_point(|e| e.time() < time);
        self.events.truncate(keep);
    }

    /// Returns the level that was pinned at `time`.
    pub fn cancel_and_hold(&mut self, time: TimeStamp) -> Result<f32, SynthError> {
        let held = self.value_at(time);
        let keep = self.events.partition_point(|e| e.time() < time);
        let ramp_in_flight = keep > 0
            && matches!(
                self.events.get(keep),
                Some(AutomationEvent::LinearRamp { end_time, .. }) if *end_time > time
            );
        self.events.truncate(keep);

        if ramp_in_flight {
            self.linear_ramp_to(held, time)?;
        } else {
            self.set_value_at(held, time)?;
        }
        Ok(held)
    }

    fn anchor_after(&self, count: usize) -> Anchor {
        let initial = Anchor {
            time: f64::NEG_INFINITY,
            value: self.default_value,
            approach: None,
        };
        self.events[..count]
            .iter()
            .fold(initial, |anchor, event| anchor.fold(event))
    }

    /// Evaluate the curve at `t`.
    pub fn value_at(&self, t: TimeStamp) -> f32 {
        let past = self.events.partition_point(|e| e.time() <= t);
        let anchor = self.anchor_after(past);

        if let Some(AutomationEvent::LinearRamp { value, end_time }) = self.events.get(past) {
            // Without a preceding event there is no start point; hold until the end.
            let span = end_time - anchor.time;
            if anchor.time.is_finite() && span > 0.0 {
                let progress = ((t - anchor.time) / span) as f32;
                return anchor.value + (value - anchor.value) * progress;
            }
        }

        anchor.eval(t)
    }

    /// Fold every event at or before `time` into an equivalent anchor.
    ///
    /// Evaluation at or after `time` is unchanged.
    pub fn discard_before(&mut self, time: TimeStamp) {
        let past = self.events.partition_point(|e| e.time() <= time);
        if past < 2 {
            return;
        }

        let anchor = self.anchor_after(past);
        let hold = AutomationEvent::SetValue {
            value: anchor.value,
            time: anchor.time,
        };

        match self.events[past - 1] {
            target @ AutomationEvent::SetTarget { .. } => {
                if past > 2 {
                    self.events.drain(..past - 2);
                }
                self.events[0] = hold;
                self.events[1] = target;
            }
            _ => {
                self.events.drain(..past - 1);
                self.events[0] = hold;
            }
        }
    }
}
