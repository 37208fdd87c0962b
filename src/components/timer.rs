//! Repeating script timer.
//!
//! Counts milliseconds and reports each time its interval elapses so the
//! owner can queue `script` with the scripting collaborator.

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptTimer {
    pub interval_ms: f32,
    pub elapsed_ms: f32,
    pub script: String,
}

impl ScriptTimer {
    pub fn new(interval_ms: f32, script: impl Into<String>) -> Self {
        ScriptTimer {
            interval_ms,
            elapsed_ms: 0.0,
            script: script.into(),
        }
    }

    /// Add `delta_ms`; true when the interval was reached. The remainder
    /// carries over so long runs do not drift.
    pub fn tick(&mut self, delta_ms: f32) -> bool {
        if self.interval_ms <= 0.0 {
            return false;
        }
        self.elapsed_ms += delta_ms;
        if self.elapsed_ms >= self.interval_ms {
            self.elapsed_ms -= self.interval_ms;
            // A huge delta fires once, not once per interval covered.
            if self.elapsed_ms >= self.interval_ms {
                self.elapsed_ms = 0.0;
            }
            return true;
        }
        false
    }
}
