use std::collections::HashMap;

/// At most this many values get highlight labels per pass.
pub const INTERESTING_LIMIT: usize = 32;

struct ValueObservation {
    count: usize,
    /// `<originating variable name><frame index>`, from the first sighting.
    display_name: String,
    /// Insertion sequence, the tie-breaker when counts are equal.
    order: usize,
}

/// A repeated value selected for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestingValue {
    pub label: String,
    /// Rank among the selected set, 0-based; stable for the whole pass.
    pub highlight: usize,
}

/// Counts pointer-shaped values across all frames of one pass and, once
/// finalized, hands out stable highlight labels for the most repeated ones.
#[derive(Default)]
pub struct ValueCorrelator {
    seen: HashMap<String, ValueObservation>,
    interesting: HashMap<String, InterestingValue>,
}

/// Only values that look like hex literals take part in correlation.
fn pointer_shaped(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next() == Some('0') && matches!(chars.next(), Some('x') | Some('X'))
}

impl ValueCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one resolved local/argument value. Non-pointer-shaped values
    /// are ignored; this never fails.
    pub fn consider_value(&mut self, frame_index: usize, name: &str, value: &str) {
        if !pointer_shaped(value) {
            return;
        }
        let order = self.seen.len();
        let obs = self
            .seen
            .entry(value.to_string())
            .or_insert_with(|| ValueObservation {
                count: 0,
                display_name: format!("{}{}", name, frame_index),
                order,
            });
        obs.count += 1;
    }

    /// Select the top observations by count (ties broken by first-seen
    /// order) and assign highlight indices. Call exactly once, after the
    /// build pass; singletons never qualify.
    pub fn finalize(&mut self) {
        let mut eligible: Vec<(&String, &ValueObservation)> =
            self.seen.iter().filter(|(_, o)| o.count > 1).collect();
        eligible.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.1.order.cmp(&b.1.order)));
        for (highlight, (value, obs)) in eligible.into_iter().take(INTERESTING_LIMIT).enumerate() {
            self.interesting.insert(
                value.clone(),
                InterestingValue {
                    label: obs.display_name.clone(),
                    highlight,
                },
            );
        }
    }

    /// Usable only after `finalize`.
    pub fn is_interesting(&self, value: &str) -> bool {
        self.interesting.contains_key(value)
    }

    /// Usable only after `finalize`.
    pub fn info(&self, value: &str) -> Option<&InterestingValue> {
        self.interesting.get(value)
    }
}
