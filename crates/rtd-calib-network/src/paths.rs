//! Lazy depth-first enumeration of calibration paths.

use rtd_calib_core::{SensorId, SetId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ParentLookup;

/// One hop `from → to` evaluated inside `set_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub set_id: SetId,
    pub from: SensorId,
    pub to: SensorId,
}

/// Route from a sensor in its origin set up to the anchor of the terminal set.
///
/// Each step lives in a set one round above the previous step. The last step
/// is always taken in the terminal set and ends at the anchor. The anchor
/// itself, seen from the terminal set, has an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub sensor: SensorId,
    pub origin: SetId,
    pub steps: Vec<PathStep>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sets traversed, origin first.
    pub fn sets(&self) -> impl Iterator<Item = SetId> + '_ {
        self.steps.iter().map(|s| s.set_id)
    }

    /// Pivots of the non-terminal steps, in order.
    pub fn pivots(&self) -> impl Iterator<Item = SensorId> + '_ {
        let n = self.steps.len().saturating_sub(1);
        self.steps[..n].iter().map(|s| s.to)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sensor)?;
        for step in &self.steps {
            write!(f, " -[{}]-> {}", step.set_id.raw(), step.to)?;
        }
        Ok(())
    }
}

/// Enumerate every path of `sensor` starting in `origin`.
///
/// Paths are produced lazily in depth-first order: pivots are visited in the
/// order of the parent links, which follow the raised list of each set.
/// Each call returns a fresh iterator, so enumeration can be restarted.
pub fn enumerate_paths<H: ParentLookup + ?Sized>(
    sensor: SensorId,
    origin: SetId,
    hierarchy: &H,
) -> Paths<'_, H> {
    let stack = if hierarchy.set(origin).is_some() {
        vec![Frame {
            set_id: origin,
            at: sensor,
            steps: Vec::new(),
        }]
    } else {
        Vec::new()
    };
    Paths {
        hierarchy,
        sensor,
        origin,
        stack,
    }
}

#[derive(Debug)]
struct Frame {
    set_id: SetId,
    at: SensorId,
    steps: Vec<PathStep>,
}

/// Iterator returned by [`enumerate_paths`].
pub struct Paths<'h, H: ?Sized> {
    hierarchy: &'h H,
    sensor: SensorId,
    origin: SetId,
    stack: Vec<Frame>,
}

impl<H: ParentLookup + ?Sized> Iterator for Paths<'_, H> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some(frame) = self.stack.pop() {
            if self.hierarchy.is_terminal(frame.set_id) {
                let anchor = self.hierarchy.anchor();
                let mut steps = frame.steps;
                if !(steps.is_empty() && frame.at == anchor) {
                    steps.push(PathStep {
                        set_id: frame.set_id,
                        from: frame.at,
                        to: anchor,
                    });
                }
                return Some(Path {
                    sensor: self.sensor,
                    origin: self.origin,
                    steps,
                });
            }

            // Push in reverse so the first pivot is explored first.
            let links = self.hierarchy.parents_of(frame.set_id);
            for link in links.iter().rev() {
                for &pivot in link.pivots.iter().rev() {
                    let mut steps = Vec::with_capacity(frame.steps.len() + 1);
                    steps.extend_from_slice(&frame.steps);
                    steps.push(PathStep {
                        set_id: frame.set_id,
                        from: frame.at,
                        to: pivot,
                    });
                    self.stack.push(Frame {
                        set_id: link.parent,
                        at: pivot,
                        steps,
                    });
                }
            }
        }
        None
    }
}
