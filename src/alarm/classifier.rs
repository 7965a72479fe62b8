use std::collections::BTreeSet;

use crate::detect::GatedDetection;

/// Class ids that can raise the alarm.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlarmClassSet {
    classes: BTreeSet<u32>,
}

impl AlarmClassSet {
    pub fn new<I: IntoIterator<Item = u32>>(classes: I) -> Self {
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.classes.contains(&class_id)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.classes.iter().copied()
    }

    /// True when any detection of an alarm class is inside the region, or any
    /// alarm-class detection at all when gating is off.
    pub fn classify(&self, detections: &[GatedDetection], gating_enabled: bool) -> bool {
        detections
            .iter()
            .any(|d| self.contains(d.class_id()) && (d.inside || !gating_enabled))
    }
}

impl FromIterator<u32> for AlarmClassSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};

    fn gated(class_id: u32, inside: bool) -> GatedDetection {
        GatedDetection {
            detection: Detection {
                class_id,
                confidence: 0.7,
                bbox: BoundingBox::new(0, 0, 10, 10),
            },
            containment: if inside { 1.0 } else { 0.0 },
            inside,
        }
    }

    #[test]
    fn empty_batch_never_alarms() {
        let set = AlarmClassSet::new([0, 1]);
        assert!(!set.classify(&[], true));
        assert!(!set.classify(&[], false));
    }

    #[test]
    fn alarm_requires_alarm_class_inside() {
        let set = AlarmClassSet::new([0, 1]);

        assert!(set.classify(&[gated(0, true)], true));
        assert!(set.classify(&[gated(2, true), gated(1, true)], true));
        // Background class inside, hand outside.
        assert!(!set.classify(&[gated(2, true), gated(0, false)], true));
    }

    #[test]
    fn disabled_gating_ignores_inside_flag() {
        let set = AlarmClassSet::new([1]);
        assert!(set.classify(&[gated(1, false)], false));
        assert!(!set.classify(&[gated(0, false)], false));
    }

    #[test]
    fn duplicate_and_unordered_classes_collapse() {
        let set: AlarmClassSet = [1, 0, 1].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 1]);
    }
}
