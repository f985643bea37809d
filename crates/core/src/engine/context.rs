use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::visual::{Emissive, Scale, Vec3};
use crate::envelope::EnvelopePhase;
use crate::midi::{MidiBlock, MidiNote};

/// Opaque per-instance payload returned by a generator. Children can read
/// their own instance data and walk up to their ancestors', never the
/// reverse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceData {
    values: BTreeMap<String, Value>,
}

impl InstanceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Attributes already resolved for an instance. Filled in mapper order and
/// exposed read-only to later mappers of the same level and to child levels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculatedProperties {
    pub object_type: String,
    pub position: Option<Vec3>,
    pub scale: Option<Scale>,
    pub rotation: Option<Vec3>,
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub emissive: Option<Emissive>,
}

impl CalculatedProperties {
    pub fn has_geometry(&self) -> bool {
        self.position.is_some() || self.scale.is_some()
    }
}

/// Everything a mapper or generator can see about one instance at one level.
///
/// Contexts form a singly linked chain from child to parent that lives only
/// for the duration of one evaluation.
#[derive(Debug, Clone)]
pub struct MappingContext<'a> {
    pub note: &'a MidiNote,
    pub block: &'a MidiBlock,
    pub level: usize,
    pub instance_index: usize,
    pub instance_count: usize,

    /// Current time in seconds and beats.
    pub time: f64,
    pub time_beats: f64,
    pub bpm: f64,

    /// Absolute note start/end in seconds.
    pub note_start_time: f64,
    pub note_end_time: f64,
    pub note_duration: f64,

    /// Negative while approaching.
    pub time_since_note_start: f64,
    /// 0..=1 over the held part of the note, 0 while approaching.
    pub note_progress_percent: f64,
    /// Set only while inside the approach window.
    pub time_until_note_start: Option<f64>,

    pub adsr_amplitude: f64,
    pub adsr_phase: EnvelopePhase,
    pub physics_value: f64,

    pub instance_data: InstanceData,
    pub parent: Option<&'a MappingContext<'a>>,
    pub calculated: CalculatedProperties,
}

impl<'a> MappingContext<'a> {
    pub fn is_approaching(&self) -> bool {
        self.time_until_note_start.is_some()
    }

    /// Walk the parent chain; the closest ancestor is first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a MappingContext<'a>> {
        std::iter::successors(self.parent, |ctx| ctx.parent)
    }

    /// Look up an instance-data key on this instance or the nearest ancestor
    /// that has it.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.instance_data
            .get(key)
            .or_else(|| self.ancestors().find_map(|ctx| ctx.instance_data.get(key)))
    }

    /// The parent's resolved position, or the origin at level 1.
    pub fn parent_position(&self) -> Vec3 {
        self.parent
            .and_then(|p| p.calculated.position)
            .unwrap_or([0.0, 0.0, 0.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(
        note: &'a MidiNote,
        block: &'a MidiBlock,
        parent: Option<&'a MappingContext<'a>>,
    ) -> MappingContext<'a> {
        MappingContext {
            note,
            block,
            level: parent.map_or(1, |p| p.level + 1),
            instance_index: 0,
            instance_count: 1,
            time: 0.0,
            time_beats: 0.0,
            bpm: 120.0,
            note_start_time: 0.0,
            note_end_time: 1.0,
            note_duration: 1.0,
            time_since_note_start: 0.0,
            note_progress_percent: 0.0,
            time_until_note_start: None,
            adsr_amplitude: 0.0,
            adsr_phase: EnvelopePhase::Idle,
            physics_value: 0.0,
            instance_data: InstanceData::new(),
            parent,
            calculated: CalculatedProperties::default(),
        }
    }

    #[test]
    fn test_lookup_walks_ancestors() {
        let note = MidiNote::new("n", 0.0, 1.0, 60, 100);
        let block = MidiBlock::new("b", 0.0, 4.0, vec![]);

        let mut root = context(&note, &block, None);
        root.instance_data = InstanceData::new().with("hue", 0.3);
        root.calculated.position = Some([1.0, 2.0, 3.0]);

        let mut child = context(&note, &block, Some(&root));
        child.instance_data = InstanceData::new().with("ring", 2);

        let grandchild = context(&note, &block, Some(&child));

        assert_eq!(grandchild.level, 3);
        assert_eq!(grandchild.ancestors().count(), 2);
        assert_eq!(grandchild.lookup("ring").and_then(Value::as_u64), Some(2));
        assert_eq!(grandchild.lookup("hue").and_then(Value::as_f64), Some(0.3));
        assert!(grandchild.lookup("missing").is_none());
        assert_eq!(child.parent_position(), [1.0, 2.0, 3.0]);
        assert_eq!(root.parent_position(), [0.0, 0.0, 0.0]);
    }
}
