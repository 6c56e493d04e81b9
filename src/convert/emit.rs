//! Flattens the frame-keyed timelines into VMD frame lists.
//!
//! A recorded value holds until one frame before the next recorded change:
//! each frame is emitted where it was recorded, and re-emitted at
//! `next_frame - 1` when the following record leaves a gap. The last record
//! is emitted once with no forward hold; the consuming tool continues the
//! motion indefinitely on its own.

use crate::convert::glow::GlowSet;
use crate::convert::light::LightSet;
use crate::vmd::{VmdBoneFrame, VmdMorphFrame};
use std::collections::BTreeMap;

/// Expands one timeline into its emission points, applying the hold rule.
fn emit_points<V>(timeline: &BTreeMap<u32, V>) -> Vec<(u32, &V)> {
    let mut points = Vec::with_capacity(timeline.len() * 2);
    let mut records = timeline.iter().peekable();
    while let Some((&frame, value)) = records.next() {
        points.push((frame, value));
        if let Some(&(&next, _)) = records.peek()
            && next != frame + 1
        {
            points.push((next - 1, value));
        }
    }
    points
}

/// One morph frame per (emission point, parameter). Ordering across names is
/// left to the writer.
pub fn morph_frames(morphs: &BTreeMap<u32, GlowSet>) -> Vec<VmdMorphFrame> {
    let mut frames = Vec::new();
    for (frame, set) in emit_points(morphs) {
        for (name, weight) in set {
            frames.push(VmdMorphFrame {
                frame,
                name: name.clone(),
                weight: *weight,
            });
        }
    }
    frames
}

/// One bone frame per (emission point, light bone). Physics stays enabled on
/// every frame; these bones never simulate.
pub fn bone_frames(bones: &BTreeMap<u32, LightSet>) -> Vec<VmdBoneFrame> {
    let mut frames = Vec::new();
    for (frame, set) in emit_points(bones) {
        for (name, transform) in set {
            frames.push(VmdBoneFrame {
                frame,
                name: name.clone(),
                position: transform.position,
                rotation: transform.rotation,
                phys_off: false,
            });
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::{bone_frames, morph_frames};
    use crate::convert::glow::GlowSet;
    use crate::convert::light::{LightSet, LightTransform};
    use std::collections::BTreeMap;

    fn glow_at(frames: &[(u32, f32)]) -> BTreeMap<u32, GlowSet> {
        frames
            .iter()
            .map(|&(frame, v)| {
                let mut set = GlowSet::default();
                set.insert("Exposure +".to_string(), v);
                (frame, set)
            })
            .collect()
    }

    #[test]
    fn gap_duplicates_value_one_frame_before_next_change() {
        let timeline = glow_at(&[(10, 1.0), (15, 2.0)]);
        let mut emitted: Vec<(u32, f32)> =
            morph_frames(&timeline).iter().map(|f| (f.frame, f.weight)).collect();
        emitted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(
            emitted,
            vec![(10, 1.0), (14, 1.0), (15, 2.0)],
            "frame 10 holds through 14; the final record has no forward hold"
        );
    }

    #[test]
    fn adjacent_records_emit_no_hold_frames() {
        let timeline = glow_at(&[(5, 1.0), (6, 2.0)]);
        let frames = morph_frames(&timeline);
        assert_eq!(frames.len(), 2, "a one-frame step needs no duplicate");
    }

    #[test]
    fn single_record_emits_exactly_once() {
        let timeline = glow_at(&[(42, 0.5)]);
        let frames = morph_frames(&timeline);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame, 42);
    }

    #[test]
    fn every_parameter_is_emitted_at_each_point() {
        let mut set = GlowSet::default();
        set.insert("Exposure +".to_string(), 1.0);
        set.insert("Gamma +".to_string(), 2.2);
        let mut timeline = BTreeMap::new();
        timeline.insert(0, set);
        timeline.insert(30, GlowSet::default());

        let frames = morph_frames(&timeline);
        // Two parameters at frames 0 and 29; the empty record at 30 adds none.
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().any(|f| f.frame == 29 && f.name == "Gamma +"));
    }

    #[test]
    fn bone_frames_carry_transform_and_keep_physics_on() {
        let mut set = LightSet::default();
        set.insert(
            "Chara_Direction".to_string(),
            LightTransform {
                position: [1.0, 2.0, 3.0],
                rotation: [45.0, 0.0, 0.0],
            },
        );
        let mut timeline = BTreeMap::new();
        timeline.insert(7, set);

        let frames = bone_frames(&timeline);
        assert_eq!(frames.len(), 1);
        let f = &frames[0];
        assert_eq!(f.frame, 7);
        assert_eq!(f.position, [1.0, 2.0, 3.0]);
        assert_eq!(f.rotation, [45.0, 0.0, 0.0]);
        assert!(!f.phys_off);
    }
}
