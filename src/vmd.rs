//! Minimal VMD (Vocaloid Motion Data, format version 2) writer.
//!
//! Only the sections this tool produces carry data: bone frames and morph
//! frames. Camera, light, self-shadow, and IK-display sections are written
//! with zero counts so strict readers still find a complete file.
//!
//! The format stores names as 15-byte Shift-JIS fields; every name this tool
//! emits is plain ASCII, which is a Shift-JIS subset, so the bytes pass
//! through untranslated.

use glam::{EulerRot, Quat};
use log::{info, warn};
use std::fs;
use std::path::Path;

const MAGIC: &[u8] = b"Vocaloid Motion Data 0002";
const MAGIC_LEN: usize = 30;
const MODEL_NAME_LEN: usize = 20;
const FRAME_NAME_LEN: usize = 15;

// The standard linear bezier block (control points 20/107 per curve axis).
// MMD ignores most of the 64 bytes; writers fill the repeats with the same
// row.
const BONE_INTERP: [u8; 64] = {
    let mut block = [0u8; 64];
    let mut row = 0;
    while row < 4 {
        let mut i = 0;
        while i < 16 {
            block[row * 16 + i] = if i < 8 { 20 } else { 107 };
            i += 1;
        }
        row += 1;
    }
    block
};

#[derive(Clone, Debug)]
pub struct VmdHeader {
    /// Placeholder target-model name; lighting morphs/bones bind by name, so
    /// any dedicated controller model works.
    pub model_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VmdBoneFrame {
    pub frame: u32,
    pub name: String,
    pub position: [f32; 3],
    /// Euler rotation in degrees; converted to a quaternion on write.
    pub rotation: [f32; 3],
    /// Kept for API parity with the frame model. VMD has no dedicated flag
    /// byte; only physics-enabled frames are written either way.
    pub phys_off: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VmdMorphFrame {
    pub frame: u32,
    pub name: String,
    pub weight: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Vmd {
    pub header: VmdHeader,
    pub bone_frames: Vec<VmdBoneFrame>,
    pub morph_frames: Vec<VmdMorphFrame>,
}

impl Default for VmdHeader {
    fn default() -> Self {
        Self {
            model_name: "Controller".to_string(),
        }
    }
}

/// Truncates/NUL-pads a name into the fixed-width field the format expects.
fn push_fixed_name(out: &mut Vec<u8>, name: &str, len: usize) {
    let bytes = name.as_bytes();
    if bytes.len() > len {
        warn!("Name '{name}' exceeds {len} bytes and will be truncated");
    }
    let take = bytes.len().min(len);
    out.extend_from_slice(&bytes[..take]);
    out.resize(out.len() + (len - take), 0);
}

/// Degrees-Euler to the x/y/z/w quaternion layout VMD stores. The source
/// data only ever rotates about X, so the rotation-order choice is moot.
fn euler_deg_to_quat(rotation: [f32; 3]) -> [f32; 4] {
    let q = Quat::from_euler(
        EulerRot::ZXY,
        rotation[2].to_radians(),
        rotation[0].to_radians(),
        rotation[1].to_radians(),
    );
    [q.x, q.y, q.z, q.w]
}

impl Vmd {
    /// Serializes the motion to the binary layout. Frames are sorted by
    /// (name, frame) here; the writer owns format-required ordering.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bones = self.bone_frames.clone();
        bones.sort_by(|a, b| a.name.cmp(&b.name).then(a.frame.cmp(&b.frame)));
        let mut morphs = self.morph_frames.clone();
        morphs.sort_by(|a, b| a.name.cmp(&b.name).then(a.frame.cmp(&b.frame)));

        let mut out = Vec::with_capacity(
            MAGIC_LEN + MODEL_NAME_LEN + 24 + bones.len() * 111 + morphs.len() * 23,
        );

        out.extend_from_slice(MAGIC);
        out.resize(MAGIC_LEN, 0);
        push_fixed_name(&mut out, &self.header.model_name, MODEL_NAME_LEN);

        out.extend_from_slice(&(bones.len() as u32).to_le_bytes());
        for bone in &bones {
            push_fixed_name(&mut out, &bone.name, FRAME_NAME_LEN);
            out.extend_from_slice(&bone.frame.to_le_bytes());
            for v in bone.position {
                out.extend_from_slice(&v.to_le_bytes());
            }
            for v in euler_deg_to_quat(bone.rotation) {
                out.extend_from_slice(&v.to_le_bytes());
            }
            out.extend_from_slice(&BONE_INTERP);
        }

        out.extend_from_slice(&(morphs.len() as u32).to_le_bytes());
        for morph in &morphs {
            push_fixed_name(&mut out, &morph.name, FRAME_NAME_LEN);
            out.extend_from_slice(&morph.frame.to_le_bytes());
            out.extend_from_slice(&morph.weight.to_le_bytes());
        }

        // Camera, light, self-shadow, IK-display: present but empty.
        for _ in 0..4 {
            out.extend_from_slice(&0u32.to_le_bytes());
        }
        out
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        let bytes = self.to_bytes();
        fs::write(path, &bytes)
            .map_err(|e| format!("Cannot write motion file {:?}: {}", path, e))?;
        info!(
            "Wrote {:?}: {} bone frames, {} morph frames, {} bytes",
            path,
            self.bone_frames.len(),
            self.morph_frames.len(),
            bytes.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Vmd, VmdBoneFrame, VmdHeader, VmdMorphFrame, euler_deg_to_quat};

    const EMPTY_LEN: usize = 30 + 20 + 4 + 4 + 4 + 4 + 4 + 4;

    #[test]
    fn empty_motion_still_carries_all_sections() {
        let bytes = Vmd::default().to_bytes();
        assert_eq!(bytes.len(), EMPTY_LEN);
        assert!(bytes.starts_with(b"Vocaloid Motion Data 0002"));
        assert_eq!(&bytes[30..40], b"Controller");
    }

    #[test]
    fn record_sizes_match_the_format() {
        let vmd = Vmd {
            header: VmdHeader::default(),
            bone_frames: vec![VmdBoneFrame {
                frame: 1,
                name: "Chara_Direction".to_string(),
                position: [0.0, 0.0, 0.0],
                rotation: [0.0, 0.0, 0.0],
                phys_off: false,
            }],
            morph_frames: vec![VmdMorphFrame {
                frame: 1,
                name: "Exposure +".to_string(),
                weight: 1.0,
            }],
        };
        let bytes = vmd.to_bytes();
        assert_eq!(bytes.len(), EMPTY_LEN + 111 + 23);
    }

    #[test]
    fn frames_are_sorted_by_name_then_frame() {
        let vmd = Vmd {
            header: VmdHeader::default(),
            bone_frames: Vec::new(),
            morph_frames: vec![
                VmdMorphFrame { frame: 5, name: "Gamma +".into(), weight: 1.0 },
                VmdMorphFrame { frame: 2, name: "Gamma +".into(), weight: 2.0 },
                VmdMorphFrame { frame: 9, name: "Exposure +".into(), weight: 3.0 },
            ],
        };
        let bytes = vmd.to_bytes();
        // First morph record starts right after the (empty) bone section.
        let morphs_at = 30 + 20 + 4 + 4;
        assert_eq!(&bytes[morphs_at..morphs_at + 10], b"Exposure +");
        let second = morphs_at + 23;
        let frame = u32::from_le_bytes(bytes[second + 15..second + 19].try_into().unwrap());
        assert_eq!(frame, 2, "within a name, frames ascend");
    }

    #[test]
    fn x_axis_euler_becomes_the_expected_quaternion() {
        let q = euler_deg_to_quat([90.0, 0.0, 0.0]);
        let half = (45.0f32).to_radians();
        assert!((q[0] - half.sin()).abs() < 1e-6);
        assert!(q[1].abs() < 1e-6 && q[2].abs() < 1e-6);
        assert!((q[3] - half.cos()).abs() < 1e-6);
    }

    #[test]
    fn long_names_truncate_to_field_width() {
        let vmd = Vmd {
            header: VmdHeader {
                model_name: "A model name that is far too long".to_string(),
            },
            bone_frames: Vec::new(),
            morph_frames: Vec::new(),
        };
        let bytes = vmd.to_bytes();
        assert_eq!(bytes.len(), EMPTY_LEN, "field widths are fixed");
        assert_eq!(&bytes[30..50], b"A model name that is");
    }
}
