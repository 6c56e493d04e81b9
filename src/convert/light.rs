//! Stage/character light parameter extraction.
//!
//! Light files share the glow file syntax but are sub-scoped by `id_start`
//! lines: id 0 opens the character light block, id 1 the stage light block,
//! and any other id closes the scope so its lines are skipped. Each scoped
//! `ambient`/`diffuse`/`specular`/`position` line becomes one bone transform.

use crate::convert::value::{Value, parse_param_line};
use log::trace;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// One resolved light bone: a position triple plus an Euler rotation triple
/// in degrees. The source format only ever drives the X rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

/// Bone name (`{Chara|Stage}_{Ambient|Diffuse|Specular|Direction}`) ->
/// transform, as extracted from one light file.
pub type LightSet = FxHashMap<String, LightTransform>;

const CHANNEL_KEYS: [(&str, &str); 4] = [
    ("ambient", "Ambient"),
    ("diffuse", "Diffuse"),
    ("specular", "Specular"),
    ("position", "Direction"),
];

/// Extracts the light parameter set from one stage file.
pub fn parse_light(path: &Path) -> Result<LightSet, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read light file {:?}: {}", path, e))?;

    let mut values = LightSet::default();
    // Empty until the first id_start; cleared again by an id we do not map.
    let mut context: Option<&str> = None;

    for line in content.split('\n') {
        if line.is_empty() {
            continue;
        }
        let args = parse_param_line(line);
        let Some(Value::Text(name)) = args.first() else {
            continue;
        };

        match name.as_str() {
            "EOF" => break,

            "id_start" => {
                context = match args.get(1).and_then(Value::as_int) {
                    Some(0) => Some("Chara"),
                    Some(1) => Some("Stage"),
                    other => {
                        trace!("Light id_start {other:?} has no bone context in {path:?}");
                        None
                    }
                };
            }

            other => {
                let Some(ctx) = context else {
                    continue;
                };
                let Some((_, channel)) = CHANNEL_KEYS.iter().find(|(cmd, _)| *cmd == other)
                else {
                    continue;
                };
                let mut nums = args[1..].iter().filter_map(Value::as_f32);
                let (Some(x), Some(y), Some(z), Some(w)) =
                    (nums.next(), nums.next(), nums.next(), nums.next())
                else {
                    trace!("Light line '{other}' in {path:?} is short on values; skipped");
                    continue;
                };
                values.insert(
                    format!("{ctx}_{channel}"),
                    LightTransform {
                        position: [x, y, z],
                        rotation: [w, 0.0, 0.0],
                    },
                );
            }
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::{LightTransform, parse_light};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_UNIQUIFIER: AtomicU64 = AtomicU64::new(0);

    fn write_fixture(name: &str, content: &str) -> PathBuf {
        let serial = TEST_UNIQUIFIER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!(
            "pvlight-light-{name}-{}-{}.txt",
            std::process::id(),
            serial
        ));
        std::fs::write(&path, content).expect("write light fixture");
        path
    }

    #[test]
    fn chara_context_scopes_channel_lines() {
        let path = write_fixture("chara", "id_start 0\nambient 1 2 3 4\nEOF\n");
        let set = parse_light(&path).expect("valid light file should parse");
        assert_eq!(
            set.get("Chara_Ambient"),
            Some(&LightTransform {
                position: [1.0, 2.0, 3.0],
                rotation: [4.0, 0.0, 0.0],
            })
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn lines_without_context_are_dropped() {
        let path = write_fixture("noctx", "ambient 1 2 3 4\nEOF\n");
        let set = parse_light(&path).expect("valid light file should parse");
        assert!(set.is_empty(), "channel lines before id_start must be ignored");
    }

    #[test]
    fn unmapped_id_clears_the_context() {
        let path = write_fixture(
            "clear",
            "id_start 1\ndiffuse 1 1 1 0\nid_start 5\nspecular 2 2 2 0\nEOF\n",
        );
        let set = parse_light(&path).expect("valid light file should parse");
        assert!(set.contains_key("Stage_Diffuse"));
        assert!(
            !set.contains_key("Stage_Specular"),
            "id_start 5 should suspend extraction until the next mapped id"
        );
    }

    #[test]
    fn position_maps_to_direction_bone() {
        let path = write_fixture(
            "direction",
            "id_start 0\nposition 0.5 -1.0 0.25 90\nEOF\n",
        );
        let set = parse_light(&path).expect("valid light file should parse");
        let t = set.get("Chara_Direction").expect("direction bone present");
        assert_eq!(t.position, [0.5, -1.0, 0.25]);
        assert_eq!(t.rotation, [90.0, 0.0, 0.0]);
    }
}
