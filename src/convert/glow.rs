//! Glow (post-processing/tonemap) parameter extraction.
//!
//! A glow file is a flat `key value...` listing terminated by an `EOF`
//! sentinel line. Recognized keys become morph names; everything else is
//! ignored so newer game revisions with extra commands still parse.

use crate::convert::value::{Value, parse_param_line};
use log::trace;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// Morph name -> weight, as extracted from one glow file. Only the keys
/// actually present in the file appear; the set is never padded out.
pub type GlowSet = FxHashMap<String, f32>;

const SCALAR_KEYS: [(&str, &str); 5] = [
    ("exposure", "Exposure +"),
    ("gamma", "Gamma +"),
    ("saturate_power", "Saturation_Pow"),
    ("saturate_coef", "Saturation +"),
    ("auto_exposure", "Auto_Exposure"),
];

const FADE_KEYS: [&str; 3] = ["Fade_R +", "Fade_G +", "Fade_B +"];
const TONE_TRANSFORM_KEYS: [&str; 6] = [
    "R_Offset +",
    "G_Offset +",
    "B_Offset +",
    "R_Scale +",
    "G_Scale +",
    "B_Scale +",
];

/// Maps the game's tonemap method code onto the morph weight the lighting
/// model expects. There is no sane default for an unknown code, so that case
/// is fatal rather than guessed at.
fn tonemap_weight(code: &Value) -> Result<f32, String> {
    match code.as_int() {
        Some(0) => Ok(0.333),
        Some(1) => Ok(0.666),
        Some(2) => Ok(0.999),
        _ => Err(format!("unknown tone_map_method code {code:?}")),
    }
}

/// Stores `args[from..from + keys.len()]` under `keys`, skipping any slot
/// whose token is missing or non-numeric.
fn store_numeric(values: &mut GlowSet, args: &[Value], from: usize, keys: &[&str]) {
    for (idx, key) in keys.iter().enumerate() {
        if let Some(v) = args.get(from + idx).and_then(Value::as_f32) {
            values.insert((*key).to_string(), v);
        }
    }
}

/// Extracts the glow parameter set from one stage file.
pub fn parse_glow(path: &Path) -> Result<GlowSet, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read glow file {:?}: {}", path, e))?;

    let mut values = GlowSet::default();

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

            "tone_map_method" => {
                let code = args
                    .get(1)
                    .ok_or_else(|| format!("tone_map_method without a code in {path:?}"))?;
                let weight = tonemap_weight(code)
                    .map_err(|e| format!("{} in {:?}", e, path))?;
                values.insert("Tonemap_Type".to_string(), weight);
            }

            "fade_color" => store_numeric(&mut values, &args, 1, &FADE_KEYS),
            "tone_transform" => store_numeric(&mut values, &args, 1, &TONE_TRANSFORM_KEYS),

            // Reserved by the format; the lighting model has no morphs for
            // these yet.
            "flare" | "sigma" | "intensity" => {}

            other => {
                if let Some((_, key)) = SCALAR_KEYS.iter().find(|(cmd, _)| *cmd == other) {
                    if let Some(v) = args.get(1).and_then(Value::as_f32) {
                        values.insert((*key).to_string(), v);
                    }
                } else {
                    trace!("Skipping unrecognized glow command '{other}' in {path:?}");
                }
            }
        }
    }

    Ok(values)
}
