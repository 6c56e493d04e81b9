//! The CHANGE_FIELD cascade engine.
//!
//! Walks the DSC command stream once, converting TIME values into frame
//! numbers and resolving the active glow/light parameter sets on every
//! CHANGE_FIELD event. Resolution precedence, independently for glow and
//! light:
//!
//! 1. a current file for this stage (`*pv{song:03}_c{stage:03}.txt`),
//! 2. the carried-forward set from the last event that found one,
//! 3. a per-song default (`*_pv{song:03}s*.txt`), disambiguated through the
//!    injected [`CandidatePicker`] when more than one exists,
//! 4. the global test file (`glow_tst.txt` / `light_tst.txt`),
//! 5. fatal failure — an incomplete timeline is worse than no file at all.
//!
//! The asset directory is re-listed on every event rather than cached; the
//! files are few and this keeps mid-run directory changes observable.

use crate::convert::glow::{GlowSet, parse_glow};
use crate::convert::light::{LightSet, parse_light};
use crate::convert::value::{Value, parse_dsc_line};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Caller-supplied constants for one resolution run.
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    pub song_id: u32,
    /// Target frame rate; solicited once per run, must be positive.
    pub fps: u32,
    /// Added to every converted TIME value (not to an explicit reset).
    pub frame_offset: u32,
}

/// Disambiguation seam for ambiguous per-song default files. The interactive
/// front end prompts the operator; tests and headless runs inject a
/// deterministic policy instead.
pub trait CandidatePicker {
    /// Chooses one of `candidates` (sorted by filename, always two or more).
    /// `kind` is "glow" or "light". The returned index is clamped by the
    /// caller, so an implementation never has to worry about overrunning.
    fn pick(&mut self, kind: &str, candidates: &[PathBuf]) -> usize;
}

/// Always takes the first (lexicographically smallest) candidate.
pub struct FirstCandidate;

impl CandidatePicker for FirstCandidate {
    fn pick(&mut self, kind: &str, candidates: &[PathBuf]) -> usize {
        info!(
            "{} default candidates are ambiguous ({}); taking the first",
            kind,
            candidates.len()
        );
        0
    }
}

/// Carry-forward state threaded through the cascade. One instance per run;
/// nothing here is process-global.
#[derive(Default)]
struct ResolutionState {
    last_glow: Option<GlowSet>,
    last_light: Option<LightSet>,
    fallback_glow: Option<PathBuf>,
    fallback_light: Option<PathBuf>,
}

/// Frame-keyed parameter sets accumulated over the scan. BTreeMap keeps the
/// emission pass in ascending frame order.
#[derive(Debug, Default)]
pub struct Timelines {
    pub morphs: BTreeMap<u32, GlowSet>,
    pub bones: BTreeMap<u32, LightSet>,
}

/// What one directory listing turned up for one side (glow or light) of one
/// CHANGE_FIELD event.
#[derive(Default)]
struct SideScan {
    current: Option<PathBuf>,
    defaults: Vec<PathBuf>,
    fallback: Option<PathBuf>,
}

fn scan_event_files(
    dir: &Path,
    stage_suffix: &str,
    glow_default_prefix: &str,
    light_default_prefix: &str,
    collect_glow_defaults: bool,
    collect_light_defaults: bool,
) -> Result<(SideScan, SideScan), String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Cannot list asset directory {:?}: {}", dir, e))?;

    let mut glow = SideScan::default();
    let mut light = SideScan::default();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(stage_suffix) {
            if name.starts_with("glow_pv") {
                glow.current = Some(entry.path());
            } else if name.starts_with("light_pv") {
                light.current = Some(entry.path());
            }
            // Other files with a matching stage suffix belong to systems we
            // do not convert (auth_3d, effects); skip them without comment.
            continue;
        }
        if collect_glow_defaults {
            if name.starts_with(glow_default_prefix) && name.ends_with(".txt") {
                glow.defaults.push(entry.path());
            } else if name == "glow_tst.txt" {
                glow.fallback = Some(entry.path());
            }
        }
        if collect_light_defaults {
            if name.starts_with(light_default_prefix) && name.ends_with(".txt") {
                light.defaults.push(entry.path());
            } else if name == "light_tst.txt" {
                light.fallback = Some(entry.path());
            }
        }
    }
    // read_dir order is platform-dependent; sort so picker indices are
    // stable.
    glow.defaults.sort();
    light.defaults.sort();
    Ok((glow, light))
}

/// Runs the cascade for one side of one event. `parse` abstracts over the
/// glow/light extractors so both sides share the exact same precedence.
fn resolve_side<T: Clone>(
    kind: &str,
    stage_id: i64,
    scan: &SideScan,
    last: &mut Option<T>,
    fallback: Option<&PathBuf>,
    parse: impl Fn(&Path) -> Result<T, String>,
    picker: &mut dyn CandidatePicker,
) -> Result<T, String> {
    if let Some(path) = scan.current.as_ref() {
        let set = parse(path)?;
        *last = Some(set.clone());
        return Ok(set);
    }

    if let Some(set) = last.as_ref() {
        return Ok(set.clone());
    }

    if !scan.defaults.is_empty() {
        let idx = if scan.defaults.len() == 1 {
            0
        } else {
            picker
                .pick(kind, &scan.defaults)
                .min(scan.defaults.len() - 1)
        };
        let path = &scan.defaults[idx];
        info!("Stage {stage_id:03}: adopting default {kind} file {path:?}");
        let set = parse(path)?;
        *last = Some(set.clone());
        return Ok(set);
    }

    if let Some(path) = fallback {
        info!("Stage {stage_id:03}: falling back to test {kind} file {path:?}");
        let set = parse(path)?;
        *last = Some(set.clone());
        return Ok(set);
    }

    Err(format!(
        "No {kind} parameters resolvable for stage {stage_id:03}: \
         no stage file, no carried value, no per-song default, no {kind}_tst.txt"
    ))
}

/// Converts a raw TIME value (hundred-thousandths of a second) to a frame
/// number. Zero is an explicit timeline reset and ignores the offset.
#[inline(always)]
fn time_to_frame(value: i64, opts: &ResolveOptions) -> u32 {
    if value == 0 {
        return 0;
    }
    let frame =
        (value as f64 / 100_000.0 * f64::from(opts.fps)).floor() as i64 + i64::from(opts.frame_offset);
    frame.max(0) as u32
}

/// Scans the whole DSC stream and resolves every CHANGE_FIELD event into the
/// frame-keyed timelines. Fails loudly on cascade exhaustion; no partial
/// timeline is ever returned.
pub fn resolve_stream(
    dsc_text: &str,
    asset_dir: &Path,
    opts: &ResolveOptions,
    picker: &mut dyn CandidatePicker,
) -> Result<Timelines, String> {
    let mut state = ResolutionState::default();
    let mut timelines = Timelines::default();
    let mut current_frame: u32 = 0;
    let mut events = 0usize;

    let glow_default_prefix = format!("glow_pv{:03}s", opts.song_id);
    let light_default_prefix = format!("light_pv{:03}s", opts.song_id);

    for line in dsc_text.split('\n') {
        if line.is_empty() {
            continue;
        }
        let (name, args) = parse_dsc_line(line);
        match name.as_str() {
            "TIME" => {
                let Some(value) = args.first().and_then(Value::as_int) else {
                    warn!("TIME with a non-integer argument: '{line}'; skipped");
                    continue;
                };
                current_frame = time_to_frame(value, opts);
            }

            "CHANGE_FIELD" => {
                let Some(stage_id) = args.first().and_then(Value::as_int) else {
                    warn!("CHANGE_FIELD with a non-integer stage id: '{line}'; skipped");
                    continue;
                };
                let stage_suffix = format!("pv{:03}_c{:03}.txt", opts.song_id, stage_id);

                let (glow_scan, light_scan) = scan_event_files(
                    asset_dir,
                    &stage_suffix,
                    &glow_default_prefix,
                    &light_default_prefix,
                    state.last_glow.is_none(),
                    state.last_light.is_none(),
                )?;
                if state.fallback_glow.is_none() {
                    state.fallback_glow = glow_scan.fallback.clone();
                }
                if state.fallback_light.is_none() {
                    state.fallback_light = light_scan.fallback.clone();
                }

                let fallback_glow = state.fallback_glow.clone();
                let glow = resolve_side(
                    "glow",
                    stage_id,
                    &glow_scan,
                    &mut state.last_glow,
                    fallback_glow.as_ref(),
                    parse_glow,
                    picker,
                )?;
                let fallback_light = state.fallback_light.clone();
                let light = resolve_side(
                    "light",
                    stage_id,
                    &light_scan,
                    &mut state.last_light,
                    fallback_light.as_ref(),
                    parse_light,
                    picker,
                )?;

                // Later parameters recorded at the same frame win.
                timelines.morphs.entry(current_frame).or_default().extend(glow);
                timelines.bones.entry(current_frame).or_default().extend(light);
                events += 1;
            }

            // Everything else in the stream (note spawns, camera, lyrics,
            // ...) has no lighting consequence.
            _ => {}
        }
    }

    info!(
        "Resolved {} CHANGE_FIELD events into {} morph frames / {} bone frames",
        events,
        timelines.morphs.len(),
        timelines.bones.len()
    );
    Ok(timelines)
}
