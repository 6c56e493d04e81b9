//! Interactive front end: gathers the run inputs from the operator and
//! drives resolve → emit → write.
//!
//! Every prompt loops until the answer validates; bad input is reported and
//! re-asked, never propagated. The only hard stop is stdin closing, which
//! would otherwise spin the loop forever.

use crate::config::{self, CandidatePolicy};
use crate::convert::emit::{bone_frames, morph_frames};
use crate::convert::resolve::{
    CandidatePicker, FirstCandidate, ResolveOptions, resolve_stream,
};
use crate::vmd::{Vmd, VmdHeader};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn prompt_line(message: &str) -> Result<String, String> {
    print!("{message}");
    std::io::stdout()
        .flush()
        .map_err(|e| format!("Cannot flush stdout: {e}"))?;
    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("Cannot read stdin: {e}"))?;
    if read == 0 {
        return Err("Input stream closed while a prompt was pending".to_string());
    }
    Ok(line.trim().to_string())
}

fn prompt_int(message: &str, valid: impl Fn(i64) -> bool) -> Result<i64, String> {
    loop {
        let answer = prompt_line(message)?;
        match answer.parse::<i64>() {
            Ok(v) if valid(v) => return Ok(v),
            Ok(v) => println!("{v} is out of range"),
            Err(_) => println!("'{answer}' is not an integer"),
        }
    }
}

/// File/folder prompts accept drag-and-drop paths, which most shells wrap in
/// quotes.
fn prompt_existing_path(message: &str, want_dir: bool) -> Result<PathBuf, String> {
    loop {
        let answer = prompt_line(message)?;
        let path = PathBuf::from(answer.trim_matches('"'));
        let ok = if want_dir { path.is_dir() } else { path.is_file() };
        if ok {
            return Ok(path);
        }
        println!(
            "'{}' is not a {}",
            path.display(),
            if want_dir { "folder" } else { "file" }
        );
    }
}

/// Operator-facing disambiguation: lists the candidates and re-asks until a
/// valid index comes back.
struct PromptPicker;

impl CandidatePicker for PromptPicker {
    fn pick(&mut self, kind: &str, candidates: &[PathBuf]) -> usize {
        println!("Multiple default {kind} files match this song:");
        for (idx, path) in candidates.iter().enumerate() {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("  [{idx}] {name}");
        }
        let max = (candidates.len() - 1) as i64;
        match prompt_int(
            &format!("Pick the {kind} file to use (0-{max}): "),
            |v| (0..=max).contains(&v),
        ) {
            Ok(v) => v as usize,
            // Stdin closed mid-prompt; the clamp in the resolver makes this
            // the first candidate.
            Err(e) => {
                println!("{e}; using the first candidate");
                0
            }
        }
    }
}

pub fn run() -> Result<(), String> {
    let cfg = config::get();

    let dsc_path = prompt_existing_path("Enter the parsed DSC file (.txt): ", false)?;
    let asset_dir = prompt_existing_path("Drop the folder with the FARC lighting: ", true)?;
    let song_id = prompt_int("Input the song/PV number: ", |v| (0..=999).contains(&v))? as u32;
    let fps = prompt_int("Input your Framerate (30/60): ", |v| v > 0 && v < 120)? as u32;

    let opts = ResolveOptions {
        song_id,
        fps,
        frame_offset: cfg.frame_offset,
    };

    let dsc_text = fs::read_to_string(&dsc_path)
        .map_err(|e| format!("Cannot read DSC file {:?}: {}", dsc_path, e))?;

    let mut prompt_picker = PromptPicker;
    let mut first_picker = FirstCandidate;
    let picker: &mut dyn CandidatePicker = match cfg.candidate_policy {
        CandidatePolicy::Prompt => &mut prompt_picker,
        CandidatePolicy::First => &mut first_picker,
    };

    let timelines = resolve_stream(&dsc_text, &asset_dir, &opts, picker)?;

    let vmd = Vmd {
        header: VmdHeader {
            model_name: cfg.target_model,
        },
        bone_frames: bone_frames(&timelines.bones),
        morph_frames: morph_frames(&timelines.morphs),
    };

    let out_path = Path::new(&cfg.output_dir).join(format!("PV_LIGHT_{song_id:03}.vmd"));
    vmd.write_to_file(&out_path)?;

    info!("Conversion finished for pv{song_id:03} at {fps} fps");
    println!("The output has been generated correctly.");
    Ok(())
}
