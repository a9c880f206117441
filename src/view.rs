// src/view.rs
//! Text rendering of the session. Everything here is a pure function of
//! [`SessionState`] plus the few view-only flags in [`ViewState`].

use serde::Serialize;
use std::fmt::Write as _;

use crate::models::{AspectRatio, GeneratedImage};
use crate::session::{Phase, SessionState};

const FRAME_WIDTH: u32 = 40;
const PREVIEW_CHARS: usize = 48;

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub draft: String,
    pub selected_ratio: AspectRatio,
    pub fullscreen: bool,
    pub voice_available: bool,
    pub share_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry<'a> {
    pub index: usize,
    pub timestamp: i64,
    pub prompt: &'a str,
    pub aspect_ratio: AspectRatio,
    pub mime_type: &'a str,
    pub selected: bool,
}

pub fn history_entries(state: &SessionState) -> Vec<HistoryEntry<'_>> {
    let selected = state.current_image.as_ref().map(|img| img.timestamp());
    state
        .history
        .iter()
        .enumerate()
        .map(|(i, img)| HistoryEntry {
            index: i + 1,
            timestamp: img.timestamp(),
            prompt: img.prompt(),
            aspect_ratio: img.aspect_ratio(),
            mime_type: &img.payload().mime_type,
            selected: selected == Some(img.timestamp()),
        })
        .collect()
}

/// Rows of a frame `FRAME_WIDTH` columns wide with the given proportion.
/// Terminal cells are about twice as tall as wide, hence the halving.
pub fn frame_height(ratio: AspectRatio) -> u32 {
    let (w, h) = ratio.dimensions();
    ((FRAME_WIDTH * h) / (w * 2)).max(3)
}

fn frame(out: &mut String, ratio: AspectRatio, label: &str) {
    let inner = FRAME_WIDTH as usize;
    let rows = frame_height(ratio) as usize;
    let label: String = label.chars().take(inner).collect();

    let _ = writeln!(out, "+{}+", "-".repeat(inner));
    for row in 0..rows {
        if row == rows / 2 {
            let _ = writeln!(out, "|{:^width$}|", label, width = inner);
        } else {
            let _ = writeln!(out, "|{}|", " ".repeat(inner));
        }
    }
    let _ = writeln!(out, "+{}+", "-".repeat(inner));
}

fn approx_size_kb(image: &GeneratedImage) -> usize {
    (image.payload().data.len() * 3 / 4).div_ceil(1024)
}

fn image_block(out: &mut String, image: &GeneratedImage, view: &ViewState) {
    frame(out, image.aspect_ratio(), &format!("[{}]", image.aspect_ratio()));
    let _ = writeln!(out, "Prompt: {}", image.prompt());
    let _ = writeln!(
        out,
        "{}, ~{} KB",
        image.payload().mime_type,
        approx_size_kb(image)
    );

    let mut actions = vec!["/full", "/download"];
    if view.share_available {
        actions.push("/share");
    }
    let _ = writeln!(out, "Actions: {}", actions.join("  "));
}

pub fn render_fullscreen(image: &GeneratedImage, view: &ViewState) -> String {
    let mut out = String::new();
    let uri = image.url();
    let preview: String = uri.chars().take(PREVIEW_CHARS).collect();
    frame(&mut out, image.aspect_ratio(), image.prompt());
    let _ = writeln!(out, "{}...", preview);
    let mut actions = vec!["/full to close", "/download"];
    if view.share_available {
        actions.push("/share");
    }
    let _ = writeln!(out, "{}", actions.join("  "));
    out
}

pub fn render(state: &SessionState, view: &ViewState) -> String {
    if view.fullscreen && matches!(state.phase, Phase::Idle | Phase::Success) {
        if let Some(image) = &state.current_image {
            return render_fullscreen(image, view);
        }
    }

    let mut out = String::new();

    match state.phase {
        Phase::Error => {
            let _ = writeln!(out, "Generation failed");
            let _ = writeln!(
                out,
                "{}",
                state
                    .last_error
                    .as_deref()
                    .unwrap_or("Something went wrong. Try changing the description.")
            );
        }
        Phase::Generating => {
            frame(&mut out, state.display_ratio(), "Generating...");
        }
        Phase::Idle | Phase::Success => match &state.current_image {
            Some(image) => image_block(&mut out, image, view),
            None => {
                let _ = writeln!(out, "Start creating");
                let _ = writeln!(
                    out,
                    "Type a description below or use /voice to dictate one."
                );
            }
        },
    }

    let entries = history_entries(state);
    if !entries.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Session history ({})", entries.len());
        for entry in entries.iter().rev() {
            let marker = if entry.selected { '>' } else { ' ' };
            let _ = writeln!(
                out,
                "{} {:>2}. [{}] {}",
                marker, entry.index, entry.aspect_ratio, entry.prompt
            );
        }
    }

    let _ = writeln!(out);
    let ratios: Vec<String> = AspectRatio::SELECTOR
        .iter()
        .map(|ratio| {
            if *ratio == view.selected_ratio {
                format!("({})", ratio)
            } else {
                ratio.to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "Ratio: {}", ratios.join(" "));

    let mut tools = vec!["/ratio <w:h>", "/pick <n>", "/history"];
    if view.voice_available {
        tools.push("/voice");
    }
    tools.push("/quit");
    let _ = writeln!(out, "Commands: {}", tools.join("  "));

    if !state.accepts_submit() {
        let _ = writeln!(out, "> {} (generating...)", view.draft);
    } else {
        let _ = writeln!(out, "> {}", view.draft);
    }

    out
}
