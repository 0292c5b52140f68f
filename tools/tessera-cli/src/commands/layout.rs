//! Print grid geometry.

use serde::Serialize;
use tessera_mixer::{GridLayout, SlotRect};

/// Largest participant count the command will lay out.
pub const MAX_PARTICIPANTS: usize = 4096;

#[derive(Serialize)]
struct LayoutReport {
    participants: usize,
    canvas_width: u32,
    canvas_height: u32,
    #[serde(flatten)]
    grid: GridLayout,
    slots: Vec<SlotRect>,
}

pub fn run(participants: usize, width: u32, height: u32, json: bool) -> anyhow::Result<()> {
    if participants > MAX_PARTICIPANTS {
        anyhow::bail!("At most {MAX_PARTICIPANTS} participants can be laid out, got {participants}");
    }
    if (width == 0) != (height == 0) {
        anyhow::bail!("Invalid canvas {width}x{height}: both sides must be zero or both positive");
    }
    let Some(grid) = GridLayout::compute(participants, width, height) else {
        println!("No participants: nothing to lay out.");
        return Ok(());
    };

    let report = LayoutReport {
        participants,
        canvas_width: width,
        canvas_height: height,
        grid,
        slots: (0..participants).map(|i| grid.slot(i)).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Grid for {participants} participant(s) on {width}x{height}");
    println!("{}", "=".repeat(50));
    println!(
        "  Zoom: {0}x{0} ({1} slots)",
        grid.zoom,
        grid.capacity()
    );
    println!("  Cell: {}x{}", grid.cell_width, grid.cell_height);
    let uncovered_x = width - grid.cell_width * grid.zoom;
    let uncovered_y = height - grid.cell_height * grid.zoom;
    if uncovered_x > 0 || uncovered_y > 0 {
        println!("  Uncovered edge: {uncovered_x}px right, {uncovered_y}px bottom");
    }
    println!();
    for (i, slot) in report.slots.iter().enumerate() {
        println!(
            "  slot {i:>2}: x={:<5} y={:<5} {}x{}",
            slot.x, slot.y, slot.width, slot.height
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_participant_counts_above_cap() {
        let err = run(usize::MAX, 640, 480, true).unwrap_err();
        assert!(err.to_string().contains("4096"));
        assert!(run(MAX_PARTICIPANTS + 1, 640, 480, true).is_err());
    }

    #[test]
    fn test_rejects_half_configured_canvas() {
        assert!(run(4, 0, 480, true).is_err());
    }

    #[test]
    fn test_lays_out_up_to_cap() {
        assert!(run(9, 640, 480, true).is_ok());
        assert!(run(0, 640, 480, false).is_ok());
    }
}
