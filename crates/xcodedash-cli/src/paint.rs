//! Incremental terminal repaint for the watch view.
//!
//! Repaints only the rows that changed since the previous frame and clears
//! rows the new frame no longer uses, keeping the 15-second refresh flicker
//! free on plain ANSI terminals.

use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RepaintPlan {
    changed_rows: Vec<usize>,
    clear_start_row: Option<usize>,
    clear_end_row: usize,
}

impl RepaintPlan {
    fn is_noop(&self) -> bool {
        self.changed_rows.is_empty() && self.clear_start_row.is_none()
    }
}

/// Line-diffing painter holding the previously painted frame.
#[derive(Debug, Default)]
pub struct LinePainter {
    previous_lines: Vec<String>,
}

impl LinePainter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the terminal and forget the previous frame.
    pub fn reset<W: Write>(&mut self, mut out: W) -> std::io::Result<()> {
        self.previous_lines.clear();
        write!(out, "\x1b[2J")?;
        out.flush()
    }

    /// Paint `next_lines`, touching only rows that differ from the last frame.
    pub fn repaint<W: Write>(&mut self, mut out: W, next_lines: &[String]) -> std::io::Result<()> {
        let plan = plan_repaint(&self.previous_lines, next_lines);
        if plan.is_noop() {
            return Ok(());
        }

        for row in plan.changed_rows {
            let line = next_lines.get(row - 1).map_or("", String::as_str);
            write!(out, "\x1b[{row};1H\x1b[2K{line}")?;
        }
        if let Some(start_row) = plan.clear_start_row {
            for row in start_row..=plan.clear_end_row {
                write!(out, "\x1b[{row};1H\x1b[2K")?;
            }
        }

        write!(out, "\x1b[{};1H", next_lines.len().saturating_add(1))?;
        out.flush()?;
        self.previous_lines = next_lines.to_vec();
        Ok(())
    }
}

fn plan_repaint(previous: &[String], next: &[String]) -> RepaintPlan {
    let shared = previous.len().min(next.len());
    let mut changed_rows = Vec::new();

    for idx in 0..shared {
        if previous[idx] != next[idx] {
            changed_rows.push(idx + 1);
        }
    }
    if next.len() > shared {
        changed_rows.extend((shared + 1)..=next.len());
    }

    let clear_start_row = (next.len() < previous.len()).then_some(next.len() + 1);
    RepaintPlan {
        changed_rows,
        clear_start_row,
        clear_end_row: previous.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{plan_repaint, LinePainter};

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn identical_frames_are_a_noop() {
        let frame = lines(&["a", "b"]);
        let plan = plan_repaint(&frame, &frame);
        assert!(plan.is_noop());
    }

    #[test]
    fn changed_and_appended_rows_are_repainted() {
        let plan = plan_repaint(&lines(&["a", "b"]), &lines(&["a", "B", "c"]));
        assert_eq!(plan.changed_rows, vec![2, 3]);
        assert_eq!(plan.clear_start_row, None);
    }

    #[test]
    fn shrinking_frames_clear_the_tail() {
        let plan = plan_repaint(&lines(&["a", "b", "c"]), &lines(&["a"]));
        assert!(plan.changed_rows.is_empty());
        assert_eq!(plan.clear_start_row, Some(2));
        assert_eq!(plan.clear_end_row, 3);
    }

    #[test]
    fn painter_emits_cursor_addressed_writes() {
        let mut painter = LinePainter::new();
        let mut out: Vec<u8> = Vec::new();
        painter.repaint(&mut out, &lines(&["hello"])).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[1;1H"));
        assert!(text.contains("hello"));
    }
}
