use std::io::Write;

use parking_lot::Mutex;

/// Output surface for query results, shaped after a browser devtools console.
pub trait Console: Send + Sync {
    fn group(&self, label: &str, collapsed: bool);
    fn group_end(&self);
    fn table(&self, columns: &[&str], rows: &[Vec<String>]);
    /// One log line. `highlight` is a leading segment rendered with emphasis.
    fn line(&self, highlight: &str, text: &str);
}

/// Writes indented plain text, optionally with ANSI emphasis.
///
/// Output of a top-level group is held back until the group closes and then
/// written in one piece, so contexts sharing a terminal do not interleave.
pub struct TextConsole<W> {
    state: Mutex<TextState<W>>,
    color: bool,
}

struct TextState<W> {
    writer: W,
    depth: usize,
    pending: String,
}

impl<W: Write + Send> TextConsole<W> {
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            state: Mutex::new(TextState {
                writer,
                depth: 0,
                pending: String::new(),
            }),
            color,
        }
    }

    pub fn into_inner(self) -> W {
        let mut state = self.state.into_inner();
        state.flush_pending();
        state.writer
    }
}

impl TextConsole<std::io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(std::io::stdout(), color)
    }
}

impl<W: Write + Send> TextState<W> {
    fn push_line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.pending.push_str("  ");
        }
        self.pending.push_str(text);
        self.pending.push('\n');
    }

    fn write_line(&mut self, text: &str) {
        self.push_line(text);
        if self.depth == 0 {
            self.flush_pending();
        }
    }

    fn flush_pending(&mut self) {
        // Best-effort: a closed pipe must not take the context down.
        let _ = self.writer.write_all(self.pending.as_bytes());
        let _ = self.writer.flush();
        self.pending.clear();
    }
}

impl<W: Write + Send> Console for TextConsole<W> {
    fn group(&self, label: &str, collapsed: bool) {
        let marker = if collapsed { '▸' } else { '▾' };
        let mut state = self.state.lock();
        state.push_line(&format!("{marker} {label}"));
        state.depth += 1;
    }

    fn group_end(&self) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.flush_pending();
        }
    }

    fn table(&self, columns: &[&str], rows: &[Vec<String>]) {
        let mut state = self.state.lock();
        for line in render_table(columns, rows) {
            state.write_line(&line);
        }
    }

    fn line(&self, highlight: &str, text: &str) {
        let rendered = if self.color {
            format!("\x1b[43;31m{highlight}\x1b[0m{text}")
        } else {
            format!("{highlight}{text}")
        };
        self.state.lock().write_line(&rendered);
    }
}

/// Lays out rows under an `(index)` column, like `console.table`.
pub fn render_table(columns: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut header: Vec<String> = vec!["(index)".to_string()];
    header.extend(columns.iter().map(|column| column.to_string()));

    let body: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut cells = vec![index.to_string()];
            cells.extend((0..columns.len()).map(|i| row.get(i).cloned().unwrap_or_default()));
            cells
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(&header));
    lines.push(separator);
    lines.extend(body.iter().map(|row| format_row(row)));
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Group { label: String, collapsed: bool },
    GroupEnd,
    Table { columns: Vec<String>, rows: Vec<Vec<String>> },
    Line { highlight: String, text: String },
}

/// Keeps every console call in memory. Used when embedding contexts in a
/// host that renders results itself.
#[derive(Default)]
pub struct MemoryConsole {
    events: Mutex<Vec<ConsoleEvent>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConsoleEvent> {
        self.events.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Labels of top-level groups, in emission order.
    pub fn group_labels(&self) -> Vec<String> {
        let mut depth = 0usize;
        let mut labels = Vec::new();
        for event in self.events.lock().iter() {
            match event {
                ConsoleEvent::Group { label, .. } => {
                    if depth == 0 {
                        labels.push(label.clone());
                    }
                    depth += 1;
                }
                ConsoleEvent::GroupEnd => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        labels
    }
}

impl Console for MemoryConsole {
    fn group(&self, label: &str, collapsed: bool) {
        self.events.lock().push(ConsoleEvent::Group {
            label: label.to_string(),
            collapsed,
        });
    }

    fn group_end(&self) {
        self.events.lock().push(ConsoleEvent::GroupEnd);
    }

    fn table(&self, columns: &[&str], rows: &[Vec<String>]) {
        self.events.lock().push(ConsoleEvent::Table {
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: rows.to_vec(),
        });
    }

    fn line(&self, highlight: &str, text: &str) {
        self.events.lock().push(ConsoleEvent::Line {
            highlight: highlight.to_string(),
            text: text.to_string(),
        });
    }
}
