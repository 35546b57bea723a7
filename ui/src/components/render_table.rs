use super::Text;

/// Lines up columns. Widths count characters, not bytes, so Cyrillic names line up too.
pub fn render_table(headers: Vec<&str>, rows: Vec<Vec<String>>) -> Text {
    let mut width_per_col: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (cell, width) in row.iter().zip(width_per_col.iter_mut()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render_row = |cells: Vec<String>| {
        let last = cells.len().saturating_sub(1);
        cells
            .into_iter()
            .enumerate()
            .map(|(idx, cell)| {
                if idx == last {
                    cell
                } else {
                    let width = width_per_col.get(idx).copied().unwrap_or(0);
                    let pad = width.saturating_sub(cell.chars().count());
                    format!("{cell}{}", " ".repeat(pad))
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut txt = Text::from(render_row(headers.iter().map(|h| h.to_string()).collect()));
    txt.add_line(
        width_per_col
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        txt.add_line(render_row(row));
    }
    txt
}
