use super::{Measurement, TimeUnit};

const HEADERS: [&str; 5] = ["Records", "Select Time", "Insert Time", "Update Time", "Delete Time"];

/// Renders measurements as a grid table, one row per record count. Rows whose
/// update or delete lost chunks are listed under the table.
pub fn render_table(rows: &[Measurement], unit: TimeUnit) -> String {
    let headers: Vec<String> = HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| match i {
            0 => header.to_string(),
            _ => format!("{} ({})", header, unit.label()),
        })
        .collect();

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.records.to_string(),
                format!("{:.2}", unit.round(row.select)),
                format!("{:.2}", unit.round(row.insert)),
                format!("{:.2}", unit.round(row.update)),
                format!("{:.2}", unit.round(row.delete)),
            ]
        })
        .collect();

    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            body.iter()
                .map(|cells| cells[col].len())
                .chain(std::iter::once(headers[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |fill: char| {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&fill.to_string().repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let mut out = rule('-');

    out.push('|');
    for (header, width) in headers.iter().zip(&widths) {
        out.push_str(&format!(" {:<width$} |", header, width = width));
    }
    out.push('\n');
    out.push_str(&rule('='));

    for cells in &body {
        out.push('|');
        for (cell, width) in cells.iter().zip(&widths) {
            out.push_str(&format!(" {:>width$} |", cell, width = width));
        }
        out.push('\n');
        out.push_str(&rule('-'));
    }

    for row in rows.iter().filter(|row| row.has_failures()) {
        out.push_str(&format!(
            "* {} records: {} update and {} delete chunks failed, times cover partial work\n",
            row.records, row.update_failures, row.delete_failures
        ));
    }

    out
}
