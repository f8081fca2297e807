//! Terminal tables for command output

use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use domain_imagery_pricing::{CostTableRow, EstimationResponse, ResourceInfo};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|title| Cell::new(title).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn number(value: impl std::fmt::Display) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

pub fn estimate_table(estimation: &EstimationResponse) -> String {
    let mut table = table(&["RESOURCE", "CATEGORY", "CREDITS"]);
    for line in &estimation.breakdown {
        table.add_row(vec![
            Cell::new(line.resource.as_str()),
            Cell::new(line.category),
            number(format!("{:.2}", line.credits)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(""),
        number(format!("{:.2}", estimation.total_credits)),
    ]);

    format!(
        "Area of interest: {:.2} m² ({:.4} km²)\nCapture mode:     {}\n{table}\nRounded total: {} credits\n",
        estimation.area_square_meters,
        estimation.area_square_meters / 1_000_000.0,
        estimation.capture_mode,
        estimation.rounded_total_credits
    )
}

pub fn cost_table(rows: &[CostTableRow]) -> String {
    let mut table = table(&["RESOURCE", "CONTENT TYPE", "SINGLE", "ALL CAPTURES"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.resource.as_str()),
            Cell::new(row.content_type.as_deref().unwrap_or("-")),
            number(format_rate(row.single_capture_credits)),
            number(format_rate(row.all_captures_credits)),
        ]);
    }
    format!("{table}\nCredits per 1000 m²\n")
}

pub fn resources(resources: &[ResourceInfo]) -> String {
    let mut table = table(&["RESOURCE", "CATEGORY", "PRICED"]);
    for info in resources {
        table.add_row(vec![
            Cell::new(info.resource.as_str()),
            Cell::new(info.category),
            Cell::new(if info.priced { "yes" } else { "no" }),
        ]);
    }
    format!("{table}\n")
}

/// Whole rates without decimals, fractional ones with two
fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{rate:.0}")
    } else {
        format!("{rate:.2}")
    }
}
