use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::squad::{SolveStatus, Squad};

const HEADER: [&str; 6] = ["Name", "Pos", "Team", "Cost", "Points", "League"];

pub fn summary_line(squad: &Squad) -> String {
    format!(
        "Squad cost: £{:.1}m – Points: {:.0}",
        squad.total_cost(),
        squad.total_points()
    )
}

/// `None` for a proven optimum, otherwise a warning for the user.
pub fn status_warning(squad: &Squad) -> Option<String> {
    match squad.status() {
        SolveStatus::Optimal => None,
        SolveStatus::Feasible { best_bound } => Some(format!(
            "Warning: solver stopped early; squad is feasible but not proven optimal \
             (points {:.1}, bound {:.1})",
            squad.total_points(),
            best_bound
        )),
    }
}

pub fn squad_rows(squad: &Squad) -> Vec<Vec<String>> {
    squad
        .players()
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.position.code().to_string(),
                p.team.clone(),
                format!("{:.1}", p.cost),
                format!("{:.1}", p.projected_points),
                p.ext_league.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

pub fn render_table(squad: &Squad) -> String {
    let rows = squad_rows(squad);
    let mut widths: Vec<usize> = HEADER.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            // Cost and points right-aligned.
            if i == 3 || i == 4 {
                format!("{cell:>w$}")
            } else {
                format!("{cell:<w$}")
            }
        })
        .collect();
    let _ = writeln!(out, "{}", cells.join("  ").trim_end());
}

pub fn export_squad_xlsx(path: &Path, squad: &Squad) -> Result<()> {
    let mut rows = vec![HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
    rows.extend(squad_rows(squad));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Squad")?;
        write_rows(sheet, &rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        let status = match squad.status() {
            SolveStatus::Optimal => "optimal".to_string(),
            SolveStatus::Feasible { best_bound } => format!("feasible (bound {best_bound:.1})"),
        };
        write_rows(
            sheet,
            &[
                vec!["Total cost".to_string(), format!("{:.1}", squad.total_cost())],
                vec![
                    "Total points".to_string(),
                    format!("{:.1}", squad.total_points()),
                ],
                vec!["Status".to_string(), status],
                vec![
                    "Search nodes".to_string(),
                    squad.stats().nodes.to_string(),
                ],
            ],
        )?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Player, Position};
    use crate::squad::SolveStats;

    fn squad(status: SolveStatus) -> Squad {
        let player = |id: u32, position, cost: f64, points: f64| Player {
            id,
            name: format!("Player {id}"),
            web_name: format!("P{id}"),
            position,
            team: "Team".into(),
            cost,
            projected_points: points,
            official_points: 0,
            minutes: 0,
            ext_league: (id == 2).then(|| "Eredivisie".to_string()),
            ext_stats: None,
        };
        Squad::new(
            vec![
                player(1, Position::Forward, 9.5, 150.0),
                player(2, Position::Goalkeeper, 4.5, 88.4),
            ],
            status,
            SolveStats::default(),
        )
    }

    #[test]
    fn warning_only_for_unproven_squads() {
        assert_eq!(status_warning(&squad(SolveStatus::Optimal)), None);
        let warning = status_warning(&squad(SolveStatus::Feasible { best_bound: 251.0 }))
            .expect("feasible squads carry a warning");
        assert!(warning.contains("not proven optimal"), "{warning}");
        assert!(warning.contains("bound 251.0"), "{warning}");
    }

    #[test]
    fn summary_and_table_follow_listing_order() {
        let squad = squad(SolveStatus::Optimal);
        assert_eq!(summary_line(&squad), "Squad cost: £14.0m – Points: 238");

        let table = render_table(&squad);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[2].starts_with("Player 2") && lines[2].ends_with("Eredivisie"));
        assert!(lines[3].starts_with("Player 1") && lines[3].contains("150.0"));
    }
}
