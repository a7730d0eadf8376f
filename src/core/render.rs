use crate::core::units::format_value;
use crate::domain::model::{MediaPlan, StockPreparation};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

const NOT_AVAILABLE: &str = "N/A";

const FINAL_STEPS: [&str; 4] = [
    "Gently mix all components to ensure thorough mixing.",
    "Avoid creating bubbles.",
    "Use the media immediately or store at 4°C for up to one week.",
    "Protect from light if light-sensitive components are included.",
];

/// One row of the media preparation steps table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRow {
    #[serde(rename = "Step")]
    pub step: usize,
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "Desired Concentration")]
    pub desired: String,
    #[serde(rename = "Stock Concentration")]
    pub stock: String,
    #[serde(rename = "Volume to Add (uL)")]
    pub volume_ul: String,
    #[serde(rename = "Cost")]
    pub cost: String,
    #[serde(rename = "Note")]
    pub note: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    plan: &'a MediaPlan,
}

/// `{recipe stem}_{volume}mL`, e.g. `example_media_15mL`
pub fn file_stem(recipe_path: &str, final_volume_ml: f64) -> String {
    let stem = Path::new(recipe_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("media");
    format!("{}_{}mL", stem, final_volume_ml)
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("${:.2}", v))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn stock_concentration_label(stock: Option<&StockPreparation>) -> String {
    match stock {
        Some(StockPreparation {
            stock_concentration: Some(concentration),
            working_solution: Some(working),
            ..
        }) => format!("{} (working {})", concentration, working),
        Some(StockPreparation {
            stock_concentration: Some(concentration),
            ..
        }) => concentration.to_string(),
        _ => "-".to_string(),
    }
}

/// Base media, serum, then every additive, numbered from 1
pub fn step_rows(plan: &MediaPlan) -> Vec<StepRow> {
    let mut rows = vec![
        StepRow {
            step: 1,
            component: plan.base_media.name.clone(),
            desired: "-".to_string(),
            stock: "-".to_string(),
            volume_ul: format!("{:.2}", plan.base_media.volume_ml * 1000.0),
            cost: "-".to_string(),
            note: String::new(),
        },
        StepRow {
            step: 2,
            component: plan.serum.name.clone(),
            desired: format!("{}% v/v", plan.serum.percentage),
            stock: "-".to_string(),
            volume_ul: format!("{:.2}", plan.serum.volume_ml * 1000.0),
            cost: "-".to_string(),
            note: String::new(),
        },
    ];

    for (i, entry) in plan.entries.iter().enumerate() {
        rows.push(StepRow {
            step: i + 3,
            component: entry.name.clone(),
            desired: entry.target.describe(),
            stock: stock_concentration_label(plan.stock(&entry.name)),
            volume_ul: entry
                .volume_ul
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            cost: money(entry.cost),
            note: entry.note.clone().unwrap_or_default(),
        });
    }
    rows
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn table_row(out: &mut String, cells: &[&str]) {
    let cells: Vec<String> = cells.iter().map(|c| cell(c)).collect();
    let _ = writeln!(out, "| {} |", cells.join(" | "));
}

fn table_header(out: &mut String, headers: &[&str]) {
    table_row(out, headers);
    let _ = writeln!(out, "|{}", "---|".repeat(headers.len()));
}

pub fn render_markdown(plan: &MediaPlan, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Procedure to Prepare Media");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_Generated {} for {} mL of media._",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        plan.final_volume_ml
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Materials Needed");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Base Media:** {}", plan.base_media.name);
    let _ = writeln!(out, "- **Serum:** {}", plan.serum.name);
    let _ = writeln!(out);

    let solids: Vec<&StockPreparation> = plan.stocks.iter().filter(|s| s.has_solid()).collect();
    if !solids.is_empty() {
        let _ = writeln!(out, "## Stock Solution Preparations");
        let _ = writeln!(out);
        table_header(
            &mut out,
            &[
                "Component",
                "Initial Weight",
                "Stock Concentration",
                "Solvent",
                "Volume to Add",
                "Cost per mL",
            ],
        );
        for stock in solids {
            let weight = stock
                .initial_weight
                .map(|w| w.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let concentration = stock
                .stock_concentration
                .map(|c| c.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let volume = stock
                .stock_volume_ml
                .map(|v| format!("{:.2} mL", v))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let cost = stock
                .cost_per_ml
                .map(|c| format!("${}/mL", format_value(c)))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            table_row(
                &mut out,
                &[&stock.name, &weight, &concentration, &stock.solvent, &volume, &cost],
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Prepare the stock solutions as per the table above.");
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Media Preparation Steps");
    let _ = writeln!(out);
    table_header(
        &mut out,
        &[
            "Step",
            "Component",
            "Desired Concentration",
            "Stock Concentration",
            "Volume to Add (µL)",
            "Cost",
            "Note",
        ],
    );
    for row in step_rows(plan) {
        let step = row.step.to_string();
        table_row(
            &mut out,
            &[
                &step,
                &row.component,
                &row.desired,
                &row.stock,
                &row.volume_ul,
                &row.cost,
                &row.note,
            ],
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Final Steps");
    let _ = writeln!(out);
    for step in FINAL_STEPS {
        let _ = writeln!(out, "- {}", step);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Total Cost");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Total Cost of Media: ${:.2}", plan.total_cost);
    let _ = writeln!(out, "- Cost per mL of Media: ${:.2}/mL", plan.cost_per_ml);

    out
}

pub fn render_steps_csv(plan: &MediaPlan) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in step_rows(plan) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn render_json(plan: &MediaPlan, generated_at: DateTime<Utc>) -> Result<String> {
    let report = JsonReport { generated_at, plan };
    Ok(serde_json::to_string_pretty(&report)?)
}
