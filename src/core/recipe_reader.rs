use crate::domain::model::{
    BaseMedia, DoseTarget, RecipeDefaults, RecipeDocument, RecipeLineItem, Serum,
};
use crate::utils::error::{PrepError, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

const BASE_MEDIA_TYPE: &str = "Base Media";
const SERUM_TYPE: &str = "Serum";
const ADDITIVE_TYPE: &str = "Additive";

#[derive(Debug, Deserialize)]
struct RecipeRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Dilution Factor", default)]
    dilution_factor: Option<String>,
    #[serde(rename = "Desired Concentration", default)]
    desired_concentration: Option<String>,
    #[serde(rename = "Desired Unit", default)]
    desired_unit: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(column: &str, line: usize, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PrepError::RecipeFormat {
            message: format!("line {}: '{}' is not a valid {}", line, raw, column),
        })
}

fn parse_positive(column: &str, line: usize, raw: &str) -> Result<f64> {
    let value = parse_number(column, line, raw)?;
    if value <= 0.0 {
        return Err(PrepError::RecipeFormat {
            message: format!("line {}: {} must be greater than zero, got {}", line, column, raw),
        });
    }
    Ok(value)
}

pub fn parse_recipe(content: &str, defaults: &RecipeDefaults) -> Result<RecipeDocument> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let rows = reader
        .deserialize::<RecipeRow>()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    if rows.len() < 2 {
        return Err(PrepError::RecipeFormat {
            message: "CSV file must have at least two rows for base media and serum".to_string(),
        });
    }

    let base_row = &rows[0];
    if base_row.kind != BASE_MEDIA_TYPE {
        return Err(PrepError::RecipeFormat {
            message: format!("First row must be the {}, found '{}'", BASE_MEDIA_TYPE, base_row.kind),
        });
    }

    let serum_row = &rows[1];
    if serum_row.kind != SERUM_TYPE {
        return Err(PrepError::RecipeFormat {
            message: format!("Second row must be the {}, found '{}'", SERUM_TYPE, serum_row.kind),
        });
    }

    let percentage = match present(&serum_row.dilution_factor) {
        Some(raw) => {
            let value = parse_number("serum percentage", 3, raw)?;
            if !(0.0..=100.0).contains(&value) {
                return Err(PrepError::RecipeFormat {
                    message: format!("Invalid serum percentage provided: {}", raw),
                });
            }
            value
        }
        None => defaults.serum_percentage,
    };

    let name_or = |name: &str, fallback: &str| {
        if name.is_empty() {
            fallback.to_string()
        } else {
            name.to_string()
        }
    };

    let mut items = Vec::new();
    for (offset, row) in rows.iter().enumerate().skip(2) {
        // header is line 1
        let line = offset + 2;

        if row.kind != ADDITIVE_TYPE {
            tracing::debug!("line {}: skipping '{}' row of type '{}'", line, row.name, row.kind);
            continue;
        }

        let target = if let Some(raw) = present(&row.dilution_factor) {
            DoseTarget::Dilution {
                factor: parse_positive("Dilution Factor", line, raw)?,
            }
        } else if let (Some(raw), Some(unit)) = (
            present(&row.desired_concentration),
            present(&row.desired_unit),
        ) {
            DoseTarget::Concentration {
                value: parse_positive("Desired Concentration", line, raw)?,
                unit: unit.to_string(),
            }
        } else {
            tracing::debug!(
                "line {}: dropping '{}', it has neither a dilution factor nor a concentration",
                line,
                row.name
            );
            continue;
        };

        items.push(RecipeLineItem {
            name: row.name.clone(),
            target,
        });
    }

    tracing::debug!("Parsed recipe with {} additives", items.len());

    Ok(RecipeDocument {
        base_media: BaseMedia {
            name: name_or(&base_row.name, &defaults.base_media),
        },
        serum: Serum {
            name: name_or(&serum_row.name, &defaults.serum),
            percentage,
        },
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DEFAULT_SERUM_PERCENTAGE;

    const HEADER: &str = "Name,Type,Dilution Factor,Desired Concentration,Desired Unit\n";

    fn parse(rows: &str) -> Result<RecipeDocument> {
        parse_recipe(&format!("{}{}", HEADER, rows), &RecipeDefaults::default())
    }

    #[test]
    fn test_parse_recipe() {
        let doc = parse(
            "Advanced DMEM/F12,Base Media,,,\n\
             FBS,Serum,5,,\n\
             Insulin/Transferrin/Selenium (ITS),Additive,100,,\n\
             EGF,Additive,,50,ng/mL\n",
        )
        .unwrap();

        assert_eq!(doc.base_media.name, "Advanced DMEM/F12");
        assert_eq!(doc.serum.name, "FBS");
        assert_eq!(doc.serum.percentage, 5.0);
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].target, DoseTarget::Dilution { factor: 100.0 });
        assert_eq!(
            doc.items[1].target,
            DoseTarget::Concentration {
                value: 50.0,
                unit: "ng/mL".to_string()
            }
        );
    }

    #[test]
    fn test_default_serum_percentage() {
        let doc = parse("DMEM,Base Media,,,\nFBS,Serum,,,\n").unwrap();
        assert_eq!(doc.serum.percentage, DEFAULT_SERUM_PERCENTAGE);
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_blank_cells_use_defaults() {
        let defaults = RecipeDefaults {
            base_media: "HEPES-buffered DMEM/F12".to_string(),
            serum: "Horse Serum".to_string(),
            serum_percentage: 2.0,
        };
        let content = format!("{},Base Media,,,\n,Serum,,,\n", HEADER);
        let doc = parse_recipe(&content, &defaults).unwrap();
        assert_eq!(doc.base_media.name, "HEPES-buffered DMEM/F12");
        assert_eq!(doc.serum.name, "Horse Serum");
        assert_eq!(doc.serum.percentage, 2.0);
    }

    #[test]
    fn test_dilution_factor_wins_over_concentration() {
        let doc = parse("DMEM,Base Media,,,\nFBS,Serum,,,\nNoggin,Additive,1000,100,ng/mL\n").unwrap();
        assert_eq!(doc.items[0].target, DoseTarget::Dilution { factor: 1000.0 });
    }

    #[test]
    fn test_incomplete_and_foreign_rows_are_dropped() {
        let doc = parse(
            "DMEM,Base Media,,,\n\
             FBS,Serum,,,\n\
             Noggin,Additive,,100,\n\
             Pen/Strep,Antibiotic,100,,\n\
             EGF,Additive,,50,ng/mL\n",
        )
        .unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].name, "EGF");
    }

    #[test]
    fn test_first_row_must_be_base_media() {
        let err = parse("FBS,Serum,,,\nDMEM,Base Media,,,\n").unwrap_err();
        assert!(matches!(err, PrepError::RecipeFormat { .. }));
        assert!(err.to_string().contains("First row must be the Base Media"));
    }

    #[test]
    fn test_second_row_must_be_serum() {
        let err = parse("DMEM,Base Media,,,\nEGF,Additive,,50,ng/mL\n").unwrap_err();
        assert!(err.to_string().contains("Second row must be the Serum"));
    }

    #[test]
    fn test_too_few_rows() {
        assert!(matches!(
            parse("DMEM,Base Media,,,\n"),
            Err(PrepError::RecipeFormat { .. })
        ));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(parse("DMEM,Base Media,,,\nFBS,Serum,lots,,\n").is_err());
        assert!(parse("DMEM,Base Media,,,\nFBS,Serum,150,,\n").is_err());
        assert!(parse("DMEM,Base Media,,,\nFBS,Serum,,,\nITS,Additive,0,,\n").is_err());
        assert!(parse("DMEM,Base Media,,,\nFBS,Serum,,,\nEGF,Additive,,-5,ng/mL\n").is_err());
    }
}
