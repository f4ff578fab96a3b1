//! Output formatting module

use serde::Serialize;
use waybill_app::SessionUpdate;
use waybill_domain::model::Waybill;
use waybill_domain::service::{generate_allocation_report, RateBreakdown};
use waybill_infra::api::SubDetail;
use waybill_types::{OutputFormat, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WaybillView<'a> {
    #[serde(flatten)]
    waybill: &'a Waybill,
    breakdown: &'a RateBreakdown,
}

pub fn output_waybill(
    output_format: OutputFormat,
    waybill: &Waybill,
    breakdown: &RateBreakdown,
) -> Result<()> {
    match output_format {
        OutputFormat::Json => {
            let view = WaybillView { waybill, breakdown };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Table => {
            print!("{}", generate_allocation_report(waybill, breakdown));
        }
    }
    Ok(())
}

/// Print what changed after a mutation
pub fn output_update(output_format: OutputFormat, message: &str, update: &SessionUpdate) -> Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(update)?);
        }
        OutputFormat::Table => {
            println!("{}", message);
            println!();
            println!("{:<38} {:>8} {:>8} {:>10}", "Consignee", "CBM", "%", "Amount");
            println!("{}", "-".repeat(67));
            for drop in &update.drops {
                println!(
                    "{:<38} {:>8.2} {:>8} {:>10}",
                    truncate(&drop.consignee_name, 37),
                    drop.cbm,
                    format_optional(drop.percentage),
                    format_optional(drop.amount)
                );
            }
            println!();
            for entity in &update.entities {
                println!(
                    "  {:<18} {:>8.2}% {:>10.2}  {}",
                    entity.entity_abbreviation,
                    entity.total_percentage,
                    entity.total_amount,
                    entity.status
                );
            }
            println!();
            output_breakdown_lines(&update.breakdown);
        }
    }
    Ok(())
}

pub fn output_breakdown(output_format: OutputFormat, breakdown: &RateBreakdown) -> Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(breakdown)?),
        OutputFormat::Table => output_breakdown_lines(breakdown),
    }
    Ok(())
}

fn output_breakdown_lines(breakdown: &RateBreakdown) {
    println!("Highest rate:          {:>10.2}", breakdown.highest_rate);
    println!("Additional adjustment: {:>10.2}", breakdown.additional_adjustment);
    println!("Total rate:            {:>10.2}", breakdown.total_rate);
}

pub fn output_waybill_list(output_format: OutputFormat, waybills: &[Waybill]) -> Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(waybills)?),
        OutputFormat::Table => {
            if waybills.is_empty() {
                println!("No waybills stored.");
                return Ok(());
            }
            println!(
                "{:<20} {:>6} {:>10} {:>10} {:>12}  {}",
                "Waybill", "Drops", "Used", "Truck", "Amount", "Updated"
            );
            println!("{}", "-".repeat(82));
            for waybill in waybills {
                println!(
                    "{:<20} {:>6} {:>10.2} {:>10.2} {:>12.2}  {}",
                    truncate(&waybill.waybill_number, 19),
                    waybill.drops.len(),
                    waybill.used_cbm(),
                    waybill.truck_cbm,
                    waybill.total_amount(),
                    waybill.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

pub fn output_subdetails(
    output_format: OutputFormat,
    waybill_number: &str,
    details: &[SubDetail],
) -> Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(details)?),
        OutputFormat::Table => {
            if details.is_empty() {
                println!("No sub-details for {}", waybill_number);
                return Ok(());
            }
            println!("{:<40} {:>10}  {}", "Description", "Quantity", "Unit");
            println!("{}", "-".repeat(60));
            for detail in details {
                println!(
                    "{:<40} {:>10.2}  {}",
                    truncate(&detail.description, 39),
                    detail.quantity,
                    detail.unit.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
