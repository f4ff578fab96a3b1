//! Plain-text allocation report for a waybill

use crate::model::Waybill;
use crate::service::fee::RateBreakdown;

pub fn generate_allocation_report(waybill: &Waybill, breakdown: &RateBreakdown) -> String {
    let mut report = String::new();
    report.push_str("==================================================\n");
    report.push_str(&format!("  Waybill {}\n", waybill.waybill_number));
    report.push_str("==================================================\n\n");

    if let Some(shipper) = &waybill.shipper {
        report.push_str(&format!("  Shipper:            {}\n", shipper.name));
    }
    report.push_str(&format!("  Truck capacity:     {:.2} CBM\n", waybill.truck_cbm));
    report.push_str(&format!("  Used:               {:.2} CBM\n", waybill.used_cbm()));
    report.push_str(&format!(
        "  Remaining:          {:.2} CBM{}\n",
        waybill.remaining_capacity(0.0),
        if waybill.is_capacity_full() { " (full)" } else { "" }
    ));
    report.push_str(&format!("  Rate:               {:.2} ({})\n", waybill.rate, waybill.amount_mode));
    report.push('\n');

    if waybill.drops.is_empty() {
        report.push_str("[No drops]\n\n");
    } else {
        report.push_str("[Drops]\n");
        report.push_str("-".repeat(78).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<38} {:<10} {:>8} {:>8} {:>10}\n",
            "Consignee", "Entity", "CBM", "%", "Amount"
        ));
        report.push_str("-".repeat(78).as_str());
        report.push('\n');
        for drop in &waybill.drops {
            report.push_str(&format!(
                "{:<38} {:<10} {:>8.2} {:>8} {:>10}\n",
                truncate_str(&drop.consignee_name, 37),
                truncate_str(&drop.entity_abbreviation, 9),
                drop.cbm,
                format_optional(drop.percentage),
                format_optional(drop.amount),
            ));
        }
        report.push_str(&format!(
            "{:<38} {:<10} {:>8.2} {:>8.2} {:>10.2}\n",
            "Total",
            "",
            waybill.used_cbm(),
            waybill.total_percentage(),
            waybill.total_amount()
        ));
        report.push('\n');
    }

    if !waybill.entities.is_empty() {
        report.push_str("[Entities]\n");
        report.push_str("-".repeat(50).as_str());
        report.push('\n');
        for entity in &waybill.entities {
            report.push_str(&format!(
                "{:<20} {:>8.2}% {:>10.2}  {}\n",
                truncate_str(&entity.entity_abbreviation, 19),
                entity.total_percentage,
                entity.total_amount,
                entity.status
            ));
        }
        report.push('\n');
    }

    report.push_str("[Rate]\n");
    report.push_str(&format!("  Highest rate:          {:.2}\n", breakdown.highest_rate));
    report.push_str(&format!("  Additional adjustment: {:.2}\n", breakdown.additional_adjustment));
    report.push_str(&format!("  Total rate:            {:.2}\n", breakdown.total_rate));
    report.push_str("==================================================\n");
    report
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(2)).collect();
        format!("{}..", truncated)
    } else {
        s.to_string()
    }
}
