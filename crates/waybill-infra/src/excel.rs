//! Excel export of a waybill allocation summary

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use waybill_domain::model::Waybill;
use waybill_domain::service::RateBreakdown;
use waybill_types::{Error, Result};

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> Error {
    Error::Excel(e.to_string())
}

/// Export drops, entity totals and the rate breakdown to an .xlsx file
pub fn export_summary_to_excel(
    waybill: &Waybill,
    breakdown: &RateBreakdown,
    output_path: &Path,
) -> Result<()> {
    let mut workbook = Workbook::new();

    let drops_sheet = workbook.add_worksheet();
    write_drops_sheet(drops_sheet, waybill)?;

    let entities_sheet = workbook.add_worksheet();
    write_entities_sheet(entities_sheet, waybill, breakdown)?;

    workbook.save(output_path).map_err(xlsx_err)?;
    Ok(())
}

fn write_drops_sheet(sheet: &mut Worksheet, waybill: &Waybill) -> Result<()> {
    sheet.set_name("Drops").map_err(xlsx_err)?;
    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format("#,##0.00");

    sheet
        .write_string_with_format(0, 0, format!("Waybill {}", waybill.waybill_number), &header_format)
        .map_err(xlsx_err)?;
    sheet.write_string(1, 0, "Truck CBM:").map_err(xlsx_err)?;
    sheet.write_number(1, 1, waybill.truck_cbm).map_err(xlsx_err)?;
    sheet.write_string(2, 0, "Rate:").map_err(xlsx_err)?;
    sheet
        .write_number_with_format(2, 1, waybill.rate, &money_format)
        .map_err(xlsx_err)?;

    let headers = ["Consignee", "Entity", "CBM", "Percentage", "Amount"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(4, col as u16, *header, &header_format)
            .map_err(xlsx_err)?;
    }

    for (idx, drop) in waybill.drops.iter().enumerate() {
        let row = (idx + 5) as u32;
        sheet.write_string(row, 0, &drop.consignee_name).map_err(xlsx_err)?;
        sheet.write_string(row, 1, &drop.entity_abbreviation).map_err(xlsx_err)?;
        sheet.write_number(row, 2, drop.cbm).map_err(xlsx_err)?;
        if let Some(pct) = drop.percentage {
            sheet.write_number(row, 3, pct).map_err(xlsx_err)?;
        }
        if let Some(amount) = drop.amount {
            sheet
                .write_number_with_format(row, 4, amount, &money_format)
                .map_err(xlsx_err)?;
        }
    }

    let total_row = (waybill.drops.len() + 5) as u32;
    sheet
        .write_string_with_format(total_row, 0, "Total", &header_format)
        .map_err(xlsx_err)?;
    sheet.write_number(total_row, 2, waybill.used_cbm()).map_err(xlsx_err)?;
    sheet
        .write_number(total_row, 3, waybill.total_percentage())
        .map_err(xlsx_err)?;
    sheet
        .write_number_with_format(total_row, 4, waybill.total_amount(), &money_format)
        .map_err(xlsx_err)?;

    sheet.set_column_width(0, 36).map_err(xlsx_err)?;
    sheet.set_column_width(1, 14).map_err(xlsx_err)?;
    Ok(())
}

fn write_entities_sheet(
    sheet: &mut Worksheet,
    waybill: &Waybill,
    breakdown: &RateBreakdown,
) -> Result<()> {
    sheet.set_name("Entities").map_err(xlsx_err)?;
    let header_format = Format::new().set_bold();

    let headers = ["Entity", "Total %", "Total Amount", "Status"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_err)?;
    }

    for (idx, entity) in waybill.entities.iter().enumerate() {
        let row = (idx + 1) as u32;
        sheet
            .write_string(row, 0, &entity.entity_abbreviation)
            .map_err(xlsx_err)?;
        sheet.write_number(row, 1, entity.total_percentage).map_err(xlsx_err)?;
        sheet.write_number(row, 2, entity.total_amount).map_err(xlsx_err)?;
        sheet
            .write_string(row, 3, entity.status.to_string())
            .map_err(xlsx_err)?;
    }

    let row = (waybill.entities.len() + 2) as u32;
    let lines = [
        ("Highest rate", breakdown.highest_rate),
        ("Additional adjustment", breakdown.additional_adjustment),
        ("Total rate", breakdown.total_rate),
    ];
    for (offset, (label, value)) in lines.iter().enumerate() {
        let r = row + offset as u32;
        sheet
            .write_string_with_format(r, 0, *label, &header_format)
            .map_err(xlsx_err)?;
        sheet.write_number(r, 1, *value).map_err(xlsx_err)?;
    }

    sheet.set_column_width(0, 24).map_err(xlsx_err)?;
    Ok(())
}
