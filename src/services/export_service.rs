use std::collections::HashMap;

use rust_xlsxwriter::*;
use uuid::Uuid;

use crate::error::Result;
use crate::models::proctoring::StoredProctoringRecord;
use crate::models::result::StoredResult;

pub const RESULTS_SHEET_NAME: &str = "Student Results";
pub const PROCTORING_SHEET_NAME: &str = "Proctoring";

const HEADER_BG: Color = Color::RGB(0x0F172A);
const ALT_ROW_1: Color = Color::RGB(0xF8FAFC);
const ALT_ROW_2: Color = Color::White;
const BORDER_COLOR: Color = Color::RGB(0xE2E8F0);

pub struct ExportService;

impl ExportService {
    /// Builds the results workbook. Each sheet has its header on the first
    /// row so it decodes back into named columns.
    pub fn generate_results_xlsx(
        results: &[StoredResult],
        proctoring: &[StoredProctoringRecord],
        exam_names: &HashMap<Uuid, String>,
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let exam_name = |id: &Uuid| {
            exam_names
                .get(id)
                .cloned()
                .unwrap_or_else(|| "(deleted exam)".to_string())
        };

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(RESULTS_SHEET_NAME)?;
        let columns = [
            ("StudentName", 32.0),
            ("ExamId", 40.0),
            ("ExamName", 30.0),
            ("Score", 10.0),
            ("TotalQuestions", 16.0),
        ];
        write_header(worksheet, &columns)?;

        for (idx, result) in results.iter().enumerate() {
            let row = 1 + idx as u32;
            let (base_fmt, center_fmt) = row_formats(idx);

            worksheet.write_string_with_format(row, 0, &result.student_email, &base_fmt)?;
            worksheet.write_string_with_format(row, 1, result.exam_id.to_string(), &base_fmt)?;
            worksheet.write_string_with_format(row, 2, exam_name(&result.exam_id), &base_fmt)?;
            worksheet.write_number_with_format(row, 3, result.score as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 4, result.total_questions as f64, &center_fmt)?;
        }
        finish_sheet(worksheet, results.len(), columns.len())?;

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(PROCTORING_SHEET_NAME)?;
        let columns = [
            ("StudentName", 32.0),
            ("ExamId", 40.0),
            ("ExamName", 30.0),
            ("TabSwitches", 14.0),
            ("Outcome", 14.0),
            ("RecordedAt", 22.0),
        ];
        write_header(worksheet, &columns)?;

        for (idx, record) in proctoring.iter().enumerate() {
            let row = 1 + idx as u32;
            let (base_fmt, center_fmt) = row_formats(idx);
            let outcome = if record.terminated { "Terminated" } else { "Submitted" };

            worksheet.write_string_with_format(row, 0, &record.student_email, &base_fmt)?;
            worksheet.write_string_with_format(row, 1, record.exam_id.to_string(), &base_fmt)?;
            worksheet.write_string_with_format(row, 2, exam_name(&record.exam_id), &base_fmt)?;
            worksheet.write_number_with_format(row, 3, record.tab_switches as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 4, outcome, &center_fmt)?;
            worksheet.write_string_with_format(
                row,
                5,
                record.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                &center_fmt,
            )?;
        }
        finish_sheet(worksheet, proctoring.len(), columns.len())?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

fn write_header(worksheet: &mut Worksheet, columns: &[(&str, f64)]) -> Result<()> {
    let header_format = Format::new()
        .set_bold()
        .set_font_size(10)
        .set_font_color(Color::White)
        .set_background_color(HEADER_BG)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(BORDER_COLOR);

    worksheet.set_row_height(0, 24)?;
    for (i, (name, width)) in columns.iter().enumerate() {
        worksheet.set_column_width(i as u16, *width)?;
        worksheet.write_string_with_format(0, i as u16, *name, &header_format)?;
    }
    Ok(())
}

fn row_formats(idx: usize) -> (Format, Format) {
    let bg = if idx % 2 == 0 { ALT_ROW_1 } else { ALT_ROW_2 };

    let base_fmt = Format::new()
        .set_font_size(10)
        .set_background_color(bg)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(BORDER_COLOR);
    let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
    (base_fmt, center_fmt)
}

fn finish_sheet(worksheet: &mut Worksheet, rows: usize, columns: usize) -> Result<()> {
    worksheet.set_freeze_panes(1, 0)?;
    if rows > 0 {
        worksheet.autofilter(0, 0, rows as u32, (columns - 1) as u16)?;
    }
    Ok(())
}
