use crate::dto::attendance_dto::AttendanceExportRow;
use crate::error::{Error, Result};
use rust_xlsxwriter::*;

pub const CSV_HEADER: [&str; 6] = ["studentId", "fullName", "email", "joinedAt", "leftAt", "isPresent"];

pub struct ExportService;

impl ExportService {
    fn row_values(row: &AttendanceExportRow) -> [String; 6] {
        [
            row.student_id.to_string(),
            row.full_name.clone(),
            row.email.clone(),
            row.joined_at.clone(),
            row.left_at.clone(),
            row.is_present.to_string(),
        ]
    }

    /// Header plus one line per row. Every value is quoted, lines are `\n`
    /// separated and there is no trailing newline.
    pub fn attendance_csv(rows: &[AttendanceExportRow]) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);

        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(Self::row_values(row))?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| Error::Internal(format!("CSV flush failed: {}", e)))?;
        let mut text = String::from_utf8(data)
            .map_err(|e| Error::Internal(format!("CSV is not UTF-8: {}", e)))?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Single-sheet workbook with the same columns as the CSV export.
    pub fn attendance_xlsx(class_title: &str, rows: &[AttendanceExportRow]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Attendance")?;

        let header_bg = Color::RGB(0x0F172A);
        let border_color = Color::RGB(0xE2E8F0);
        let present_color = Color::RGB(0x10B981);
        let absent_color = Color::RGB(0xEF4444);

        let widths = [38.0, 28.0, 30.0, 26.0, 26.0, 12.0];
        for (i, width) in widths.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let title_format = Format::new()
            .set_font_size(14)
            .set_bold()
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 28)?;
        worksheet.merge_range(
            0,
            0,
            0,
            (CSV_HEADER.len() - 1) as u16,
            &format!("{} ({} participants)", class_title, rows.len()),
            &title_format,
        )?;

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 1;
        for (i, name) in CSV_HEADER.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let base_fmt = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let data_start_row = header_row + 1;
        for (idx, row) in rows.iter().enumerate() {
            let r = data_start_row + idx as u32;
            let values = Self::row_values(row);
            for (col, value) in values.iter().take(5).enumerate() {
                worksheet.write_string_with_format(r, col as u16, value, &base_fmt)?;
            }
            let flag_fmt = base_fmt
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_font_color(if row.is_present { present_color } else { absent_color });
            worksheet.write_boolean_with_format(r, 5, row.is_present, &flag_fmt)?;
        }

        worksheet.set_freeze_panes(data_start_row, 0)?;
        if !rows.is_empty() {
            worksheet.autofilter(
                header_row,
                0,
                data_start_row + rows.len() as u32 - 1,
                (CSV_HEADER.len() - 1) as u16,
            )?;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(full_name: &str, is_present: bool) -> AttendanceExportRow {
        AttendanceExportRow {
            student_id: Uuid::nil(),
            full_name: full_name.to_string(),
            email: "a@school.test".to_string(),
            joined_at: "2025-01-01T10:00:00.000Z".to_string(),
            left_at: String::new(),
            is_present,
        }
    }

    #[test]
    fn csv_quotes_every_value() {
        let csv = ExportService::attendance_csv(&[row("Ann \"Nan\" Lee", true)]).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(
            lines[0],
            "\"studentId\",\"fullName\",\"email\",\"joinedAt\",\"leftAt\",\"isPresent\""
        );
        assert_eq!(
            lines[1],
            "\"00000000-0000-0000-0000-000000000000\",\"Ann \"\"Nan\"\" Lee\",\"a@school.test\",\"2025-01-01T10:00:00.000Z\",\"\",\"true\""
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn csv_without_rows_is_just_the_header() {
        let csv = ExportService::attendance_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes =
            ExportService::attendance_xlsx("Algebra", &[row("Ann", true), row("Bob", false)]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        let empty = ExportService::attendance_xlsx("Algebra", &[]).unwrap();
        assert_eq!(&empty[..2], b"PK");
    }
}
