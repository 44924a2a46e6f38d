use crate::domain::stats::FlatSummary;
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

const HEADERS: [&str; 11] = [
    "Id",
    "District",
    "Price",
    "Area",
    "Price per m²",
    "Rooms",
    "Floor",
    "Built year",
    "Market",
    "Scraped",
    "URL",
];

fn xlsx_err(what: &str) -> impl Fn(rust_xlsxwriter::XlsxError) -> ServerError + '_ {
    move |e| ServerError::XlsxError(format!("Failed to write {what}: {e}"))
}

fn write_opt_number(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
    what: &str,
) -> Result<(), ServerError> {
    if let Some(v) = value {
        ws.write_number(row, col, v).map_err(xlsx_err(what))?;
    }
    Ok(())
}

/// One sheet, one row per flat. Unknown values are left as empty cells.
pub fn flats_workbook(flats: &[FlatSummary]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(xlsx_err(header))?;
    }

    for (i, flat) in flats.iter().enumerate() {
        let r = (i + 1) as u32;

        worksheet
            .write_number(r, 0, flat.id as f64)
            .map_err(xlsx_err("id"))?;
        worksheet
            .write_string(r, 1, &flat.district)
            .map_err(xlsx_err("district"))?;
        write_opt_number(worksheet, r, 2, flat.price, "price")?;
        write_opt_number(worksheet, r, 3, flat.area, "area")?;
        write_opt_number(worksheet, r, 4, flat.price_per_sq_m, "price per m²")?;
        write_opt_number(worksheet, r, 5, flat.no_rooms.map(|v| v as f64), "rooms")?;
        write_opt_number(worksheet, r, 6, flat.no_floor.map(|v| v as f64), "floor")?;
        write_opt_number(worksheet, r, 7, flat.built_year.map(|v| v as f64), "built year")?;

        let market = match flat.is_primary {
            Some(true) => "primary",
            Some(false) => "secondary",
            None => "",
        };
        worksheet
            .write_string(r, 8, market)
            .map_err(xlsx_err("market"))?;
        worksheet
            .write_string(r, 9, flat.date_scraped.as_deref().unwrap_or(""))
            .map_err(xlsx_err("date scraped"))?;
        worksheet
            .write_string(r, 10, &flat.url)
            .map_err(xlsx_err("url"))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))
}

pub fn export_flats_xlsx(flats: &[FlatSummary]) -> ResultResp {
    let buffer = flats_workbook(flats)?;
    xlsx_response(buffer, "warsaw_flats.xlsx")
}
