use crate::error::AppError;
use crate::uploads::UploadDir;
use common::model::report::{ReportDocument, ReportEntry, ReportPage};
use genpdf::elements::{Break, Image as PdfImage, LinearLayout, PageBreak, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::Document;
use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage, GenericImageView};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PAGE_WIDTH_INCH: f64 = 8.27;
const MARGIN_MM: f64 = 10.0;
const IMAGE_DPI: f64 = 150.0;
/// Leaf photos are printed at most this large, in CSS pixels.
const IMAGE_MAX_CSS_PX: f64 = 200.0;

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::Render(e.to_string())
}

/// Load the font family from `font_dir`, preferring Arial over LiberationSans.
fn load_font(
    font_dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, AppError> {
    if let Ok(family) = genpdf::fonts::from_files(font_dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(font_dir, "LiberationSans", None).map_err(|e| {
        AppError::Render(format!("no usable font in {}: {}", font_dir.display(), e))
    })
}

fn configure_document(font_dir: &Path, title: &str) -> Result<Document, AppError> {
    let mut doc = Document::new(load_font(font_dir)?);
    doc.set_title(title);
    doc.set_font_size(10);
    doc.set_line_spacing(1.15);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

fn labeled(label: &str, value: impl Into<String>, value_style: Style) -> Paragraph {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(format!("{label}: "), Style::new().bold()));
    p.push(StyledString::new(value.into(), value_style));
    p
}

/// Downscales the image to the print box, flattens alpha over white, and
/// writes it as an 8-bit RGB PNG temp file that genpdf can embed.
fn embed_image(
    bytes: &[u8],
    temp_files: &mut Vec<NamedTempFile>,
) -> Result<PdfImage, AppError> {
    let margin_in = MARGIN_MM / 25.4_f64;
    let content_target_px = (PAGE_WIDTH_INCH - 2.0 * margin_in) * IMAGE_DPI;
    let max_target_px = IMAGE_MAX_CSS_PX * IMAGE_DPI / 96.0;

    let img = load_from_memory(bytes).map_err(render_error)?;
    let (orig_w, orig_h) = img.dimensions();
    let (orig_w_f, orig_h_f) = (orig_w as f64, orig_h as f64);

    let scale = (content_target_px / orig_w_f)
        .min(max_target_px / orig_w_f)
        .min(max_target_px / orig_h_f)
        .min(1.0);

    let resized: DynamicImage = if scale >= 1.0 {
        img
    } else {
        let new_w = (orig_w_f * scale).max(1.0).round() as u32;
        let new_h = (orig_h_f * scale).max(1.0).round() as u32;
        img.resize(new_w, new_h, FilterType::Lanczos3)
    };

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut tmp = NamedTempFile::new()?;
    {
        let mut encoder = PngEncoder::new(tmp.as_file_mut(), w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header().map_err(render_error)?;
        writer.write_image_data(&raw).map_err(render_error)?;
    }

    let path: PathBuf = tmp.path().to_path_buf();
    let mut element = PdfImage::from_path(path).map_err(render_error)?;
    element.set_dpi(IMAGE_DPI);
    temp_files.push(tmp);
    Ok(element)
}

fn push_page_header(doc: &mut Document, report: &ReportDocument, page: &ReportPage) {
    doc.push(Paragraph::new(format!("Page {} of {}", page.number, page.total_pages)));
    doc.push(Paragraph::new(page.organization_header.as_str()));
    doc.push(Break::new(1));

    let mut title = Paragraph::new("");
    title.push(StyledString::new(
        report.title.as_str(),
        Style::new().bold().with_font_size(14),
    ));
    doc.push(title);
    doc.push(Paragraph::new(format!("Printed on {}", report.printed_at)));
    doc.push(Break::new(1));

    let plain = Style::new();
    let contact = &page.contact;
    let mut block = LinearLayout::vertical();
    block.push(labeled("Name", contact.name.as_str(), plain));
    block.push(labeled("Position", contact.position.as_str(), plain));
    block.push(labeled("Department", contact.department.as_str(), plain));
    block.push(labeled("Organization", contact.organization.as_str(), plain));
    block.push(labeled("Email", contact.email.as_str(), plain));
    block.push(labeled("Phone", contact.phone.as_str(), plain));
    doc.push(block);
    doc.push(Break::new(1));
}

fn push_entry(
    doc: &mut Document,
    entry: &ReportEntry,
    uploads: &UploadDir,
    temp_files: &mut Vec<NamedTempFile>,
) {
    let embedded = std::fs::read(uploads.path_of(&entry.image_url))
        .map_err(AppError::from)
        .and_then(|bytes| embed_image(&bytes, temp_files));
    match embedded {
        Ok(image) => doc.push(image),
        Err(e) => {
            log::warn!("Image {} left out of report: {}", entry.image_url, e);
            doc.push(Paragraph::new("[no image]"));
        }
    }

    let plain = Style::new();
    let mut details = LinearLayout::vertical();
    details.push(labeled("No.", entry.index.to_string(), plain));
    details.push(labeled("Classified by", entry.submitter.as_str(), plain));
    details.push(labeled("Species found", entry.best_predicted.as_str(), Style::new().bold()));
    details.push(labeled("Confidence", format!("{:.2}%", entry.confidence_score), plain));
    details.push(labeled("Recorded", entry.captured_at.as_str(), plain));
    details.push(labeled(
        "Location",
        format!("{}, {}", entry.latitude, entry.longitude),
        plain,
    ));
    details.push(labeled(
        "Processing time",
        format!("{:.2} s", entry.process_time / 1000.0),
        plain,
    ));
    doc.push(details);
    doc.push(Break::new(1));
}

/// Renders the laid-out report into PDF bytes. Blocking; run it off the
/// async executor.
pub fn render(
    report: &ReportDocument,
    uploads: &UploadDir,
    font_dir: &Path,
) -> Result<Vec<u8>, AppError> {
    let mut doc = configure_document(font_dir, &report.title)?;

    // Keep temporary PNGs alive until rendering finishes
    let mut temp_files: Vec<NamedTempFile> = Vec::new();

    for (i, page) in report.pages.iter().enumerate() {
        if i > 0 {
            doc.push(PageBreak::new());
        }
        push_page_header(&mut doc, report, page);
        for entry in &page.entries {
            push_entry(&mut doc, entry, uploads, &mut temp_files);
        }
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes).map_err(render_error)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fonts_are_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path(), 1024).unwrap();
        let report = ReportDocument {
            title: "t".into(),
            printed_at: "now".into(),
            pages: vec![],
        };
        let err = render(&report, &uploads, &dir.path().join("no-fonts")).unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }

    #[test]
    fn embedded_images_are_downscaled_pngs() {
        let mut source = Vec::new();
        DynamicImage::new_rgb8(1200, 800)
            .write_to(&mut std::io::Cursor::new(&mut source), image::ImageFormat::Png)
            .unwrap();

        let mut temp_files = Vec::new();
        embed_image(&source, &mut temp_files).unwrap();
        assert_eq!(temp_files.len(), 1);

        let written = load_from_memory(&std::fs::read(temp_files[0].path()).unwrap()).unwrap();
        let (w, h) = written.dimensions();
        assert!(w <= 313 && h <= 313, "got {w}x{h}");
    }
}
