//! Invoice PDF rendering
//!
//! Fixed A4 template drawn with the built-in Helvetica fonts. Optional
//! sections (tax, discount, payment, notes) appear only when present.

use crate::config::InvoiceConfig;
use crate::error::{LeadflowError, Result};
use crate::services::currency::format_minor_units_win_ansi;
use chrono::{TimeZone, Utc};
use leadflow_types::InvoiceData;
use printpdf::lopdf::{self, Object, StringFormat};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, OffsetDateTime, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 190.0;
const CONTENT_TOP: f32 = 270.0;
const CONTENT_BOTTOM: f32 = 30.0;
const ROW_HEIGHT: f32 = 7.0;

// Table column x positions
const COL_DESCRIPTION: f32 = MARGIN_LEFT;
const COL_QUANTITY: f32 = 120.0;
const COL_UNIT: f32 = 138.0;
const COL_AMOUNT: f32 = 165.0;

const MAX_DESCRIPTION_CHARS: usize = 55;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Cursor over the current page; starts a continuation page when full
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: &'a Fonts,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.fonts.bold } else { &self.fonts.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self) {
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(self.y)), false),
                (Point::new(Mm(MARGIN_RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(line);
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
    }

    /// Make room for `needed` millimetres, breaking the page if necessary
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed >= CONTENT_BOTTOM {
            return false;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = CONTENT_TOP;
        self.pages += 1;
        true
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// Stable identifier for the document and trailer `/ID`
fn document_id(invoice: &InvoiceData) -> String {
    format!("leadflow-invoice-{}", invoice.invoice_number)
}

/// Midnight UTC of the issue date; used for every document date field
fn document_date(invoice: &InvoiceData) -> Result<OffsetDateTime> {
    let midnight = invoice
        .issue_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| LeadflowError::Render(format!("Invalid issue date {}", invoice.issue_date)))?;
    let timestamp = Utc.from_utc_datetime(&midnight).timestamp();

    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| LeadflowError::Render(format!("Issue date out of range: {}", e)))
}

/// Replace the random instance id printpdf writes into the trailer
fn pin_trailer_id(bytes: &[u8], document_id: &str) -> Result<Vec<u8>> {
    let mut doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| LeadflowError::Render(format!("Failed to reload PDF: {}", e)))?;

    let id = Object::String(document_id.as_bytes().to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

    let mut out = Vec::with_capacity(bytes.len());
    doc.save_to(&mut out)
        .map_err(|e| LeadflowError::Render(format!("Failed to write PDF: {}", e)))?;
    Ok(out)
}

/// Renders [`InvoiceData`] into an in-memory PDF
pub struct InvoiceRenderer {
    config: InvoiceConfig,
}

impl InvoiceRenderer {
    pub fn new(config: InvoiceConfig) -> Self {
        Self { config }
    }

    /// Render the invoice; either the complete document or an error, never a partial buffer
    pub fn render(&self, invoice: &InvoiceData) -> Result<Vec<u8>> {
        let title = format!("{} {}", self.config.title, invoice.invoice_number);
        let document_id = document_id(invoice);
        let stamp = document_date(invoice)?;
        let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Content");
        let doc = doc
            .with_document_id(document_id.clone())
            .with_creation_date(stamp)
            .with_mod_date(stamp)
            .with_metadata_date(stamp);

        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| LeadflowError::Render(format!("Failed to load font: {}", e)))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| LeadflowError::Render(format!("Failed to load font: {}", e)))?,
        };

        let pages = {
            let mut writer = PageWriter {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                fonts: &fonts,
                y: CONTENT_TOP,
                pages: 1,
            };
            self.draw(&mut writer, invoice);
            writer.pages
        };

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| LeadflowError::Render(format!("Failed to write PDF: {}", e)))?;
        let bytes = pin_trailer_id(&bytes, &document_id)?;

        log::info!(
            "Rendered invoice {} ({} page(s), {} bytes)",
            invoice.invoice_number,
            pages,
            bytes.len()
        );
        Ok(bytes)
    }

    /// Render on the blocking pool so async callers are not stalled
    pub async fn render_async(&self, invoice: InvoiceData) -> Result<Vec<u8>> {
        let renderer = InvoiceRenderer::new(self.config.clone());
        tokio::task::spawn_blocking(move || renderer.render(&invoice))
            .await
            .map_err(|e| LeadflowError::Render(format!("Rendering task failed: {}", e)))?
    }

    /// Check PDF magic bytes
    pub fn validate_pdf(&self, pdf_data: &[u8]) -> bool {
        pdf_data.len() >= 4 && pdf_data.starts_with(b"%PDF")
    }

    fn draw(&self, w: &mut PageWriter<'_>, invoice: &InvoiceData) {
        let currency = invoice.currency.as_str();

        // Header: title left, seller block right
        w.text(&self.config.title, 24.0, MARGIN_LEFT, true);
        w.text(&invoice.seller.name, 12.0, 130.0, true);
        w.advance(8.0);
        w.text(&format!("Invoice #: {}", invoice.invoice_number), 10.0, MARGIN_LEFT, false);
        let mut seller_y = w.y;
        for line in invoice
            .seller
            .address_lines
            .iter()
            .chain(invoice.seller.email.iter())
            .chain(invoice.seller.phone.iter())
        {
            w.layer.use_text(line.as_str(), 9.0, Mm(130.0), Mm(seller_y), &w.fonts.regular);
            seller_y -= 5.0;
        }
        if let Some(tax_id) = &invoice.seller.tax_id {
            w.layer.use_text(format!("Tax ID: {}", tax_id), 9.0, Mm(130.0), Mm(seller_y), &w.fonts.regular);
            seller_y -= 5.0;
        }

        w.advance(6.0);
        w.text(&format!("Date: {}", invoice.issue_date.format("%B %-d, %Y")), 10.0, MARGIN_LEFT, false);
        if let Some(due) = invoice.due_date {
            w.advance(6.0);
            w.text(&format!("Due: {}", due.format("%B %-d, %Y")), 10.0, MARGIN_LEFT, false);
        }
        w.advance(6.0);
        w.text(&format!("Status: {}", invoice.status.to_uppercase()), 10.0, MARGIN_LEFT, false);

        // Bill-to block starts below whichever header column ran longer
        w.y = w.y.min(seller_y) - 12.0;
        w.text("Bill To:", 11.0, MARGIN_LEFT, true);
        w.advance(6.0);
        w.text(&invoice.customer.name, 10.0, MARGIN_LEFT, false);
        for line in invoice
            .customer
            .address_lines
            .iter()
            .chain(invoice.customer.email.iter())
        {
            w.advance(5.0);
            w.text(line, 9.0, MARGIN_LEFT, false);
        }

        // Line items
        w.advance(14.0);
        self.draw_table_header(w);
        for item in &invoice.line_items {
            if w.ensure_space(ROW_HEIGHT) {
                self.draw_table_header(w);
            }
            w.text(&truncate(&item.description, MAX_DESCRIPTION_CHARS), 9.0, COL_DESCRIPTION, false);
            w.text(&item.quantity.to_string(), 9.0, COL_QUANTITY, false);
            w.text(&format_minor_units_win_ansi(item.unit_amount, currency), 9.0, COL_UNIT, false);
            w.text(&format_minor_units_win_ansi(item.amount, currency), 9.0, COL_AMOUNT, false);
            w.advance(ROW_HEIGHT);
        }

        // Totals
        w.ensure_space(40.0);
        w.rule();
        w.advance(7.0);
        self.total_row(w, "Subtotal:", invoice.subtotal, currency, false);
        if let Some(discount) = invoice.discount_amount.filter(|d| *d != 0) {
            self.total_row(w, "Discount:", -discount.abs(), currency, false);
        }
        if let Some(tax) = invoice.tax_amount {
            let label = match invoice.tax_rate_percent {
                Some(rate) => format!("Tax ({}%):", rate),
                None => "Tax:".to_string(),
            };
            self.total_row(w, &label, tax, currency, false);
        }
        self.total_row(w, "Total:", invoice.total, currency, true);

        if let Some(payment) = &invoice.payment {
            w.ensure_space(30.0);
            w.advance(8.0);
            w.text("Payment Information", 11.0, MARGIN_LEFT, true);
            w.advance(6.0);
            let method = match (&payment.brand, &payment.last4) {
                (Some(brand), Some(last4)) => format!("{} ending in {}", brand, last4),
                (None, Some(last4)) => format!("{} ending in {}", payment.method, last4),
                _ => payment.method.clone(),
            };
            w.text(&format!("Method: {}", method), 9.0, MARGIN_LEFT, false);
            if let Some(paid_at) = payment.paid_at {
                w.advance(5.0);
                w.text(&format!("Paid on: {}", paid_at.format("%B %-d, %Y")), 9.0, MARGIN_LEFT, false);
            }
            if let Some(txn) = &payment.transaction_id {
                w.advance(5.0);
                w.text(&format!("Transaction ID: {}", txn), 9.0, MARGIN_LEFT, false);
            }
        }

        if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            w.ensure_space(20.0);
            w.advance(10.0);
            w.text("Notes", 11.0, MARGIN_LEFT, true);
            for line in notes.lines() {
                w.ensure_space(ROW_HEIGHT);
                w.advance(5.0);
                w.text(line, 9.0, MARGIN_LEFT, false);
            }
        }

        // Footer on the last page
        w.y = 15.0;
        w.text(&self.config.footer, 9.0, MARGIN_LEFT, false);
    }

    fn draw_table_header(&self, w: &mut PageWriter<'_>) {
        w.text("Description", 10.0, COL_DESCRIPTION, true);
        w.text("Qty", 10.0, COL_QUANTITY, true);
        w.text("Unit Price", 10.0, COL_UNIT, true);
        w.text("Amount", 10.0, COL_AMOUNT, true);
        w.advance(3.0);
        w.rule();
        w.advance(6.0);
    }

    fn total_row(&self, w: &mut PageWriter<'_>, label: &str, amount: i64, currency: &str, bold: bool) {
        w.text(label, 10.0, COL_UNIT - 10.0, bold);
        w.text(&format_minor_units_win_ansi(amount, currency), 10.0, COL_AMOUNT, bold);
        w.advance(6.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use leadflow_types::{InvoiceLineItem, InvoiceParty, PaymentInfo};

    fn sample_invoice(items: usize) -> InvoiceData {
        InvoiceData {
            invoice_number: "INV-2024-0042".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 31),
            status: "paid".to_string(),
            seller: InvoiceParty {
                name: "Leadflow Inc.".to_string(),
                email: Some("billing@leadflow.io".to_string()),
                address_lines: vec!["1 Market St".to_string(), "San Francisco, CA".to_string()],
                ..InvoiceParty::default()
            },
            customer: InvoiceParty {
                name: "Acme Robotics".to_string(),
                email: Some("ap@acme.io".to_string()),
                ..InvoiceParty::default()
            },
            line_items: (0..items)
                .map(|i| InvoiceLineItem {
                    description: format!("Growth plan seat {}", i + 1),
                    quantity: 1,
                    unit_amount: 4_900,
                    amount: 4_900,
                })
                .collect(),
            subtotal: 4_900 * items as i64,
            tax_amount: Some(931),
            tax_rate_percent: Some(19.0),
            discount_amount: None,
            total: 4_900 * items as i64 + 931,
            currency: "usd".to_string(),
            payment: Some(PaymentInfo {
                method: "card".to_string(),
                brand: Some("Visa".to_string()),
                last4: Some("4242".to_string()),
                paid_at: Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()),
                transaction_id: Some("pi_123".to_string()),
            }),
            notes: Some("Thanks for choosing annual billing.".to_string()),
        }
    }

    #[test]
    fn test_render_produces_pdf() {
        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let bytes = renderer.render(&sample_invoice(3)).unwrap();
        assert!(renderer.validate_pdf(&bytes));
    }

    #[test]
    fn test_render_without_optional_sections() {
        let mut invoice = sample_invoice(1);
        invoice.tax_amount = None;
        invoice.payment = None;
        invoice.notes = None;
        invoice.due_date = None;

        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let bytes = renderer.render(&invoice).unwrap();
        assert!(renderer.validate_pdf(&bytes));
    }

    #[test]
    fn test_render_many_line_items() {
        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let bytes = renderer.render(&sample_invoice(80)).unwrap();
        assert!(renderer.validate_pdf(&bytes));
    }

    #[tokio::test]
    async fn test_render_async() {
        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let bytes = renderer.render_async(sample_invoice(2)).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let invoice = sample_invoice(3);

        let first = renderer.render(&invoice).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = renderer.render(&invoice).unwrap();

        assert_eq!(first, second);
        assert!(renderer.validate_pdf(&first));

        let mut other = invoice.clone();
        other.invoice_number = "INV-2024-0043".to_string();
        assert_ne!(renderer.render(&other).unwrap(), first);
    }

    #[test]
    fn test_render_pins_document_dates() {
        let bytes = InvoiceRenderer::new(InvoiceConfig::default())
            .render(&sample_invoice(1))
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("D:20240301000000"));
    }

    #[test]
    fn test_render_rupee_invoice() {
        let mut invoice = sample_invoice(2);
        invoice.currency = "inr".to_string();

        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        let bytes = renderer.render(&invoice).unwrap();
        assert!(renderer.validate_pdf(&bytes));
    }

    #[test]
    fn test_validate_pdf_rejects_garbage() {
        let renderer = InvoiceRenderer::new(InvoiceConfig::default());
        assert!(!renderer.validate_pdf(b""));
        assert!(!renderer.validate_pdf(b"AB"));
        assert!(!renderer.validate_pdf(b"Not a PDF file"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
    }
}
