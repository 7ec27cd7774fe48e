//! # Printable HTML Documents
//!
//! Self-contained HTML documents styled for A4 print, returned by the
//! invoice-print and report-print endpoints. The client prints to PDF;
//! no server-side PDF rendering exists or is planned.
//!
//! Values arrive pre-computed from the valuation and levy engines — this
//! module only escapes and formats.

use aurex_core::currency::format_amount;
use aurex_valuation::levy::LevyBreakdown;

use crate::revenue::ExporterSummary;

/// Escape text for inclusion in HTML element content.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shared stylesheet for A4 print documents.
const A4_STYLE: &str = "\
@page { size: A4; margin: 20mm; }\n\
body { font-family: 'Helvetica Neue', Arial, sans-serif; color: #1a1a1a; font-size: 12px; }\n\
h1 { font-size: 20px; border-bottom: 2px solid #b8860b; padding-bottom: 6px; }\n\
table { width: 100%; border-collapse: collapse; margin-top: 12px; }\n\
th, td { border: 1px solid #ccc; padding: 6px 8px; text-align: left; }\n\
th { background: #f5efe0; }\n\
td.amount, th.amount { text-align: right; }\n\
tr.total td { font-weight: bold; background: #f5efe0; }\n\
.meta { margin-top: 8px; color: #444; }\n";

/// Everything the invoice print page needs, flattened.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    /// Invoice number (e.g. `INV-2026-000007`).
    pub invoice_number: String,
    /// Issue date, already formatted for display.
    pub issued_on: String,
    /// Exporter's registered name.
    pub exporter_name: String,
    /// Exporter's registry code.
    pub exporter_code: String,
    /// Job card reference the invoice bills.
    pub job_card_reference: String,
    /// Billing currency code.
    pub currency: String,
    /// Assay value snapshot in USD.
    pub assay_value_usd: f64,
    /// Assay value snapshot in GHS.
    pub assay_value_ghs: f64,
    /// The statutory levy decomposition.
    pub levies: LevyBreakdown,
    /// Invoice settlement status string.
    pub status: String,
}

/// Render one invoice as a printable A4 document.
pub fn render_invoice_document(doc: &InvoiceDocument) -> String {
    let levy_rows = [
        ("Assessment (exclusive)", doc.levies.total_exclusive),
        ("NHIL (2.5%)", doc.levies.nhil),
        ("GETFund (2.5%)", doc.levies.getfund),
        ("COVID-19 Levy (1%)", doc.levies.covid),
        ("Subtotal", doc.levies.sub_total),
        ("VAT (15%)", doc.levies.vat),
    ];

    let mut rows = String::new();
    for (label, amount) in levy_rows {
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"amount\">{}</td></tr>\n",
            html_escape(label),
            format_amount(amount)
        ));
    }
    rows.push_str(&format!(
        "<tr class=\"total\"><td>Grand Total ({})</td><td class=\"amount\">{}</td></tr>\n",
        html_escape(&doc.currency),
        format_amount(doc.levies.grand_total)
    ));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Invoice {number}</title>\n<style>\n{style}</style>\n</head>\n<body>\n\
         <h1>Assay Services Invoice</h1>\n\
         <div class=\"meta\">\n\
         <p><strong>Invoice:</strong> {number} &middot; <strong>Status:</strong> {status} &middot; <strong>Date:</strong> {date}</p>\n\
         <p><strong>Exporter:</strong> {exporter} ({code})</p>\n\
         <p><strong>Job Card:</strong> {job_card}</p>\n\
         <p><strong>Assay Value:</strong> USD {usd} / GHS {ghs} &middot; <strong>Rate:</strong> {rate:.2}%</p>\n\
         </div>\n\
         <table>\n<thead><tr><th>Charge</th><th class=\"amount\">Amount ({currency})</th></tr></thead>\n\
         <tbody>\n{rows}</tbody>\n</table>\n\
         </body>\n</html>\n",
        number = html_escape(&doc.invoice_number),
        status = html_escape(&doc.status),
        style = A4_STYLE,
        date = html_escape(&doc.issued_on),
        exporter = html_escape(&doc.exporter_name),
        code = html_escape(&doc.exporter_code),
        job_card = html_escape(&doc.job_card_reference),
        usd = format_amount(doc.assay_value_usd),
        ghs = format_amount(doc.assay_value_ghs),
        rate = doc.levies.rate_percent,
        currency = html_escape(&doc.currency),
        rows = rows,
    )
}

/// Render a per-exporter revenue report as a printable A4 document.
pub fn render_revenue_document(title: &str, summaries: &[ExporterSummary]) -> String {
    let mut rows = String::new();
    for s in summaries {
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"amount\">{}</td><td class=\"amount\">{}</td>\
             <td class=\"amount\">{}</td><td class=\"amount\">{}</td><td class=\"amount\">{:.2}</td></tr>\n",
            html_escape(&s.exporter),
            format_amount(s.revenue_usd),
            s.job_card_count,
            s.assay_count,
            format_amount(s.avg_job_card_value),
            s.market_share_percent,
        ));
    }
    let total: f64 = summaries.iter().map(|s| s.revenue_usd).sum();
    rows.push_str(&format!(
        "<tr class=\"total\"><td>Total</td><td class=\"amount\">{}</td><td colspan=\"4\"></td></tr>\n",
        format_amount(total)
    ));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{style}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n\
         <table>\n<thead><tr><th>Exporter</th><th class=\"amount\">Revenue (USD)</th>\
         <th class=\"amount\">Job Cards</th><th class=\"amount\">Assays</th>\
         <th class=\"amount\">Avg / Card</th><th class=\"amount\">Share %</th></tr></thead>\n\
         <tbody>\n{rows}</tbody>\n</table>\n\
         </body>\n</html>\n",
        title = html_escape(title),
        style = A4_STYLE,
        rows = rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurex_valuation::levy::assess;

    fn sample_doc() -> InvoiceDocument {
        InvoiceDocument {
            invoice_number: "INV-2026-000007".to_string(),
            issued_on: "2026-08-05".to_string(),
            exporter_name: "O'Brien & Sons <Gold>".to_string(),
            exporter_code: "OBR-01".to_string(),
            job_card_reference: "JC-2026-000042".to_string(),
            currency: "GHS".to_string(),
            assay_value_usd: 5915.73,
            assay_value_ghs: 70988.76,
            levies: assess(70988.76, 1.5),
            status: "pending".to_string(),
        }
    }

    #[test]
    fn invoice_document_is_complete_html() {
        let html = render_invoice_document(&sample_doc());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("size: A4"));
        assert!(html.contains("INV-2026-000007"));
        assert!(html.contains("JC-2026-000042"));
        assert!(html.contains("NHIL (2.5%)"));
        assert!(html.contains("Grand Total (GHS)"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn invoice_document_escapes_markup_in_names() {
        let html = render_invoice_document(&sample_doc());
        assert!(html.contains("O'Brien &amp; Sons &lt;Gold&gt;"));
        assert!(!html.contains("<Gold>"));
    }

    #[test]
    fn invoice_grand_total_is_formatted_to_two_places() {
        let doc = sample_doc();
        let html = render_invoice_document(&doc);
        let expected = aurex_core::currency::format_amount(doc.levies.grand_total);
        assert!(html.contains(&expected));
    }

    #[test]
    fn revenue_document_lists_each_exporter_and_total() {
        let summaries = vec![
            ExporterSummary {
                exporter: "Ashanti Gold Ltd".to_string(),
                revenue_usd: 1500.0,
                job_card_count: 2,
                assay_count: 3,
                avg_job_card_value: 750.0,
                market_share_percent: 85.71,
                last_activity: None,
            },
            ExporterSummary {
                exporter: "Bonte Mining".to_string(),
                revenue_usd: 250.0,
                job_card_count: 1,
                assay_count: 1,
                avg_job_card_value: 250.0,
                market_share_percent: 14.29,
                last_activity: None,
            },
        ];
        let html = render_revenue_document("Weekly Revenue", &summaries);
        assert!(html.contains("Weekly Revenue"));
        assert!(html.contains("Ashanti Gold Ltd"));
        assert!(html.contains("Bonte Mining"));
        assert!(html.contains("1750.00"));
    }
}
