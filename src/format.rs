//! Quote summary text and reservation email drafts

use crate::calendar::format_date_ja;
use crate::catalog::Catalog;
use crate::types::{CategoryCharge, PricingResult, Selection, TripType, Yen};

/// `36000` -> `36,000円`
pub fn format_yen(amount: Yen) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out.push('円');
    out
}

fn category_line(charge: &CategoryCharge) -> String {
    format!(
        "{} {} × {}名 = {}",
        charge.category.label(),
        format_yen(charge.unit_price),
        charge.count,
        format_yen(charge.amount)
    )
}

fn date_line(selection: &Selection, catalog: &Catalog) -> String {
    match selection.date {
        Some(date) => match catalog.holidays.holiday_name(date) {
            Some(name) => format!("日付: {} {}", format_date_ja(date), name),
            None => format!("日付: {}", format_date_ja(date)),
        },
        None => "日付: 未定".to_string(),
    }
}

/// Itemized quote, one entry per line
fn summary_lines(selection: &Selection, catalog: &Catalog, result: &PricingResult) -> Vec<String> {
    let breakdown = &result.breakdown;
    let mut lines = Vec::new();

    lines.push(format!(
        "【{}】プラン: {}",
        selection.trip_type.label(),
        selection.plan_name
    ));
    lines.push(date_line(selection, catalog));

    match selection.trip_type {
        TripType::Shared => {
            if breakdown.category_charges.is_empty() {
                lines.push("人数: 未入力".to_string());
            }
            lines.extend(breakdown.category_charges.iter().map(category_line));
        }
        TripType::Charter => {
            if let Some(rate_type) = breakdown.rate_type {
                lines.push(format!("料金区分: {}", rate_type.label()));
            }
            lines.push(format!(
                "人数: 大人男性 {}名 / 女性 {}名 / 学生 {}名",
                selection.party.men, selection.party.women, selection.party.students
            ));
            if !breakdown.pricing_available {
                lines.push("この日の仕立て料金は未設定です (お問い合わせください)".to_string());
            } else {
                lines.push(format!(
                    "仕立て料金 ({}名まで): {}",
                    breakdown.min_people_used,
                    format_yen(breakdown.min_price_used)
                ));
                if breakdown.shortage_count > 0 {
                    lines.push(format!(
                        "最少人数まであと{}名 (料金は変わりません)",
                        breakdown.shortage_count
                    ));
                }
                if breakdown.extra_count > 0 {
                    lines.push(format!(
                        "追加料金 ({}名): {}",
                        breakdown.extra_count,
                        format_yen(breakdown.extra_charge_amount)
                    ));
                    for charge in &breakdown.category_charges {
                        lines.push(format!("  {}", category_line(charge)));
                    }
                    if let Some(residual) = &breakdown.residual_charge {
                        lines.push(format!(
                            "  その他 {} × {}名 = {}",
                            format_yen(residual.unit_price),
                            residual.count,
                            format_yen(residual.amount)
                        ));
                    }
                }
            }
        }
    }

    if !breakdown.rental_charges.is_empty() {
        lines.push("レンタル:".to_string());
        for charge in &breakdown.rental_charges {
            let mut line = format!(
                "  {} {} × {} = {}",
                charge.name,
                format_yen(charge.unit_price),
                charge.quantity,
                format_yen(charge.amount)
            );
            if let Some(refund) = charge.refund_per_unit {
                line.push_str(&format!(" (返却時 1点につき{}返金)", format_yen(refund)));
            }
            lines.push(line);
        }
    }

    if let Some(attributes) = catalog.plan_attributes(selection.trip_type, &selection.plan_name) {
        if let Some(difficulty) = attributes.difficulty {
            lines.push(format!("難易度: {}", difficulty.label()));
        }
        if let Some(kit) = &attributes.tackle_kit {
            lines.push(format!("仕掛け: {} (船上でお買い求めください)", kit));
        }
    }

    if result.rental_total > 0 {
        lines.push(format!("料金: {}", format_yen(result.subtotal)));
        lines.push(format!("レンタル計: {}", format_yen(result.rental_total)));
    }
    lines.push(format!("合計: {}", format_yen(result.total)));
    if result.rental_refund > 0 {
        lines.push(format!("(レンタル返却時に{}を返金します)", format_yen(result.rental_refund)));
    }

    lines
}

/// Human-readable quote
pub fn render_summary(selection: &Selection, catalog: &Catalog, result: &PricingResult) -> String {
    summary_lines(selection, catalog, result).join("\n") + "\n"
}

/// Pre-filled reservation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Percent-encode an address list, keeping `@` and `,` readable
fn encode_address(to: &str) -> String {
    urlencoding::encode(to).replace("%40", "@").replace("%2C", ",")
}

impl EmailDraft {
    /// `mailto:` link with percent-encoded subject and body
    pub fn mailto(&self) -> String {
        // Mail clients expect CRLF line breaks in a mailto body
        let body = self.body.replace('\n', "\r\n");
        format!(
            "mailto:{}?subject={}&body={}",
            encode_address(&self.to),
            urlencoding::encode(&self.subject),
            urlencoding::encode(&body)
        )
    }
}

/// Draft an email requesting the quoted reservation
pub fn email_draft(selection: &Selection, catalog: &Catalog, result: &PricingResult, to: Option<&str>) -> EmailDraft {
    let date = selection
        .date
        .map(format_date_ja)
        .unwrap_or_else(|| "日付未定".to_string());
    let subject = format!(
        "【予約申込】{} {} {}",
        selection.trip_type.label(),
        selection.plan_name,
        date
    );

    let mut body = String::from("下記の内容で予約を申し込みます。\n\n");
    for line in summary_lines(selection, catalog, result) {
        body.push_str(&line);
        body.push('\n');
    }
    body.push_str("\nお名前: \n電話番号: \n当日の連絡先: \n備考: \n");

    EmailDraft {
        to: to
            .map(str::to_string)
            .or_else(|| catalog.contact_email.clone())
            .unwrap_or_default(),
        subject,
        body,
    }
}
