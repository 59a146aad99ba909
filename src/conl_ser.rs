//! CONL output for quotes
//!
//! Quotes can be written as CONL so they sit alongside the holiday calendar
//! and other hand-edited data files.

use crate::types::{Breakdown, PricingResult, Selection};

/// Trait for types that can be serialized to CONL
pub trait ToConl {
    fn to_conl(&self) -> String;
}

/// Escape a string value if needed for CONL
fn escape_value(s: &str) -> String {
    // Values that need quoting: start/end with space, contain = or ;, or newlines
    if s.is_empty()
        || s.starts_with(' ')
        || s.ends_with(' ')
        || s.starts_with('"')
        || s.contains(';')
        || s.contains('=')
        || s.contains('\n')
        || s.contains('\r')
    {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}

impl ToConl for Selection {
    fn to_conl(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("trip_type = {}", self.trip_type.as_str()));
        lines.push(format!("plan = {}", escape_value(&self.plan_name)));
        if let Some(date) = self.date {
            lines.push(format!("date = {}", date.format("%Y-%m-%d")));
        }

        lines.push("party".to_string());
        lines.push(format!("  men = {}", self.party.men));
        lines.push(format!("  women = {}", self.party.women));
        lines.push(format!("  students = {}", self.party.students));

        if !self.rentals.is_empty() {
            lines.push("rentals".to_string());
            for (name, quantity) in &self.rentals {
                lines.push(format!("  {} = {}", escape_value(name), quantity));
            }
        }

        lines.join("\n") + "\n"
    }
}

fn breakdown_lines(breakdown: &Breakdown, lines: &mut Vec<String>) {
    if let Some(rate_type) = breakdown.rate_type {
        lines.push(format!("rate_type = {}", rate_type.as_str()));
    }
    lines.push(format!("pricing_available = {}", breakdown.pricing_available));
    if let Some(plan) = &breakdown.rule_plan {
        lines.push(format!("rule_plan = {}", escape_value(plan)));
        lines.push(format!("min_people = {}", breakdown.min_people_used));
        lines.push(format!("min_price = {}", breakdown.min_price_used));
        lines.push(format!("extra_count = {}", breakdown.extra_count));
        lines.push(format!("extra_charge = {}", breakdown.extra_charge_amount));
        lines.push(format!("shortage_count = {}", breakdown.shortage_count));
    }

    if !breakdown.category_charges.is_empty() || breakdown.residual_charge.is_some() {
        lines.push("passengers".to_string());
        for charge in &breakdown.category_charges {
            lines.push("  =".to_string());
            lines.push(format!("    category = {}", charge.category.as_str()));
            lines.push(format!("    count = {}", charge.count));
            lines.push(format!("    unit_price = {}", charge.unit_price));
            lines.push(format!("    amount = {}", charge.amount));
        }
        if let Some(residual) = &breakdown.residual_charge {
            lines.push("  =".to_string());
            lines.push("    category = other".to_string());
            lines.push(format!("    count = {}", residual.count));
            lines.push(format!("    unit_price = {}", residual.unit_price));
            lines.push(format!("    amount = {}", residual.amount));
        }
    }

    if !breakdown.rental_charges.is_empty() {
        lines.push("rentals".to_string());
        for charge in &breakdown.rental_charges {
            lines.push("  =".to_string());
            lines.push(format!("    name = {}", escape_value(&charge.name)));
            lines.push(format!("    quantity = {}", charge.quantity));
            lines.push(format!("    unit_price = {}", charge.unit_price));
            if let Some(refund) = charge.refund_per_unit {
                lines.push(format!("    refund_per_unit = {}", refund));
            }
            lines.push(format!("    amount = {}", charge.amount));
        }
    }
}

impl ToConl for PricingResult {
    fn to_conl(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("total = {}", self.total));
        lines.push(format!("subtotal = {}", self.subtotal));
        lines.push(format!("rental_total = {}", self.rental_total));
        if self.rental_refund > 0 {
            lines.push(format!("rental_refund = {}", self.rental_refund));
        }
        breakdown_lines(&self.breakdown, &mut lines);

        lines.join("\n") + "\n"
    }
}
