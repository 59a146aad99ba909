//! Quote computation for shared-boat and charter trips
//!
//! `price` is a pure function of the selection and the catalog: every call
//! recomputes the whole quote, and missing catalog data prices as zero
//! rather than failing.

use crate::calendar;
use crate::catalog::{Catalog, Fare};
use crate::types::{
    Breakdown, CategoryCharge, PartyCounts, PricingResult, RentalCharge, ResidualCharge, Selection, TripType, Yen,
    OVERAGE_ORDER,
};

/// Price a selection against the catalog
pub fn price(selection: &Selection, catalog: &Catalog) -> PricingResult {
    let rental_charges = price_rentals(selection, catalog);
    let rental_total = rental_charges
        .iter()
        .fold(0, |sum: Yen, charge| sum.saturating_add(charge.amount));
    let rental_refund = rental_charges
        .iter()
        .fold(0, |sum: Yen, charge| sum.saturating_add(charge.refund()));

    let mut breakdown = match selection.trip_type {
        TripType::Shared => price_shared(selection, catalog),
        TripType::Charter => price_charter(selection, catalog),
    };
    let subtotal = match selection.trip_type {
        TripType::Shared => breakdown
            .category_charges
            .iter()
            .fold(0, |sum: Yen, charge| sum.saturating_add(charge.amount)),
        TripType::Charter => breakdown.min_price_used.saturating_add(breakdown.extra_charge_amount),
    };
    breakdown.rental_charges = rental_charges;

    PricingResult {
        total: subtotal.saturating_add(rental_total),
        subtotal,
        rental_total,
        rental_refund,
        breakdown,
    }
}

/// Rental lines with a resolvable, non-zero price
fn price_rentals(selection: &Selection, catalog: &Catalog) -> Vec<RentalCharge> {
    let mut charges = Vec::new();

    for (name, &quantity) in &selection.rentals {
        if quantity == 0 {
            continue;
        }
        let Some(item) = catalog.resolve_rental(selection.trip_type, &selection.plan_name, name) else {
            tracing::debug!(rental = %name, plan = %selection.plan_name, "rental has no price, skipping");
            continue;
        };
        if item.informational || item.unit_price == 0 {
            continue;
        }
        charges.push(RentalCharge {
            name: item.name,
            quantity,
            unit_price: item.unit_price,
            refund_per_unit: item.refund_per_unit,
            amount: item.unit_price.saturating_mul(Yen::from(quantity)),
        });
    }

    charges
}

fn price_shared(selection: &Selection, catalog: &Catalog) -> Breakdown {
    let fare = catalog
        .shared_fare(&selection.plan_name)
        .copied()
        .unwrap_or_default();

    let category_charges = OVERAGE_ORDER
        .iter()
        .filter_map(|&category| {
            let count = selection.party.get(category);
            (count > 0).then(|| {
                let unit_price = fare.get(category);
                CategoryCharge {
                    category,
                    count,
                    unit_price,
                    amount: unit_price.saturating_mul(Yen::from(count)),
                }
            })
        })
        .collect();

    Breakdown {
        pricing_available: true,
        category_charges,
        ..Breakdown::default()
    }
}

fn price_charter(selection: &Selection, catalog: &Catalog) -> Breakdown {
    let rate_type = calendar::resolve(selection.date, &catalog.holidays);

    let Some((rule_plan, rule)) = catalog.charter_rule(&selection.plan_name, rate_type) else {
        tracing::debug!(
            plan = %selection.plan_name,
            rate_type = rate_type.as_str(),
            "no charter rule, pricing unavailable"
        );
        return Breakdown {
            rate_type: Some(rate_type),
            pricing_available: false,
            ..Breakdown::default()
        };
    };

    // The minimum follows the live shared-boat price whenever there is one
    let reference = catalog.reference_fare(&selection.plan_name).copied();
    let min_people = rule.min_people;
    let min_price = match reference {
        Some(fare) if fare.men > 0 => fare.men.saturating_mul(Yen::from(min_people)),
        _ => rule.min_price.unwrap_or(0),
    };

    let total_people = selection.party.total();
    let mut breakdown = Breakdown {
        rate_type: Some(rate_type),
        pricing_available: true,
        rule_plan: Some(rule_plan.to_string()),
        min_people_used: min_people,
        min_price_used: min_price,
        ..Breakdown::default()
    };

    if total_people > min_people {
        let extra = total_people - min_people;
        let overage = allocate_overage(extra, &selection.party, &reference.unwrap_or_default());
        breakdown.extra_count = extra;
        breakdown.extra_charge_amount = overage.amount;
        breakdown.category_charges = overage.charges;
        breakdown.residual_charge = overage.residual;
    } else if total_people < min_people {
        breakdown.shortage_count = min_people - total_people;
    }

    breakdown
}

/// Charges for passengers beyond a charter's minimum headcount
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overage {
    pub charges: Vec<CategoryCharge>,
    pub residual: Option<ResidualCharge>,
    pub amount: Yen,
}

/// Bill `extra` passengers category by category in `OVERAGE_ORDER`.
///
/// Anyone left once the party is exhausted is charged the rounded mean of
/// the three fares.
pub fn allocate_overage(extra: u32, party: &PartyCounts, fare: &Fare) -> Overage {
    let mut overage = Overage::default();
    let mut remaining = extra;

    for category in OVERAGE_ORDER {
        if remaining == 0 {
            break;
        }
        let count = party.get(category).min(remaining);
        if count == 0 {
            continue;
        }
        let unit_price = fare.get(category);
        let amount = unit_price.saturating_mul(Yen::from(count));
        overage.charges.push(CategoryCharge {
            category,
            count,
            unit_price,
            amount,
        });
        overage.amount = overage.amount.saturating_add(amount);
        remaining -= count;
    }

    if remaining > 0 {
        let sum = fare
            .men
            .saturating_add(fare.women)
            .saturating_add(fare.students);
        // sum / 3 never lands on .5, so this rounds to nearest
        let unit_price = sum.saturating_add(1) / 3;
        let amount = unit_price.saturating_mul(Yen::from(remaining));
        overage.residual = Some(ResidualCharge {
            count: remaining,
            unit_price,
            amount,
        });
        overage.amount = overage.amount.saturating_add(amount);
    }

    overage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::HolidayCalendar;
    use crate::catalog::tests::sample;
    use crate::types::{PersonCategory, RateType};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2025-05-07 is a Wednesday
    fn selection(trip_type: TripType, plan: &str, party: PartyCounts) -> Selection {
        let mut selection = Selection::new(date(2025, 5, 7), plan);
        selection.trip_type = trip_type;
        selection.party = party;
        selection
    }

    fn assert_total_invariant(result: &PricingResult) {
        assert_eq!(result.total, result.subtotal + result.rental_total);
    }

    #[test]
    fn test_shared_fare() {
        let catalog = sample();
        let result = price(&selection(TripType::Shared, "アジ", PartyCounts::new(2, 1, 0)), &catalog);
        assert_eq!(result.total, 26000);
        assert_eq!(result.subtotal, 26000);
        assert_eq!(result.rental_total, 0);
        assert_eq!(result.breakdown.category_charges.len(), 2);
        assert_eq!(result.breakdown.category_charges[1].category, PersonCategory::Women);
        assert_eq!(result.breakdown.category_charges[1].amount, 8000);
        assert!(result.breakdown.rate_type.is_none());
        assert_total_invariant(&result);
    }

    #[test]
    fn test_shared_without_fare_is_free() {
        let catalog = sample();
        let result = price(&selection(TripType::Shared, "体験", PartyCounts::new(3, 0, 2)), &catalog);
        assert_eq!(result.total, 0);
        let result = price(&selection(TripType::Shared, "存在しない", PartyCounts::new(3, 0, 2)), &catalog);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_charter_minimum_plus_overage() {
        let catalog = sample();
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(5, 0, 0)), &catalog);
        let breakdown = &result.breakdown;
        assert_eq!(breakdown.rate_type, Some(RateType::Weekday));
        assert_eq!(breakdown.min_people_used, 4);
        assert_eq!(breakdown.min_price_used, 36000);
        assert_eq!(breakdown.extra_count, 1);
        assert_eq!(breakdown.extra_charge_amount, 9000);
        assert_eq!(breakdown.shortage_count, 0);
        assert_eq!(result.total, 45000);
        assert_total_invariant(&result);
    }

    #[test]
    fn test_overage_charged_at_mens_rate_first() {
        let catalog = sample();
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(3, 2, 0)), &catalog);
        let breakdown = &result.breakdown;
        assert_eq!(breakdown.extra_count, 1);
        assert_eq!(breakdown.category_charges.len(), 1);
        assert_eq!(breakdown.category_charges[0].category, PersonCategory::Men);
        assert_eq!(breakdown.extra_charge_amount, 9000);
        assert_eq!(result.subtotal, 45000);
    }

    #[test]
    fn test_overage_spills_into_later_categories() {
        let catalog = sample();
        // 7 people on a 4 person minimum: the 3 extra are the man and both women
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(1, 2, 4)), &catalog);
        let charges = &result.breakdown.category_charges;
        assert_eq!(result.breakdown.extra_count, 3);
        assert_eq!(charges.len(), 2);
        assert_eq!((charges[0].category, charges[0].count), (PersonCategory::Men, 1));
        assert_eq!((charges[1].category, charges[1].count), (PersonCategory::Women, 2));
        assert_eq!(result.breakdown.extra_charge_amount, 9000 + 16000);
        assert_eq!(result.subtotal, 36000 + 25000);
    }

    #[test]
    fn test_overage_reaches_students() {
        let catalog = sample();
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(0, 0, 6)), &catalog);
        let charges = &result.breakdown.category_charges;
        assert_eq!(result.breakdown.extra_count, 2);
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].category, PersonCategory::Students);
        assert_eq!((charges[0].count, charges[0].unit_price), (2, 5000));
        assert_eq!(result.breakdown.extra_charge_amount, 10000);
        assert_eq!(result.subtotal, 46000);
    }

    #[test]
    fn test_overage_spans_all_categories() {
        let catalog = sample();
        // 9 people on a 4 person minimum: 1 man, 2 women, then 2 of the students
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(1, 2, 6)), &catalog);
        let charges = &result.breakdown.category_charges;
        assert_eq!(result.breakdown.extra_count, 5);
        assert_eq!(charges.len(), 3);
        assert_eq!((charges[2].category, charges[2].count), (PersonCategory::Students, 2));
        assert_eq!(result.breakdown.extra_charge_amount, 9000 + 16000 + 10000);
        assert!(result.breakdown.residual_charge.is_none());
    }

    #[test]
    fn test_shortage_never_changes_price() {
        let catalog = sample();
        for party in [PartyCounts::new(1, 0, 0), PartyCounts::new(0, 1, 2), PartyCounts::new(0, 0, 0)] {
            let result = price(&selection(TripType::Charter, "アジ", party), &catalog);
            assert_eq!(result.subtotal, 36000);
            assert_eq!(result.breakdown.shortage_count, 4 - party.total());
            assert_eq!(result.breakdown.extra_count, 0);
        }
    }

    #[test]
    fn test_exact_headcount_has_no_extra_or_shortage() {
        let catalog = sample();
        let result = price(&selection(TripType::Charter, "アジ", PartyCounts::new(2, 1, 1)), &catalog);
        assert_eq!(result.breakdown.extra_count, 0);
        assert_eq!(result.breakdown.shortage_count, 0);
        assert_eq!(result.subtotal, 36000);
    }

    #[test]
    fn test_charter_rate_type_from_holidays() {
        // Golden Week: 5/5 is an interior holiday, 5/6 ends the run
        let catalog = sample().with_holidays(HolidayCalendar::from_dates([
            date(2025, 5, 3),
            date(2025, 5, 4),
            date(2025, 5, 5),
            date(2025, 5, 6),
        ]));
        let mut sel = selection(TripType::Charter, "アジ", PartyCounts::new(2, 0, 0));

        sel.date = Some(date(2025, 5, 5));
        let result = price(&sel, &catalog);
        assert_eq!(result.breakdown.rate_type, Some(RateType::Saturday));
        assert_eq!(result.breakdown.min_people_used, 5);
        assert_eq!(result.subtotal, 45000);

        sel.date = Some(date(2025, 5, 6));
        let result = price(&sel, &catalog);
        assert_eq!(result.breakdown.rate_type, Some(RateType::Sunday));
        assert_eq!(result.breakdown.min_people_used, 6);
        assert_eq!(result.subtotal, 54000);
    }

    #[test]
    fn test_charter_without_date_uses_weekday_rule() {
        let catalog = sample();
        let mut sel = selection(TripType::Charter, "アジ", PartyCounts::new(1, 0, 0));
        sel.date = None;
        let result = price(&sel, &catalog);
        assert_eq!(result.breakdown.rate_type, Some(RateType::Weekday));
        assert_eq!(result.subtotal, 36000);
    }

    #[test]
    fn test_charter_falls_back_to_default_plan_rule() {
        let catalog = sample();
        let mut sel = selection(TripType::Charter, "タチウオ", PartyCounts::new(6, 0, 0));
        // 2025-05-11 is a Sunday; タチウオ has only a weekday rule
        sel.date = Some(date(2025, 5, 11));
        let result = price(&sel, &catalog);
        assert_eq!(result.breakdown.rule_plan.as_deref(), Some("アジ"));
        assert_eq!(result.breakdown.min_people_used, 6);
        // Minimum is still priced from タチウオ's own reference fare
        assert_eq!(result.breakdown.min_price_used, 60000);
    }

    #[test]
    fn test_stored_min_price_without_reference_fare() {
        let catalog = sample();
        let result = price(&selection(TripType::Charter, "ナイト", PartyCounts::new(4, 0, 0)), &catalog);
        assert_eq!(result.breakdown.min_price_used, 50000);
        assert_eq!(result.breakdown.extra_count, 1);
        // No reference fare: the extra passenger is priced at zero
        assert_eq!(result.breakdown.extra_charge_amount, 0);
        assert_eq!(result.subtotal, 50000);
    }

    #[test]
    fn test_no_rule_means_pricing_unavailable() {
        let catalog = Catalog::from_json(r#"{ "charter": [{ "name": "X" }] }"#).unwrap();
        let mut sel = selection(TripType::Charter, "X", PartyCounts::new(3, 0, 0));
        sel.rentals.insert("竿".to_string(), 1);
        let result = price(&sel, &catalog);
        assert!(!result.breakdown.pricing_available);
        assert_eq!(result.subtotal, 0);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_rentals() {
        let catalog = sample();
        let mut sel = selection(TripType::Shared, "アジ", PartyCounts::new(1, 0, 0));
        sel.rentals.insert("竿".to_string(), 2);
        sel.rentals.insert("ライフジャケット".to_string(), 1);
        sel.rentals.insert("仕掛け".to_string(), 3);
        sel.rentals.insert("クーラー".to_string(), 1);
        sel.rentals.insert("未登録".to_string(), 5);
        sel.rentals.insert("電動リール".to_string(), 0);

        let result = price(&sel, &catalog);
        assert_eq!(result.breakdown.rental_charges.len(), 2);
        assert_eq!(result.rental_total, 2 * 800 + 1500);
        assert_eq!(result.rental_refund, 500);
        assert_eq!(result.total, 9000 + 3100);
        assert_total_invariant(&result);
    }

    #[test]
    fn test_charter_rentals_use_charter_table() {
        let catalog = sample();
        let mut sel = selection(TripType::Charter, "タチウオ", PartyCounts::new(5, 0, 0));
        sel.rentals.insert("電動リール".to_string(), 2);
        sel.rentals.insert("竿".to_string(), 1);
        let result = price(&sel, &catalog);
        assert_eq!(result.rental_total, 6000 + 500);
        assert_eq!(result.total, 50000 + 6500);
    }

    #[test]
    fn test_allocate_overage_residual() {
        let fare = Fare {
            men: 9000,
            women: 8000,
            students: 5000,
        };
        let overage = allocate_overage(4, &PartyCounts::new(1, 1, 0), &fare);
        assert_eq!(overage.charges.len(), 2);
        let residual = overage.residual.unwrap();
        assert_eq!(residual.count, 2);
        // (9000 + 8000 + 5000) / 3 = 7333.33
        assert_eq!(residual.unit_price, 7333);
        assert_eq!(overage.amount, 9000 + 8000 + 2 * 7333);

        let fare = Fare {
            men: 2,
            women: 0,
            students: 0,
        };
        // 2 / 3 = 0.67 rounds up
        assert_eq!(allocate_overage(1, &PartyCounts::default(), &fare).amount, 1);
    }

    #[test]
    fn test_pricing_is_idempotent() {
        let catalog = sample();
        let mut sel = selection(TripType::Charter, "アジ", PartyCounts::new(4, 3, 1));
        sel.rentals.insert("竿".to_string(), 3);
        let first = price(&sel, &catalog);
        let second = price(&sel, &catalog);
        assert_eq!(first, second);
    }
}
