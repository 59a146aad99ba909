//! Booking-form session: the single mutable selection and its live quote

use chrono::NaiveDate;

use crate::calendar::parse_date;
use crate::catalog::Catalog;
use crate::pricing::price;
use crate::types::{PersonCategory, PricingResult, Selection, TripType};

/// Largest head count accepted per passenger category
pub const MAX_PARTY: u32 = 99;
/// Largest quantity accepted per rental line
pub const MAX_RENTAL_QTY: u32 = 20;

/// One edit to a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    TripType(TripType),
    Plan(String),
    /// Raw date field; empty or malformed clears the date
    Date(String),
    Party(PersonCategory, i64),
    Rental(String, i64),
}

fn clamp_count(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}

#[derive(Debug)]
pub struct Session<'a> {
    catalog: &'a Catalog,
    selection: Selection,
    quote: PricingResult,
}

impl<'a> Session<'a> {
    /// Start with form defaults: `today`, shared trip, first shared plan
    pub fn new(catalog: &'a Catalog, today: NaiveDate) -> Self {
        let plan = catalog
            .plan_names(TripType::Shared)
            .first()
            .copied()
            .unwrap_or_default();
        let selection = Selection::new(today, plan);
        let quote = price(&selection, catalog);
        Self {
            catalog,
            selection,
            quote,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn quote(&self) -> &PricingResult {
        &self.quote
    }

    /// Apply a field change and recompute the whole quote
    pub fn apply(&mut self, change: FieldChange) -> &PricingResult {
        match change {
            FieldChange::TripType(trip_type) => self.set_trip_type(trip_type),
            FieldChange::Plan(plan) => {
                if !self.catalog.has_plan(self.selection.trip_type, &plan) {
                    tracing::warn!(
                        plan = %plan,
                        trip_type = self.selection.trip_type.as_str(),
                        "plan is not on the menu"
                    );
                }
                self.selection.plan_name = plan;
                self.drop_unavailable_rentals();
            }
            FieldChange::Date(value) => {
                self.selection.date = parse_date(&value);
                if self.selection.date.is_none() && !value.trim().is_empty() {
                    tracing::warn!(value = %value, "malformed date, pricing at the weekday rate");
                }
            }
            FieldChange::Party(category, count) => {
                self.selection
                    .party
                    .set(category, clamp_count(count, MAX_PARTY));
            }
            FieldChange::Rental(name, quantity) => match clamp_count(quantity, MAX_RENTAL_QTY) {
                0 => {
                    self.selection.rentals.remove(&name);
                }
                quantity => {
                    self.selection.rentals.insert(name, quantity);
                }
            },
        }

        self.quote = price(&self.selection, self.catalog);
        &self.quote
    }

    fn set_trip_type(&mut self, trip_type: TripType) {
        self.selection.trip_type = trip_type;
        if !self.catalog.has_plan(trip_type, &self.selection.plan_name) {
            let first = self.catalog.plan_names(trip_type).first().copied().unwrap_or_default();
            self.selection.plan_name = first.to_string();
        }
        self.drop_unavailable_rentals();
    }

    /// Forget rental lines the current plan doesn't offer
    fn drop_unavailable_rentals(&mut self) {
        let options = self
            .catalog
            .rental_options(self.selection.trip_type, &self.selection.plan_name);
        self.selection
            .rentals
            .retain(|name, _| options.iter().any(|item| &item.name == name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample;
    use crate::types::RateType;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()
    }

    #[test]
    fn test_defaults() {
        let catalog = sample();
        let session = Session::new(&catalog, today());
        let selection = session.selection();
        assert_eq!(selection.trip_type, TripType::Shared);
        assert_eq!(selection.plan_name, "アジ");
        assert_eq!(selection.date, Some(today()));
        assert_eq!(selection.party.total(), 0);
        assert_eq!(session.quote().total, 0);
    }

    #[test]
    fn test_every_change_recomputes() {
        let catalog = sample();
        let mut session = Session::new(&catalog, today());
        assert_eq!(session.apply(FieldChange::Party(PersonCategory::Men, 2)).total, 18000);
        assert_eq!(session.apply(FieldChange::Party(PersonCategory::Women, 1)).total, 26000);
        assert_eq!(session.apply(FieldChange::Rental("竿".to_string(), 1)).total, 26800);
        assert_eq!(session.apply(FieldChange::Plan("タチウオ".to_string())).total, 29500);
    }

    #[test]
    fn test_counts_are_clamped() {
        let catalog = sample();
        let mut session = Session::new(&catalog, today());
        session.apply(FieldChange::Party(PersonCategory::Men, -3));
        assert_eq!(session.selection().party.men, 0);
        session.apply(FieldChange::Party(PersonCategory::Students, 1000));
        assert_eq!(session.selection().party.students, MAX_PARTY);
        session.apply(FieldChange::Rental("竿".to_string(), 50));
        assert_eq!(session.selection().rentals["竿"], MAX_RENTAL_QTY);
        session.apply(FieldChange::Rental("竿".to_string(), -1));
        assert!(session.selection().rentals.is_empty());
    }

    #[test]
    fn test_date_changes() {
        let catalog = sample();
        let mut session = Session::new(&catalog, today());
        session.apply(FieldChange::Date("2025/05/10".to_string()));
        assert_eq!(session.selection().date, NaiveDate::from_ymd_opt(2025, 5, 10));
        session.apply(FieldChange::Date(String::new()));
        assert_eq!(session.selection().date, None);
    }

    #[test]
    fn test_malformed_date_prices_at_weekday_rate() {
        let catalog = sample();
        let mut session = Session::new(&catalog, today());
        session.apply(FieldChange::TripType(TripType::Charter));
        session.apply(FieldChange::Party(PersonCategory::Men, 4));
        // 2025-05-11 is a Sunday: 6 person minimum
        assert_eq!(session.apply(FieldChange::Date("2025-05-11".to_string())).subtotal, 54000);

        let quote = session.apply(FieldChange::Date("2025-13-01".to_string())).clone();
        assert_eq!(session.selection().date, None);
        assert_eq!(quote.breakdown.rate_type, Some(RateType::Weekday));
        assert_eq!(quote.subtotal, 36000);
    }

    #[test]
    fn test_switching_trip_type() {
        let catalog = sample();
        let mut session = Session::new(&catalog, today());
        session.apply(FieldChange::Plan("体験".to_string()));
        session.apply(FieldChange::Party(PersonCategory::Men, 5));

        // 体験 has no charter plan, so the first charter plan is selected
        let quote = session.apply(FieldChange::TripType(TripType::Charter)).clone();
        assert_eq!(session.selection().plan_name, "アジ");
        assert_eq!(quote.total, 45000);

        session.apply(FieldChange::Plan("タチウオ".to_string()));
        session.apply(FieldChange::Rental("電動リール".to_string(), 1));
        assert_eq!(session.quote().rental_total, 3000);

        // The reel is only rented on the charter plan
        session.apply(FieldChange::TripType(TripType::Shared));
        assert_eq!(session.selection().plan_name, "タチウオ");
        assert!(session.selection().rentals.is_empty());
        assert_eq!(session.quote().total, 50000);
    }
}
