//! Plan and fare catalog
//!
//! The catalog is authored as JSON:
//!
//! ```json
//! {
//!   "default_charter_plan": "アジ",
//!   "shared": [{ "name": "アジ", "fare": { "men": 9000, "women": 8000, "students": 5000 } }],
//!   "charter": [{ "name": "アジ", "weekday": { "min_people": 4 }, "holiday": { "min_people": 5 } }],
//!   "common_rentals": { "竿": 500, "ライフジャケット": { "price": 1500, "refund": 500 } }
//! }
//! ```
//!
//! Every table is optional. Lookups that find nothing return `None` and the
//! pricing engine treats the missing value as zero.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::calendar::HolidayCalendar;
use crate::types::{PersonCategory, RateType, TripType, Yen};

/// Terminal tackle is sold on board and never priced on the form
pub const TERMINAL_TACKLE: &str = "仕掛け";

/// Per-person unit prices of a shared-boat plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fare {
    pub men: Yen,
    pub women: Yen,
    #[serde(alias = "student")]
    pub students: Yen,
}

impl Fare {
    pub fn get(&self, category: PersonCategory) -> Yen {
        match category {
            PersonCategory::Men => self.men,
            PersonCategory::Women => self.women,
            PersonCategory::Students => self.students,
        }
    }
}

/// Rental table entry: a bare price or a price with a per-unit refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RentalEntry {
    Price(Yen),
    Detailed {
        price: Yen,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refund: Option<Yen>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        informational: bool,
    },
}

/// A rental item resolved from one of the catalog's tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalItem {
    pub name: String,
    pub unit_price: Yen,
    pub refund_per_unit: Option<Yen>,
    /// Listed for reference only, never charged
    pub informational: bool,
}

impl RentalEntry {
    pub fn to_item(&self, name: &str) -> RentalItem {
        match self {
            RentalEntry::Price(price) => RentalItem {
                name: name.to_string(),
                unit_price: *price,
                refund_per_unit: None,
                informational: name == TERMINAL_TACKLE,
            },
            RentalEntry::Detailed {
                price,
                refund,
                informational,
            } => RentalItem {
                name: name.to_string(),
                unit_price: *price,
                refund_per_unit: refund.filter(|r| *r > 0),
                informational: *informational || name == TERMINAL_TACKLE,
            },
        }
    }
}

/// How demanding a plan is, shown on the quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Standard,
    Expert,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "初心者向け",
            Difficulty::Standard => "一般向け",
            Difficulty::Expert => "上級者向け",
        }
    }
}

/// Plan facts set when the catalog is authored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    /// Tackle the plan is fished with, e.g. "ビシ仕掛け 130号"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tackle_kit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPlan {
    pub name: String,
    #[serde(default)]
    pub fare: Option<Fare>,
    #[serde(default)]
    pub rentals: BTreeMap<String, RentalEntry>,
    #[serde(flatten)]
    pub attributes: PlanAttributes,
}

/// Minimum headcount and price of a charter on one rate tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharterRule {
    pub min_people: u32,
    /// Used only when the plan has no shared-boat reference fare
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Yen>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharterPlan {
    pub name: String,
    #[serde(default)]
    pub weekday: Option<CharterRule>,
    #[serde(default)]
    pub saturday: Option<CharterRule>,
    #[serde(default)]
    pub sunday: Option<CharterRule>,
    /// Accepted in place of `saturday`
    #[serde(default)]
    pub holiday: Option<CharterRule>,
    #[serde(default)]
    pub rentals: BTreeMap<String, RentalEntry>,
    /// Shared-boat plan supplying per-person prices; defaults to `name`
    #[serde(default)]
    pub reference_plan: Option<String>,
    #[serde(flatten)]
    pub attributes: PlanAttributes,
}

impl CharterPlan {
    pub fn rule_for(&self, rate_type: RateType) -> Option<&CharterRule> {
        match rate_type {
            RateType::Weekday => self.weekday.as_ref(),
            RateType::Saturday => self.saturday.as_ref().or(self.holiday.as_ref()),
            RateType::Sunday => self.sunday.as_ref(),
        }
    }

    pub fn reference_plan_name(&self) -> &str {
        self.reference_plan.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub shared: Vec<SharedPlan>,
    pub charter: Vec<CharterPlan>,
    pub common_rentals: BTreeMap<String, RentalEntry>,
    /// Charter plan whose rules apply when the selected plan lacks one
    pub default_charter_plan: Option<String>,
    /// Recipient of reservation emails
    pub contact_email: Option<String>,
    #[serde(skip)]
    pub holidays: HolidayCalendar,
}

impl Catalog {
    /// Load a catalog JSON file. Holidays are attached separately.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog = Self::from_json(&content)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;

        for warning in catalog.validate() {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        tracing::info!(
            shared = catalog.shared.len(),
            charter = catalog.charter.len(),
            common_rentals = catalog.common_rentals.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_holidays(mut self, holidays: HolidayCalendar) -> Self {
        self.holidays = holidays;
        self
    }

    /// Problems that don't stop pricing but probably indicate a data mistake
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(default) = &self.default_charter_plan {
            if self.charter_plan(default).is_none() {
                warnings.push(format!("default charter plan '{}' is not in the catalog", default));
            }
        }

        for trip_type in TripType::ALL {
            let names = self.plan_names(trip_type);
            for (i, name) in names.iter().enumerate() {
                if names[..i].contains(name) {
                    warnings.push(format!(
                        "duplicate {} plan '{}', only the first is used",
                        trip_type.as_str(),
                        name
                    ));
                }
            }
        }

        for plan in &self.charter {
            if self.shared_fare(plan.reference_plan_name()).is_none() {
                let has_stored_price = [&plan.weekday, &plan.saturday, &plan.sunday, &plan.holiday]
                    .into_iter()
                    .flatten()
                    .any(|rule| rule.min_price.is_some());
                if !has_stored_price {
                    warnings.push(format!(
                        "charter plan '{}' has no reference fare and no stored min_price",
                        plan.name
                    ));
                }
            }
        }

        warnings
    }

    pub fn shared_plan(&self, name: &str) -> Option<&SharedPlan> {
        self.shared.iter().find(|p| p.name == name)
    }

    pub fn charter_plan(&self, name: &str) -> Option<&CharterPlan> {
        self.charter.iter().find(|p| p.name == name)
    }

    /// Plan menu for a trip type, in catalog order
    pub fn plan_names(&self, trip_type: TripType) -> Vec<&str> {
        match trip_type {
            TripType::Shared => self.shared.iter().map(|p| p.name.as_str()).collect(),
            TripType::Charter => self.charter.iter().map(|p| p.name.as_str()).collect(),
        }
    }

    pub fn has_plan(&self, trip_type: TripType, name: &str) -> bool {
        match trip_type {
            TripType::Shared => self.shared_plan(name).is_some(),
            TripType::Charter => self.charter_plan(name).is_some(),
        }
    }

    pub fn plan_attributes(&self, trip_type: TripType, name: &str) -> Option<&PlanAttributes> {
        match trip_type {
            TripType::Shared => self.shared_plan(name).map(|p| &p.attributes),
            TripType::Charter => self.charter_plan(name).map(|p| &p.attributes),
        }
    }

    pub fn shared_fare(&self, name: &str) -> Option<&Fare> {
        self.shared_plan(name).and_then(|p| p.fare.as_ref())
    }

    /// Name of the shared-boat plan a charter plan takes its prices from
    pub fn reference_plan_name<'a>(&'a self, charter_plan: &'a str) -> &'a str {
        match self.charter_plan(charter_plan) {
            Some(plan) => plan.reference_plan_name(),
            None => charter_plan,
        }
    }

    /// Shared-boat fare backing a charter plan's per-person prices
    pub fn reference_fare(&self, charter_plan: &str) -> Option<&Fare> {
        self.shared_fare(self.reference_plan_name(charter_plan))
    }

    /// Charter rule for a plan and rate tier, falling back to the default
    /// charter plan. Returns the name of the plan the rule came from.
    pub fn charter_rule(&self, plan_name: &str, rate_type: RateType) -> Option<(&str, &CharterRule)> {
        if let Some(plan) = self.charter_plan(plan_name) {
            if let Some(rule) = plan.rule_for(rate_type) {
                return Some((plan.name.as_str(), rule));
            }
        }

        let default = self.default_charter_plan.as_deref()?;
        let plan = self.charter_plan(default)?;
        let rule = plan.rule_for(rate_type)?;
        tracing::debug!(
            plan = plan_name,
            fallback = default,
            rate_type = rate_type.as_str(),
            "no charter rule for plan, using default plan's rule"
        );
        Some((plan.name.as_str(), rule))
    }

    fn plan_rentals(&self, trip_type: TripType, plan_name: &str) -> Option<&BTreeMap<String, RentalEntry>> {
        match trip_type {
            TripType::Shared => self.shared_plan(plan_name).map(|p| &p.rentals),
            TripType::Charter => self.charter_plan(plan_name).map(|p| &p.rentals),
        }
    }

    /// Rental tables consulted for a plan, highest precedence first: the
    /// plan's own table, the shared-boat reference plan's table, common rentals
    fn rental_tables(&self, trip_type: TripType, plan_name: &str) -> Vec<&BTreeMap<String, RentalEntry>> {
        let mut tables = Vec::with_capacity(3);
        tables.extend(self.plan_rentals(trip_type, plan_name));
        let reference = match trip_type {
            TripType::Shared => plan_name,
            TripType::Charter => self.reference_plan_name(plan_name),
        };
        if trip_type == TripType::Charter || reference != plan_name {
            tables.extend(self.shared_plan(reference).map(|p| &p.rentals));
        }
        tables.push(&self.common_rentals);
        tables
    }

    /// Resolve a rental line by name for the current plan
    pub fn resolve_rental(&self, trip_type: TripType, plan_name: &str, rental: &str) -> Option<RentalItem> {
        self.rental_tables(trip_type, plan_name)
            .into_iter()
            .find_map(|table| table.get(rental))
            .map(|entry| entry.to_item(rental))
    }

    /// Rental menu for a plan: every chargeable item, resolved by precedence
    pub fn rental_options(&self, trip_type: TripType, plan_name: &str) -> Vec<RentalItem> {
        let mut seen: BTreeMap<&str, RentalItem> = BTreeMap::new();
        for table in self.rental_tables(trip_type, plan_name) {
            for (name, entry) in table {
                seen.entry(name.as_str()).or_insert_with(|| entry.to_item(name));
            }
        }
        seen.into_values()
            .filter(|item| !item.informational && item.unit_price > 0)
            .collect()
    }
}
