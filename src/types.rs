//! Booking-form types: trip types, rate tiers, party composition and quotes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whole yen. Every amount in the catalog and in a quote is non-negative.
pub type Yen = u64;

/// Billing tier derived from the booking date and the holiday calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    Weekday,
    Saturday,
    Sunday,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Weekday => "weekday",
            RateType::Saturday => "saturday",
            RateType::Sunday => "sunday",
        }
    }

    /// Label shown on quotes and in the email draft
    pub fn label(&self) -> &'static str {
        match self {
            RateType::Weekday => "平日料金",
            RateType::Saturday => "土曜・祝前日料金",
            RateType::Sunday => "日曜・祝日料金",
        }
    }
}

/// Kind of trip offered on the booking form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    /// 乗合船: priced per person, parties share the boat
    #[default]
    Shared,
    /// 仕立て船: private boat, minimum price plus overage
    Charter,
}

impl TripType {
    pub const ALL: [TripType; 2] = [TripType::Shared, TripType::Charter];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Shared => "shared",
            TripType::Charter => "charter",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripType::Shared => "乗合船",
            TripType::Charter => "仕立て船",
        }
    }

    /// Accepts both the identifier and the Japanese label
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "shared" | "乗合" | "乗合船" => Some(TripType::Shared),
            "charter" | "仕立" | "仕立船" | "仕立て" | "仕立て船" => Some(TripType::Charter),
            _ => None,
        }
    }
}

/// Passenger category with its own unit price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonCategory {
    Men,
    Women,
    Students,
}

/// Order in which passengers beyond a charter's minimum headcount are billed.
///
/// The first categories absorb the overage, so with men=3, women=2 and one
/// extra passenger the extra is charged at the men's rate.
pub const OVERAGE_ORDER: [PersonCategory; 3] = [
    PersonCategory::Men,
    PersonCategory::Women,
    PersonCategory::Students,
];

impl PersonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonCategory::Men => "men",
            PersonCategory::Women => "women",
            PersonCategory::Students => "students",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PersonCategory::Men => "大人男性",
            PersonCategory::Women => "女性",
            PersonCategory::Students => "学生",
        }
    }
}

/// Head count per passenger category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCounts {
    pub men: u32,
    pub women: u32,
    pub students: u32,
}

impl PartyCounts {
    pub fn new(men: u32, women: u32, students: u32) -> Self {
        Self {
            men,
            women,
            students,
        }
    }

    pub fn get(&self, category: PersonCategory) -> u32 {
        match category {
            PersonCategory::Men => self.men,
            PersonCategory::Women => self.women,
            PersonCategory::Students => self.students,
        }
    }

    pub fn set(&mut self, category: PersonCategory, count: u32) {
        match category {
            PersonCategory::Men => self.men = count,
            PersonCategory::Women => self.women = count,
            PersonCategory::Students => self.students = count,
        }
    }

    pub fn total(&self) -> u32 {
        self.men
            .saturating_add(self.women)
            .saturating_add(self.students)
    }
}

/// The booking form's current input. Owned by the session, read by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub trip_type: TripType,
    pub plan_name: String,
    /// `None` when the date field is empty
    pub date: Option<NaiveDate>,
    pub party: PartyCounts,
    /// Rental name -> quantity; lines with quantity 0 are ignored
    pub rentals: BTreeMap<String, u32>,
}

impl Selection {
    /// Form defaults: shared trip on `today`, nobody booked yet
    pub fn new(today: NaiveDate, plan_name: impl Into<String>) -> Self {
        Self {
            trip_type: TripType::Shared,
            plan_name: plan_name.into(),
            date: Some(today),
            party: PartyCounts::default(),
            rentals: BTreeMap::new(),
        }
    }
}

/// One priced passenger line (shared fare or charter overage)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCharge {
    pub category: PersonCategory,
    pub count: u32,
    pub unit_price: Yen,
    pub amount: Yen,
}

/// Overage left over once every category has been drawn down
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidualCharge {
    pub count: u32,
    pub unit_price: Yen,
    pub amount: Yen,
}

/// One priced rental line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RentalCharge {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Yen,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_per_unit: Option<Yen>,
    pub amount: Yen,
}

impl RentalCharge {
    pub fn refund(&self) -> Yen {
        self.refund_per_unit
            .unwrap_or(0)
            .saturating_mul(Yen::from(self.quantity))
    }
}

/// How a quote's subtotal was reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    /// Rate tier of the booking date; only resolved for charters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_type: Option<RateType>,
    /// False when a charter has no rule for the date's rate tier
    pub pricing_available: bool,
    /// Plan whose charter rule was applied (the default plan on fallback)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_plan: Option<String>,
    pub min_people_used: u32,
    pub min_price_used: Yen,
    pub extra_count: u32,
    pub extra_charge_amount: Yen,
    pub shortage_count: u32,
    pub category_charges: Vec<CategoryCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_charge: Option<ResidualCharge>,
    pub rental_charges: Vec<RentalCharge>,
}

/// Result of pricing a selection. `total == subtotal + rental_total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PricingResult {
    pub total: Yen,
    pub subtotal: Yen,
    pub rental_total: Yen,
    /// Paid back on return of rentals; not deducted from `total`
    pub rental_refund: Yen,
    pub breakdown: Breakdown,
}
