use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use charter_quote::calendar::{format_date_ja, parse_date, HolidayCalendar};
use charter_quote::catalog::{Catalog, CharterRule};
use charter_quote::conl_ser::ToConl;
use charter_quote::format::{email_draft, format_yen, render_summary};
use charter_quote::session::{FieldChange, Session};
use charter_quote::utils::{osc8_file_link, osc8_link};
use charter_quote::{PersonCategory, PricingResult, RateType, Selection, TripType};

pub const DEFAULT_CATALOG: &str = "data/catalog.json";
pub const DEFAULT_HOLIDAYS: &str = "data/holidays.conl";

#[derive(Parser)]
#[command(name = "charter-quote")]
#[command(about = "Fare quotes for shared-boat and charter fishing trips")]
struct Cli {
    /// Plan and fare catalog (JSON)
    #[arg(long, global = true, env = "CHARTER_CATALOG", default_value = DEFAULT_CATALOG)]
    catalog: PathBuf,
    /// Holiday calendar (CONL, one `date = name` per line)
    #[arg(long, global = true, env = "CHARTER_HOLIDAYS", default_value = DEFAULT_HOLIDAYS)]
    holidays: PathBuf,
    /// Log pricing decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a booking and print the quote
    Quote(QuoteArgs),
    /// List plans, fares, charter minimums and rentals
    Plans {
        /// Only list plans of this trip type (shared or charter)
        #[arg(long, value_parser = parse_trip_type)]
        trip: Option<TripType>,
    },
    /// Show the rate tier of a date (YYYY-MM-DD)
    RateType {
        #[arg(value_name = "DATE")]
        date: String,
    },
    /// Show the rate tier of every day in a month (YYYY-MM)
    Calendar {
        #[arg(value_name = "MONTH")]
        month: String,
    },
}

#[derive(Args)]
struct QuoteArgs {
    /// Trip type: shared (乗合船) or charter (仕立て船)
    #[arg(long, default_value = "shared", value_parser = parse_trip_type)]
    trip: TripType,
    /// Plan name; defaults to the first plan of the trip type
    #[arg(long)]
    plan: Option<String>,
    /// Trip date (YYYY-MM-DD or YYYY/MM/DD); defaults to today, empty for undecided
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<String>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    men: i64,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    women: i64,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    students: i64,
    /// Rental line, repeatable
    #[arg(long = "rental", value_name = "NAME=QTY", value_parser = parse_rental)]
    rentals: Vec<(String, i64)>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Also print a reservation email draft and mailto link
    #[arg(long)]
    email: bool,
    /// Reservation email recipient; defaults to the catalog's contact address
    #[arg(long, env = "CHARTER_MAIL_TO")]
    mail_to: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Conl,
}

#[derive(Serialize)]
struct QuoteOutput<'a> {
    selection: &'a Selection,
    quote: &'a PricingResult,
}

fn parse_trip_type(s: &str) -> Result<TripType, String> {
    TripType::from_str(s).ok_or_else(|| format!("unknown trip type '{}' (expected shared or charter)", s))
}

/// Reject a date the session would silently drop; empty leaves it undecided
fn parse_date_arg(s: &str) -> Result<String, String> {
    if s.trim().is_empty() || parse_date(s).is_some() {
        Ok(s.to_string())
    } else {
        Err(format!("invalid date '{}' (expected YYYY-MM-DD or YYYY/MM/DD)", s))
    }
}

/// Parse "竿=2"
fn parse_rental(s: &str) -> Result<(String, i64), String> {
    let (name, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=QTY, got '{}'", s))?;
    let qty: i64 = qty
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    Ok((name.trim().to_string(), qty))
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "charter_quote=debug"
    } else {
        "charter_quote=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_catalog(cli: &Cli) -> Result<Catalog> {
    let holidays = HolidayCalendar::load_or_empty(&cli.holidays)?;
    tracing::info!(count = holidays.len(), path = %cli.holidays.display(), "loaded holidays");
    Ok(Catalog::load(&cli.catalog)?.with_holidays(holidays))
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {}\n", line)).collect()
}

fn run_quote(catalog: &Catalog, args: QuoteArgs) -> Result<()> {
    let today = Local::now().date_naive();
    let mut session = Session::new(catalog, today);

    let plans = catalog.plan_names(args.trip);
    if plans.is_empty() {
        bail!("The catalog has no {} plans", args.trip.label());
    }
    session.apply(FieldChange::TripType(args.trip));
    if let Some(plan) = args.plan {
        if !catalog.has_plan(args.trip, &plan) {
            bail!(
                "Unknown {} plan '{}'. Available: {}",
                args.trip.label(),
                plan,
                plans.join(", ")
            );
        }
        session.apply(FieldChange::Plan(plan));
    }
    if let Some(date) = args.date {
        session.apply(FieldChange::Date(date));
    }
    session.apply(FieldChange::Party(PersonCategory::Men, args.men));
    session.apply(FieldChange::Party(PersonCategory::Women, args.women));
    session.apply(FieldChange::Party(PersonCategory::Students, args.students));
    for (name, qty) in args.rentals {
        let selection = session.selection();
        if catalog
            .resolve_rental(selection.trip_type, &selection.plan_name, &name)
            .is_none()
        {
            tracing::warn!(rental = %name, plan = %selection.plan_name, "rental is not offered for this plan");
        }
        session.apply(FieldChange::Rental(name, qty));
    }

    let selection = session.selection();
    let quote = session.quote();

    match args.format {
        OutputFormat::Text => print!("{}", render_summary(selection, catalog, quote)),
        OutputFormat::Json => {
            let output = QuoteOutput { selection, quote };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize quote")?
            );
        }
        OutputFormat::Conl => {
            print!("selection\n{}", indent(&selection.to_conl()));
            print!("quote\n{}", indent(&quote.to_conl()));
        }
    }

    if args.email {
        let draft = email_draft(selection, catalog, quote, args.mail_to.as_deref());
        if draft.to.is_empty() {
            tracing::warn!("no recipient, pass --mail-to or set contact_email in the catalog");
        }
        println!();
        println!("宛先: {}", draft.to);
        println!("件名: {}", draft.subject);
        println!();
        print!("{}", draft.body);
        println!();
        let link = draft.mailto();
        println!("{}", osc8_link(&link, &link));
    }

    Ok(())
}

fn describe_rule(rule: Option<&CharterRule>) -> String {
    match rule {
        Some(rule) => match rule.min_price {
            Some(price) => format!("{}名 / {}", rule.min_people, format_yen(price)),
            None => format!("{}名", rule.min_people),
        },
        None => "-".to_string(),
    }
}

fn run_plans(catalog: &Catalog, catalog_path: &str, only: Option<TripType>) -> Result<()> {
    println!("Catalog: {}", osc8_file_link(catalog_path, catalog_path));

    for trip_type in TripType::ALL {
        if only.is_some_and(|t| t != trip_type) {
            continue;
        }
        println!();
        println!("{}", trip_type.label());

        for name in catalog.plan_names(trip_type) {
            match trip_type {
                TripType::Shared => match catalog.shared_fare(name) {
                    Some(fare) => println!(
                        "  {}: 大人男性 {} / 女性 {} / 学生 {}",
                        name,
                        format_yen(fare.men),
                        format_yen(fare.women),
                        format_yen(fare.students)
                    ),
                    None => println!("  {}: 料金未設定", name),
                },
                TripType::Charter => {
                    let Some(plan) = catalog.charter_plan(name) else {
                        continue;
                    };
                    let per_person = catalog
                        .reference_fare(name)
                        .map(|fare| format!(" (1名 {})", format_yen(fare.men)))
                        .unwrap_or_default();
                    println!(
                        "  {}{}: 平日 {} / 土曜・祝前日 {} / 日曜・祝日 {}",
                        name,
                        per_person,
                        describe_rule(plan.rule_for(RateType::Weekday)),
                        describe_rule(plan.rule_for(RateType::Saturday)),
                        describe_rule(plan.rule_for(RateType::Sunday))
                    );
                }
            }

            if let Some(attributes) = catalog.plan_attributes(trip_type, name) {
                if let Some(difficulty) = attributes.difficulty {
                    println!("    難易度: {}", difficulty.label());
                }
                if let Some(kit) = &attributes.tackle_kit {
                    println!("    仕掛け: {}", kit);
                }
            }

            let rentals = catalog.rental_options(trip_type, name);
            if !rentals.is_empty() {
                let items: Vec<String> = rentals
                    .iter()
                    .map(|item| match item.refund_per_unit {
                        Some(refund) => format!(
                            "{} {} (返金 {})",
                            item.name,
                            format_yen(item.unit_price),
                            format_yen(refund)
                        ),
                        None => format!("{} {}", item.name, format_yen(item.unit_price)),
                    })
                    .collect();
                println!("    レンタル: {}", items.join(", "));
            }
        }
    }

    if let Some(default) = &catalog.default_charter_plan {
        println!();
        println!("仕立て料金の既定プラン: {}", default);
    }
    Ok(())
}

fn run_rate_type(catalog: &Catalog, date_str: &str) -> Result<()> {
    let rate_type = catalog.holidays.rate_type_str(date_str);
    match parse_date(date_str) {
        Some(date) => {
            let holiday = catalog.holidays.holiday_name(date).unwrap_or("");
            println!(
                "{} {} {} {}",
                format_date_ja(date),
                rate_type.as_str(),
                rate_type.label(),
                holiday
            );
        }
        None => {
            tracing::warn!(value = %date_str, "malformed date, using the weekday rate");
            println!("{} {}", rate_type.as_str(), rate_type.label());
        }
    }
    Ok(())
}

fn run_calendar(catalog: &Catalog, month: &str) -> Result<()> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", month))?;

    let mut day = Some(first);
    while let Some(date) = day.filter(|d| d.month() == first.month()) {
        let rate_type = catalog.holidays.rate_type(date);
        let holiday = catalog.holidays.holiday_name(date).unwrap_or("");
        println!(
            "{}  {:<8} {}",
            format_date_ja(date),
            rate_type.as_str(),
            holiday
        );
        day = date.succ_opt();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = load_catalog(&cli)?;
    let catalog_path = cli.catalog.display().to_string();

    match cli.command {
        Commands::Quote(args) => run_quote(&catalog, args),
        Commands::Plans { trip } => run_plans(&catalog, &catalog_path, trip),
        Commands::RateType { date } => run_rate_type(&catalog, &date),
        Commands::Calendar { month } => run_calendar(&catalog, &month),
    }
}
