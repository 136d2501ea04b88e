//! 🧮 SureTax force update — the one place in this repo where arithmetic happens.
//!
//! 🎬 COLD OPEN — INT. FINANCE DEPARTMENT — QUARTER CLOSE
//!
//! The ERP stores money in minor units. `1000` with two currency decimals is ten
//! dollars. A credit memo is the same line with a flag that flips the sign. The tax
//! engine wants major units, two decimals, rounded half-up, and a twelve-character
//! geocode that some ERP installs pad with two extra characters in the middle.
//!
//! Rules, exactly:
//! - `scale = 10^currency_decimals`
//! - `revenue = (amount + freight − exempt) / scale`, `tax = tax_amount / scale`
//! - both negated iff the credit indicator is not `""` and not `"0"`
//! - both rounded to 2 dp, midpoint away from zero
//! - geocode: with the unify flag and length ≥ 4, chars 2..4 are dropped
//! - geocode must then be 12 chars matching `^[A-Za-z]{2}\d{5}[A-Za-z0-9]{5}$`
//! - data year: first item's tax date, clamped to the current year when it is in
//!   the future; current year when absent
//!
//! 💰 `rust_decimal` does the math. Floats were not invited. Floats know what they did.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{IntegrationError, Result};

/// 📐 The geocode dress code.
static GEOCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2}\d{5}[A-Za-z0-9]{5}$").expect("geocode pattern is a valid regex")
});

const GEOCODE_LENGTH: usize = 12;
// 💰 rust_decimal tops out at 28 digits of scale.
const MAX_CURRENCY_DECIMALS: u32 = 28;

/// 📄 One ERP line item, amounts in minor units, as strings because ERPs love strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxLineItem {
    pub amount: String,
    pub freight: String,
    pub exempt_amount: String,
    pub tax_amount: String,
    pub credit_indicator: String,
    pub jurisdiction_code: String,
    pub tax_date: Option<String>,
}

/// 🧾 One adjusted line, ready for the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdjustmentItem {
    pub revenue: String,
    pub tax: String,
    pub geocode: String,
}

/// 🧾 The whole calculation result.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxAdjustment {
    pub data_year: i32,
    pub items: Vec<AdjustmentItem>,
}

/// 🏷️ Vendor identifiers stamped on the outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct SureTaxAccount<'a> {
    pub client_number: &'a str,
    pub business_unit: &'a str,
    pub validation_key: &'a str,
}

/// 📨 The outbound tax-adjustment request document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaxAdjustmentRequest {
    pub client_number: String,
    pub business_unit: String,
    pub validation_key: String,
    pub data_year: String,
    pub client_tracking: String,
    pub item_list: Vec<TaxAdjustmentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaxAdjustmentLine {
    pub line_number: String,
    pub geocode: String,
    pub revenue: String,
    pub tax: String,
}

/// 🏳️ Config strings that mean "yes, unify the jurisdiction".
pub fn unify_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("x" | "true" | "1")
    )
}

/// 🧮 Run the whole calculation over `items`.
pub fn calculate(
    items: &[TaxLineItem],
    currency_decimals: u32,
    unify_jurisdiction: bool,
    today: NaiveDate,
) -> Result<TaxAdjustment> {
    if currency_decimals > MAX_CURRENCY_DECIMALS {
        return Err(IntegrationError::Validation(format!(
            "currency decimals {currency_decimals} exceeds {MAX_CURRENCY_DECIMALS}"
        )));
    }
    // 📐 10^-n, so minor units times scale is major units.
    let scale = Decimal::new(1, currency_decimals);

    let adjusted = items
        .iter()
        .map(|item| adjust_line(item, scale, unify_jurisdiction))
        .collect::<Result<Vec<_>>>()?;
    let data_year = resolve_data_year(items.first().and_then(|i| i.tax_date.as_deref()), today)?;

    Ok(TaxAdjustment {
        data_year,
        items: adjusted,
    })
}

fn adjust_line(item: &TaxLineItem, scale: Decimal, unify: bool) -> Result<AdjustmentItem> {
    let credit = is_credit(&item.credit_indicator);
    let amount = parse_amount("amount", &item.amount)?;
    let freight = parse_amount("freight", &item.freight)?;
    let exempt = parse_amount("exemptAmount", &item.exempt_amount)?;
    let tax_amount = parse_amount("taxAmount", &item.tax_amount)?;

    let revenue = amount
        .checked_add(freight)
        .and_then(|gross| gross.checked_sub(exempt))
        .and_then(|gross| gross.checked_mul(scale))
        .ok_or_else(|| overflow("amount + freight - exemptAmount", &item.amount))?;
    let tax = tax_amount
        .checked_mul(scale)
        .ok_or_else(|| overflow("taxAmount", &item.tax_amount))?;
    let (revenue, tax) = (signed(revenue, credit), signed(tax, credit));

    Ok(AdjustmentItem {
        revenue: two_decimals(revenue),
        tax: two_decimals(tax),
        geocode: transform_geocode(&item.jurisdiction_code, unify)?,
    })
}

/// 🔁 Credit indicator: anything but `""` or `"0"` means "this is a credit".
pub fn is_credit(indicator: &str) -> bool {
    !matches!(indicator.trim(), "" | "0")
}

fn signed(value: Decimal, credit: bool) -> Decimal {
    // 🚫 -0.00 is not a number anybody wants on an invoice.
    if credit && !value.is_zero() { -value } else { value }
}

/// 💰 Half-up (midpoint away from zero) to exactly two decimals.
pub fn two_decimals(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

fn overflow(what: &str, raw: &str) -> IntegrationError {
    IntegrationError::Validation(format!("{what} overflows a decimal (line amount '{raw}')"))
}

fn parse_amount(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw).map_err(|err| {
        IntegrationError::Validation(format!("{field} '{raw}' is not a number: {err}"))
    })
}

/// 🗺️ Optionally drop chars 2..4, then insist on the twelve-character shape.
pub fn transform_geocode(source: &str, unify: bool) -> Result<String> {
    let chars: Vec<char> = source.trim().chars().collect();
    let transformed: String = if unify && chars.len() >= 4 {
        chars[..2].iter().chain(&chars[4..]).collect()
    } else {
        chars.into_iter().collect()
    };
    validate_geocode(&transformed)?;
    Ok(transformed)
}

pub fn validate_geocode(geocode: &str) -> Result<()> {
    if geocode.chars().count() != GEOCODE_LENGTH || !GEOCODE_PATTERN.is_match(geocode) {
        return Err(IntegrationError::Validation(format!(
            "invalid geocode '{geocode}': expected {GEOCODE_LENGTH} characters matching {}",
            GEOCODE_PATTERN.as_str()
        )));
    }
    Ok(())
}

/// 📅 Year of `tax_date`, clamped to `today`'s year when the date is in the future.
pub fn resolve_data_year(tax_date: Option<&str>, today: NaiveDate) -> Result<i32> {
    let Some(raw) = tax_date.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(today.year());
    };
    let date = parse_tax_date(raw)?;
    Ok(if date > today { today.year() } else { date.year() })
}

fn parse_tax_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| {
            // ⏰ `2024-03-01T10:00:00` with no zone: keep the date, ignore the clock.
            raw.get(..10)
                .filter(|_| raw.len() > 10 && raw.as_bytes()[10] == b'T')
                .ok_or(())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| ()))
        })
        .map_err(|_| IntegrationError::Validation(format!("tax date '{raw}' is not a date")))
}

impl TaxAdjustment {
    /// 📨 Shape the result into the vendor's request document.
    pub fn to_request(&self, account: &SureTaxAccount<'_>, client_tracking: &str) -> TaxAdjustmentRequest {
        TaxAdjustmentRequest {
            client_number: account.client_number.to_string(),
            business_unit: account.business_unit.to_string(),
            validation_key: account.validation_key.to_string(),
            data_year: self.data_year.to_string(),
            client_tracking: client_tracking.to_string(),
            item_list: self
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| TaxAdjustmentLine {
                    line_number: (i + 1).to_string(),
                    geocode: item.geocode.clone(),
                    revenue: item.revenue.clone(),
                    tax: item.tax.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn the_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    fn a_line(amount: &str, credit: &str) -> TaxLineItem {
        TaxLineItem {
            amount: amount.to_string(),
            freight: "0".to_string(),
            exempt_amount: "0".to_string(),
            tax_amount: "80".to_string(),
            credit_indicator: credit.to_string(),
            jurisdiction_code: "US0112345ABCDE".to_string(),
            tax_date: Some("2025-06-30".to_string()),
        }
    }

    #[test]
    fn the_one_where_a_thousand_cents_is_ten_dollars() {
        let result = calculate(&[a_line("1000", "0")], 2, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "10.00");
        assert_eq!(result.items[0].tax, "0.80");
        assert_eq!(result.items[0].geocode, "US12345ABCDE");
        assert_eq!(result.data_year, 2025);
    }

    #[test]
    fn the_one_where_a_credit_memo_flips_the_sign() {
        let result = calculate(&[a_line("1000", "1")], 2, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "-10.00");
        assert_eq!(result.items[0].tax, "-0.80");

        let result = calculate(&[a_line("1000", "")], 2, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "10.00", "empty indicator is not a credit");
    }

    #[test]
    fn the_one_where_freight_joins_and_exempt_leaves() {
        let mut line = a_line("1000", "0");
        line.freight = "250".to_string();
        line.exempt_amount = "50".to_string();
        let result = calculate(&[line], 2, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "12.00");
    }

    #[test]
    fn the_one_where_half_a_cent_rounds_away_from_zero() {
        // 🎯 1005 with three decimals is 1.005 → 1.01, and -1.005 → -1.01
        let result = calculate(&[a_line("1005", "0")], 3, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "1.01");
        let result = calculate(&[a_line("1005", "X")], 3, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "-1.01");
        let result = calculate(&[a_line("1004", "0")], 3, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "1.00");
    }

    #[test]
    fn the_one_where_zero_decimals_and_zero_amounts_behave() {
        let mut line = a_line("7", "1");
        line.tax_amount = String::new();
        let result = calculate(&[line], 0, true, the_day()).expect("valid");
        assert_eq!(result.items[0].revenue, "-7.00");
        assert_eq!(result.items[0].tax, "0.00", "no negative zero on the invoice");
    }

    #[test]
    fn the_one_where_garbage_amounts_are_a_validation_error() {
        let result = calculate(&[a_line("ten bucks", "0")], 2, true, the_day());
        assert!(matches!(result, Err(IntegrationError::Validation(_))));
        let result = calculate(&[a_line("1", "0")], 29, true, the_day());
        assert!(matches!(result, Err(IntegrationError::Validation(_))));
    }

    #[test]
    fn the_one_where_two_enormous_amounts_overflow_into_an_error_not_a_panic() {
        let mut line = a_line("79228162514264337593543950335", "0");
        line.freight = "79228162514264337593543950335".to_string();
        match calculate(&[line], 2, false, the_day()) {
            Err(IntegrationError::Validation(message)) => assert!(message.contains("overflows"), "{message}"),
            honestly_who_knows => panic!("💀 expected Validation, got {honestly_who_knows:?}"),
        }

        let mut line = a_line("1", "0");
        line.exempt_amount = "-79228162514264337593543950335".to_string();
        line.amount = "79228162514264337593543950335".to_string();
        assert!(matches!(
            calculate(&[line], 2, false, the_day()),
            Err(IntegrationError::Validation(_))
        ));
    }

    #[test]
    fn the_one_where_a_twelve_char_code_with_unify_shrinks_to_ten_and_fails() {
        match transform_geocode("US12ABCDE123", true) {
            Err(IntegrationError::Validation(message)) => {
                assert!(message.contains("USABCDE123"), "the offending code is named: {message}");
            }
            honestly_who_knows => panic!("💀 expected Validation, got {honestly_who_knows:?}"),
        }
    }

    #[test]
    fn the_one_where_without_unify_the_code_passes_through() {
        assert_eq!(
            transform_geocode("US12345ABCDE", false).expect("valid as is"),
            "US12345ABCDE"
        );
        assert!(transform_geocode("US0112345ABCDE", false).is_err(), "14 chars is too many");
        assert!(transform_geocode("U", true).is_err(), "short codes skip the trim and still fail");
    }

    #[test]
    fn the_one_where_every_output_either_matches_or_errors() {
        let the_candidates = [
            "US0112345ABCDE",
            "US12ABCDE123",
            "12345678901234",
            "USxx12345abcde",
            "US0112345ABCD!",
            "",
            "ÄÖ0112345ABCDE",
            "us0012345zzzzz",
        ];
        for candidate in the_candidates {
            for unify in [true, false] {
                if let Ok(code) = transform_geocode(candidate, unify) {
                    assert!(
                        GEOCODE_PATTERN.is_match(&code) && code.len() == 12,
                        "{candidate} → {code} slipped through"
                    );
                }
            }
        }
    }

    #[test]
    fn the_one_where_the_future_is_clamped_to_this_year() {
        let today = the_day();
        assert_eq!(resolve_data_year(Some("2031-01-01"), today).expect("date"), 2026);
        assert_eq!(resolve_data_year(Some("2019-12-31"), today).expect("date"), 2019);
        assert_eq!(resolve_data_year(Some("20240229"), today).expect("date"), 2024);
        assert_eq!(resolve_data_year(Some("2023-05-01T12:00:00Z"), today).expect("date"), 2023);
        assert_eq!(resolve_data_year(Some("2022-05-01T12:00:00"), today).expect("date"), 2022);
        assert_eq!(resolve_data_year(None, today).expect("no date"), 2026);
        assert_eq!(resolve_data_year(Some("  "), today).expect("blank date"), 2026);
        assert!(matches!(
            resolve_data_year(Some("next tuesday"), today),
            Err(IntegrationError::Validation(_))
        ));
    }

    #[test]
    fn the_one_where_the_request_numbers_its_lines() {
        let result = calculate(&[a_line("1000", "0"), a_line("2000", "1")], 2, true, the_day())
            .expect("valid");
        let account = SureTaxAccount {
            client_number: "000001",
            business_unit: "BU",
            validation_key: "key",
        };
        let the_request = result.to_request(&account, "MSG-1");
        let the_json = serde_json::to_value(&the_request).expect("serializes");
        assert_eq!(the_json["DataYear"], "2025");
        assert_eq!(the_json["ItemList"][1]["LineNumber"], "2");
        assert_eq!(the_json["ItemList"][1]["Revenue"], "-20.00");
        assert_eq!(the_json["ClientTracking"], "MSG-1");
    }

    #[test]
    fn the_one_where_the_unify_flag_speaks_several_dialects() {
        assert!(unify_flag(Some("X")));
        assert!(unify_flag(Some("true")));
        assert!(!unify_flag(Some("")));
        assert!(!unify_flag(None));
        assert!(!unify_flag(Some("no")));
        assert!(unify_flag(Some("x")));
        assert!(unify_flag(Some(" 1 ")));
        assert!(!unify_flag(Some("yes")), "only X, true and 1 count");
        assert!(!unify_flag(Some("Y")));
    }
}
