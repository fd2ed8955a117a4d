//! Loan and running-cost calculators.
//!
//! All arithmetic is done in `rust_decimal` fixed point; intermediate values
//! stay unrounded and only the reported figures are rounded half-up to two
//! places.
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldErrors;
use crate::models::money::round2;
use crate::payload::Payload;

#[derive(Debug, Clone)]
pub struct EmiRequest {
    pub principal_amount: Decimal,
    pub down_payment: Decimal,
    pub interest_rate: Decimal,
    pub tenure_months: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmiBreakdown {
    pub emi: Decimal,
    pub total_amount: Decimal,
    pub total_interest: Decimal,
    pub principal: Decimal,
}

#[derive(Debug, Clone)]
pub struct FuelCostRequest {
    pub monthly_km: Decimal,
    pub fuel_price_per_liter: Decimal,
    pub bike_mileage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelCost {
    pub monthly_fuel_needed: Decimal,
    pub monthly_cost: Decimal,
    pub yearly_cost: Decimal,
}

/// Checks a decimal against a `max_digits`/`decimal_places` column shape.
fn check_decimal(
    errors: &mut FieldErrors,
    field: &str,
    value: Decimal,
    max_digits: u32,
    decimal_places: u32,
) {
    let normalized = value.normalize();
    if normalized.scale() > decimal_places {
        errors.add(
            field,
            format!("Ensure that there are no more than {} decimal places.", decimal_places),
        );
        return;
    }
    let limit = Decimal::from(10i64.pow(max_digits - decimal_places));
    if normalized.abs() >= limit {
        errors.add(
            field,
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                max_digits - decimal_places
            ),
        );
    }
}

fn check_non_negative(errors: &mut FieldErrors, field: &str, value: Decimal) {
    if value.is_sign_negative() && !value.is_zero() {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
    }
}

impl EmiRequest {
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(body)?;
        let principal_amount = payload.decimal("principal_amount");
        let down_payment = payload.decimal("down_payment");
        let interest_rate = payload.decimal("interest_rate");
        let tenure_months = payload.integer("tenure_months");
        match (principal_amount, down_payment, interest_rate, tenure_months) {
            (Some(principal_amount), Some(down_payment), Some(interest_rate), Some(tenure_months)) => {
                Ok(EmiRequest {
                    principal_amount,
                    down_payment,
                    interest_rate,
                    tenure_months,
                })
            }
            _ => Err(payload.finish().err().unwrap_or_default()),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "principal_amount", self.principal_amount, 10, 2);
        check_decimal(&mut errors, "down_payment", self.down_payment, 10, 2);
        check_decimal(&mut errors, "interest_rate", self.interest_rate, 5, 2);
        check_non_negative(&mut errors, "down_payment", self.down_payment);
        check_non_negative(&mut errors, "interest_rate", self.interest_rate);
        if self.tenure_months < 1 {
            errors.add("tenure_months", "Ensure this value is greater than or equal to 1.");
        }
        errors.into_result()?;

        if self.down_payment >= self.principal_amount {
            return Err(FieldErrors::single(
                FieldErrors::NON_FIELD,
                "Down payment must be less than principal amount",
            ));
        }
        Ok(())
    }
}

impl FuelCostRequest {
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut payload = Payload::new(body)?;
        let monthly_km = payload.decimal("monthly_km");
        let fuel_price_per_liter = payload.decimal("fuel_price_per_liter");
        let bike_mileage = payload.decimal("bike_mileage");
        match (monthly_km, fuel_price_per_liter, bike_mileage) {
            (Some(monthly_km), Some(fuel_price_per_liter), Some(bike_mileage)) => Ok(FuelCostRequest {
                monthly_km,
                fuel_price_per_liter,
                bike_mileage,
            }),
            _ => Err(payload.finish().err().unwrap_or_default()),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_decimal(&mut errors, "monthly_km", self.monthly_km, 8, 2);
        check_decimal(&mut errors, "fuel_price_per_liter", self.fuel_price_per_liter, 6, 2);
        check_decimal(&mut errors, "bike_mileage", self.bike_mileage, 5, 2);
        check_non_negative(&mut errors, "monthly_km", self.monthly_km);
        check_non_negative(&mut errors, "fuel_price_per_liter", self.fuel_price_per_liter);
        if self.bike_mileage <= Decimal::ZERO {
            errors.add("bike_mileage", "Mileage must be greater than zero.");
        }
        errors.into_result()
    }
}

/// Equated monthly installment for `principal_amount - down_payment`
/// borrowed at `interest_rate` percent per year over `tenure_months`.
pub fn calculate_emi(request: &EmiRequest) -> Result<EmiBreakdown, FieldErrors> {
    request.validate()?;

    let financed = request.principal_amount - request.down_payment;
    let tenure = Decimal::from(request.tenure_months);
    let monthly_rate = request.interest_rate / Decimal::from(100) / Decimal::from(12);

    let out_of_range = || {
        FieldErrors::single(
            FieldErrors::NON_FIELD,
            "Interest rate and tenure are out of the supported range",
        )
    };

    let emi = if monthly_rate.is_zero() {
        financed / tenure
    } else {
        // P·r·g / (g − 1) with g = (1+r)^N, written as P·r / (1 − 1/g).
        // When g overflows, 1/g is below the decimal resolution and the
        // installment is just the monthly interest P·r.
        let discount = (Decimal::ONE + monthly_rate)
            .checked_powi(request.tenure_months)
            .and_then(|growth| Decimal::ONE.checked_div(growth))
            .unwrap_or(Decimal::ZERO);
        (financed * monthly_rate)
            .checked_div(Decimal::ONE - discount)
            .ok_or_else(out_of_range)?
    };

    let total_amount = emi.checked_mul(tenure).ok_or_else(out_of_range)?;
    let total_interest = total_amount - financed;

    Ok(EmiBreakdown {
        emi: round2(emi),
        total_amount: round2(total_amount),
        total_interest: round2(total_interest),
        principal: round2(financed),
    })
}

/// Monthly and yearly fuel spend for a commute of `monthly_km`.
pub fn calculate_fuel_cost(request: &FuelCostRequest) -> Result<FuelCost, FieldErrors> {
    request.validate()?;

    let monthly_fuel_needed = request.monthly_km / request.bike_mileage;
    let monthly_cost = monthly_fuel_needed * request.fuel_price_per_liter;
    let yearly_cost = monthly_cost * Decimal::from(12);

    Ok(FuelCost {
        monthly_fuel_needed: round2(monthly_fuel_needed),
        monthly_cost: round2(monthly_cost),
        yearly_cost: round2(yearly_cost),
    })
}
