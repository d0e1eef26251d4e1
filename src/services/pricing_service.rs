//! Price breakdown for a list of line items.
//!
//! Amounts are rounded half-up (away from zero) to the currency's minor unit,
//! so the same subtotal always yields the same tax and total on every caller.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{LineItem, Pricing};

/// Minor-unit scale of the storefront currency.
pub const MINOR_UNIT_DP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotals at or above this ship for free.
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::ONE_HUNDRED,
            flat_shipping_fee: Decimal::TEN,
            tax_rate: Decimal::new(18, 2),
        }
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn subtotal(items: &[LineItem]) -> Decimal {
    round_money(items.iter().map(LineItem::line_total).sum())
}

/// Computes the full breakdown for `subtotal`. `discount` is applied, never
/// derived; the total is clamped at zero.
pub fn compute_pricing(policy: &PricingPolicy, subtotal: Decimal, discount: Decimal) -> Pricing {
    let subtotal = round_money(subtotal);
    let shipping_charges = if subtotal >= policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        policy.flat_shipping_fee
    };
    let tax = round_money(subtotal * policy.tax_rate);
    let discount = round_money(discount.max(Decimal::ZERO));
    let total = (subtotal + shipping_charges + tax - discount).max(Decimal::ZERO);

    Pricing {
        subtotal,
        shipping_charges,
        tax,
        discount,
        total,
    }
}

pub fn price_items(policy: &PricingPolicy, items: &[LineItem], discount: Decimal) -> Pricing {
    compute_pricing(policy, subtotal(items), discount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn free_shipping_at_threshold() {
        let pricing = compute_pricing(&PricingPolicy::default(), dec!(1000), Decimal::ZERO);

        assert_eq!(pricing.shipping_charges, Decimal::ZERO);
        assert_eq!(pricing.tax, dec!(180));
        assert_eq!(pricing.total, dec!(1180));
    }

    #[test]
    fn flat_fee_below_threshold() {
        let pricing = compute_pricing(&PricingPolicy::default(), dec!(50), Decimal::ZERO);

        assert_eq!(pricing.shipping_charges, dec!(10));
        assert_eq!(pricing.tax, dec!(9));
        assert_eq!(pricing.total, dec!(69));
    }

    #[test]
    fn threshold_is_inclusive() {
        let pricing = compute_pricing(&PricingPolicy::default(), dec!(100), Decimal::ZERO);
        assert_eq!(pricing.shipping_charges, Decimal::ZERO);

        let pricing = compute_pricing(&PricingPolicy::default(), dec!(99.99), Decimal::ZERO);
        assert_eq!(pricing.shipping_charges, dec!(10));
    }

    #[test]
    fn tax_rounds_half_up_on_minor_unit() {
        // 0.25 * 0.18 = 0.045 -> 0.05
        let pricing = compute_pricing(&PricingPolicy::default(), dec!(0.25), Decimal::ZERO);
        assert_eq!(pricing.tax, dec!(0.05));
    }

    #[test]
    fn oversized_discount_clamps_total_to_zero() {
        let pricing = compute_pricing(&PricingPolicy::default(), dec!(50), dec!(500));

        assert_eq!(pricing.discount, dec!(500));
        assert_eq!(pricing.total, Decimal::ZERO);
    }

    #[test]
    fn prices_line_items() {
        let items = vec![LineItem {
            product_ref: "hoodie".to_string(),
            name: "Hoodie".to_string(),
            image: String::new(),
            unit_price: dec!(60),
            quantity: 2,
            size: "M".to_string(),
            color: None,
        }];

        let pricing = price_items(&PricingPolicy::default(), &items, Decimal::ZERO);
        assert_eq!(pricing.subtotal, dec!(120));
        assert_eq!(pricing.shipping_charges, Decimal::ZERO);
        assert_eq!(pricing.tax, dec!(21.6));
        assert_eq!(pricing.total, dec!(141.6));
    }
}
