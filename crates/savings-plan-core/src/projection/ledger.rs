use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Units};

/// Which account a movement is booked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Main,
    TaxEligible,
}

/// Unit balances of a single account.
///
/// `invested` units follow the fund price; `client` units model the
/// contractually non-invested portion and never earn yield.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pools {
    pub invested: Units,
    pub client: Units,
}

impl Pools {
    pub fn total_units(&self) -> Units {
        self.invested + self.client
    }

    /// Scale both pools by the same ratio. Every proportional reduction
    /// (fees, withdrawals) goes through here. A non-positive ratio empties
    /// the account.
    pub fn scale(&mut self, ratio: Decimal) {
        if ratio <= Decimal::ZERO {
            self.invested = Decimal::ZERO;
            self.client = Decimal::ZERO;
            return;
        }
        self.invested *= ratio;
        self.client *= ratio;
    }
}

/// The mutable state of a run: one shared unit price and two accounts.
#[derive(Debug, Clone)]
pub struct Ledger {
    unit_price: Decimal,
    main: Pools,
    tax: Pools,
}

impl Ledger {
    pub fn new(unit_price: Decimal) -> Self {
        Self {
            unit_price,
            main: Pools::default(),
            tax: Pools::default(),
        }
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn pools(&self, kind: AccountKind) -> &Pools {
        match kind {
            AccountKind::Main => &self.main,
            AccountKind::TaxEligible => &self.tax,
        }
    }

    fn pools_mut(&mut self, kind: AccountKind) -> &mut Pools {
        match kind {
            AccountKind::Main => &mut self.main,
            AccountKind::TaxEligible => &mut self.tax,
        }
    }

    pub fn invested_units(&self) -> Units {
        self.main.invested + self.tax.invested
    }

    pub fn client_units(&self) -> Units {
        self.main.client + self.tax.client
    }

    pub fn total_units(&self) -> Units {
        self.invested_units() + self.client_units()
    }

    /// Combined balance, always `(invested + client) * price`.
    pub fn balance(&self) -> Money {
        self.total_units() * self.unit_price
    }

    pub fn account_balance(&self, kind: AccountKind) -> Money {
        self.pools(kind).total_units() * self.unit_price
    }

    pub fn invested_balance(&self) -> Money {
        self.invested_units() * self.unit_price
    }

    pub fn client_balance(&self) -> Money {
        self.client_units() * self.unit_price
    }

    /// Buy units at the current price. Non-positive amounts are ignored.
    pub fn buy(&mut self, kind: AccountKind, invested: Money, client: Money) {
        let price = self.unit_price;
        let pools = self.pools_mut(kind);
        if invested > Decimal::ZERO {
            pools.invested += invested / price;
        }
        if client > Decimal::ZERO {
            pools.client += client / price;
        }
    }

    /// Credit money straight into the invested pool of an account.
    pub fn credit_invested(&mut self, kind: AccountKind, amount: Money) {
        self.buy(kind, amount, Decimal::ZERO);
    }

    /// Move the price by `growth`. Only invested units benefit: client units
    /// are re-denominated so their money value stays at the pre-growth price.
    /// Returns the yield earned.
    pub fn accrue_yield(&mut self, growth: Decimal) -> Money {
        if growth == Decimal::ONE || growth <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let old_price = self.unit_price;
        let new_price = old_price * growth;
        let main_client_value = self.main.client * old_price;
        let tax_client_value = self.tax.client * old_price;

        self.unit_price = new_price;
        self.main.client = main_client_value / new_price;
        self.tax.client = tax_client_value / new_price;

        self.invested_units() * (new_price - old_price)
    }

    /// Remove `cost` from one account by scaling its pools. Capped at the
    /// account balance; returns the amount actually taken.
    pub fn deduct_from(&mut self, kind: AccountKind, cost: Money) -> Money {
        let value = self.account_balance(kind);
        let taken = clamp_cost(cost, value);
        if value <= Decimal::ZERO {
            self.pools_mut(kind).scale(Decimal::ZERO);
            return Decimal::ZERO;
        }
        self.pools_mut(kind).scale((value - taken) / value);
        taken
    }

    /// Remove `cost` from the combined balance, reducing every pool of both
    /// accounts by the same ratio. Returns the amount actually taken.
    pub fn deduct_combined(&mut self, cost: Money) -> Money {
        let value = self.balance();
        let taken = clamp_cost(cost, value);
        let ratio = if value <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            (value - taken) / value
        };
        self.main.scale(ratio);
        self.tax.scale(ratio);
        if value <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            taken
        }
    }

    /// Withdraw up to `amount`, draining the main account before the
    /// tax-eligible one. Returns the amount actually withdrawn.
    pub fn withdraw(&mut self, amount: Money) -> Money {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let from_main = self.deduct_from(AccountKind::Main, amount);
        let remaining = amount - from_main;
        let from_tax = if remaining > Decimal::ZERO {
            self.deduct_from(AccountKind::TaxEligible, remaining)
        } else {
            Decimal::ZERO
        };
        from_main + from_tax
    }
}

fn clamp_cost(cost: Money, value: Money) -> Money {
    cost.max(Decimal::ZERO).min(value.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_and_balance() {
        let mut ledger = Ledger::new(dec!(2));
        ledger.buy(AccountKind::Main, dec!(800), dec!(200));
        assert_eq!(ledger.invested_units(), dec!(400));
        assert_eq!(ledger.client_units(), dec!(100));
        assert_eq!(ledger.balance(), dec!(1000));
    }

    #[test]
    fn test_yield_skips_client_pool() {
        let mut ledger = Ledger::new(Decimal::ONE);
        ledger.buy(AccountKind::Main, dec!(900), dec!(100));
        let earned = ledger.accrue_yield(dec!(1.25));
        assert_eq!(earned, dec!(225));
        assert_eq!(ledger.invested_balance(), dec!(1125));
        assert_eq!(ledger.client_balance(), dec!(100));
        assert_eq!(ledger.client_units(), dec!(80));
    }

    #[test]
    fn test_deduct_scales_both_pools() {
        let mut ledger = Ledger::new(Decimal::ONE);
        ledger.buy(AccountKind::Main, dec!(750), dec!(250));
        let taken = ledger.deduct_from(AccountKind::Main, dec!(100));
        assert_eq!(taken, dec!(100));
        assert_eq!(ledger.invested_units(), dec!(675));
        assert_eq!(ledger.client_units(), dec!(225));
    }

    #[test]
    fn test_deduct_capped_at_balance() {
        let mut ledger = Ledger::new(Decimal::ONE);
        ledger.buy(AccountKind::Main, dec!(50), Decimal::ZERO);
        let taken = ledger.deduct_combined(dec!(80));
        assert_eq!(taken, dec!(50));
        assert_eq!(ledger.balance(), Decimal::ZERO);
        assert!(ledger.invested_units() >= Decimal::ZERO);
    }

    #[test]
    fn test_deduct_from_empty_account_is_zero() {
        let mut ledger = Ledger::new(Decimal::ONE);
        assert_eq!(ledger.deduct_from(AccountKind::TaxEligible, dec!(10)), Decimal::ZERO);
        assert_eq!(ledger.deduct_combined(dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn test_withdraw_drains_main_first() {
        let mut ledger = Ledger::new(Decimal::ONE);
        ledger.buy(AccountKind::Main, dec!(100), Decimal::ZERO);
        ledger.buy(AccountKind::TaxEligible, dec!(100), Decimal::ZERO);
        let taken = ledger.withdraw(dec!(150));
        assert_eq!(taken, dec!(150));
        assert_eq!(ledger.account_balance(AccountKind::Main), Decimal::ZERO);
        assert_eq!(ledger.account_balance(AccountKind::TaxEligible), dec!(50));

        let rest = ledger.withdraw(dec!(1_000));
        assert_eq!(rest, dec!(50));
        assert_eq!(ledger.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_pools_scale_with_non_positive_ratio_empties() {
        let mut pools = Pools {
            invested: dec!(10),
            client: dec!(5),
        };
        pools.scale(dec!(-0.5));
        assert_eq!(pools, Pools::default());
    }
}
