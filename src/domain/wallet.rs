use crate::error::WalletError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a wallet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Generates a fresh random (v4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl From<Uuid> for WalletId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Balance of a wallet in minor currency units.
///
/// Stored balances are never negative: the only way to decrease one is
/// [`Balance::checked_withdraw`], which refuses to go below zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Balance(i64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Adds `amount`, or `None` on `i64` overflow.
    pub fn checked_deposit(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.value()).map(Self)
    }

    /// Subtracts `amount` only when the balance covers it.
    pub fn checked_withdraw(self, amount: Amount) -> Option<Self> {
        if self.0 >= amount.value() {
            Some(Self(self.0 - amount.value()))
        } else {
            None
        }
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Strictly positive amount carried by a deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, WalletError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(WalletError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = WalletError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Deposit,
    Withdraw,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "DEPOSIT",
            OperationType::Withdraw => "WITHDRAW",
        }
    }
}

impl FromStr for OperationType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationType::Deposit),
            "WITHDRAW" => Ok(OperationType::Withdraw),
            other => Err(WalletError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated balance change against a single wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletRequest {
    pub wallet_id: WalletId,
    pub operation: OperationType,
    pub amount: Amount,
}

impl WalletRequest {
    pub fn new(wallet_id: WalletId, operation: OperationType, amount: Amount) -> Self {
        Self {
            wallet_id,
            operation,
            amount,
        }
    }

    pub fn deposit(wallet_id: WalletId, amount: Amount) -> Self {
        Self::new(wallet_id, OperationType::Deposit, amount)
    }

    pub fn withdraw(wallet_id: WalletId, amount: Amount) -> Self {
        Self::new(wallet_id, OperationType::Withdraw, amount)
    }

    /// Validates raw caller input.
    ///
    /// The operation is checked before the amount, so `("UNKNOWN", 0)` reports
    /// [`WalletError::UnknownOperation`].
    pub fn parse(wallet_id: WalletId, operation: &str, amount: i64) -> Result<Self, WalletError> {
        let operation = operation.parse()?;
        let amount = Amount::new(amount)?;
        Ok(Self::new(wallet_id, operation, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(1).is_ok());
        assert!(matches!(Amount::new(0), Err(WalletError::InvalidAmount(0))));
        assert!(matches!(
            Amount::new(-10),
            Err(WalletError::InvalidAmount(-10))
        ));
    }

    #[test]
    fn test_balance_withdraw_never_goes_negative() {
        let balance = Balance::new(1000);
        assert_eq!(
            balance.checked_withdraw(Amount::new(1000).unwrap()),
            Some(Balance::ZERO)
        );
        assert_eq!(balance.checked_withdraw(Amount::new(1001).unwrap()), None);
    }

    #[test]
    fn test_balance_deposit_overflow() {
        let balance = Balance::new(i64::MAX);
        assert_eq!(balance.checked_deposit(Amount::new(1).unwrap()), None);
        assert_eq!(
            Balance::ZERO.checked_deposit(Amount::new(5).unwrap()),
            Some(Balance::new(5))
        );
    }

    #[rstest]
    #[case::deposit("DEPOSIT", 100, true)]
    #[case::withdraw("WITHDRAW", 50, true)]
    #[case::zero_amount("DEPOSIT", 0, false)]
    #[case::negative_amount("DEPOSIT", -10, false)]
    #[case::unknown_operation("INVALID", 100, false)]
    #[case::lowercase_operation("deposit", 100, false)]
    fn test_request_parsing(#[case] operation: &str, #[case] amount: i64, #[case] valid: bool) {
        let result = WalletRequest::parse(WalletId::random(), operation, amount);
        assert_eq!(result.is_ok(), valid);
    }

    #[test]
    fn test_unknown_operation_reported_before_amount() {
        let result = WalletRequest::parse(WalletId::random(), "UNKNOWN", 0);
        assert!(matches!(result, Err(WalletError::UnknownOperation(op)) if op == "UNKNOWN"));
    }

    #[test]
    fn test_operation_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&OperationType::Deposit).unwrap(),
            "\"DEPOSIT\""
        );
        let parsed: OperationType = serde_json::from_str("\"WITHDRAW\"").unwrap();
        assert_eq!(parsed, OperationType::Withdraw);
    }

    #[test]
    fn test_wallet_id_round_trips_through_display() {
        let id = WalletId::random();
        let parsed: WalletId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<WalletId>().is_err());
    }
}
