//! Fund transfer between settlement accounts

use rust_decimal::Decimal;

use domain_identity::Account;

use crate::error::ClaimsError;

/// Balances after a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub payer_balance: Decimal,
    pub payee_balance: Decimal,
}

/// Moves `amount` from `payer` to `payee`
///
/// Both balances change or neither does. The sum of the two balances is
/// the same before and after.
///
/// # Errors
///
/// - `InsufficientFunds` if the payer would go negative and
///   `allow_negative` is false
/// - `ArithmeticOverflow` if either balance leaves the decimal range
pub fn transfer(
    payer: &mut Account,
    payee: &mut Account,
    amount: Decimal,
    allow_negative: bool,
) -> Result<TransferOutcome, ClaimsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ClaimsError::InvalidAmount(amount));
    }

    let payer_balance = payer
        .balance
        .checked_sub(amount)
        .ok_or(ClaimsError::ArithmeticOverflow)?;
    let payee_balance = payee
        .balance
        .checked_add(amount)
        .ok_or(ClaimsError::ArithmeticOverflow)?;

    if payer_balance.is_sign_negative() && !payer_balance.is_zero() && !allow_negative {
        return Err(ClaimsError::InsufficientFunds {
            account_number: payer.account_number,
            balance: payer.balance,
            amount,
        });
    }

    payer.balance = payer_balance;
    payee.balance = payee_balance;
    Ok(TransferOutcome {
        payer_balance,
        payee_balance,
    })
}
