//! Which payment methods and banks are offered per currency.
//!
//! Some currencies offer the same banks for every method, others key the
//! bank list by method. [`Selection`] keeps a currency/method/bank triple
//! consistent with this table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Kzt,
    Azn,
    Uzs,
    Tjs,
    Kgs,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Kzt,
        Currency::Azn,
        Currency::Uzs,
        Currency::Tjs,
        Currency::Kgs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Kzt => "KZT",
            Currency::Azn => "AZN",
            Currency::Uzs => "UZS",
            Currency::Tjs => "TJS",
            Currency::Kgs => "KGS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SelectionError::UnknownCurrency(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    MobileNumber,
    Qr,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Card,
        PaymentMethod::MobileNumber,
        PaymentMethod::Qr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::MobileNumber => "MOBILE_NUMBER",
            PaymentMethod::Qr => "QR",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SelectionError::UnknownMethod(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Unknown payment method: {0}")]
    UnknownMethod(String),

    #[error("{method} is not offered for {currency}")]
    MethodNotOffered {
        currency: Currency,
        method: PaymentMethod,
    },

    #[error("Bank {bank} is not offered for {currency} {method}")]
    BankNotOffered {
        currency: Currency,
        method: PaymentMethod,
        bank: String,
    },
}

enum BankSet {
    /// Same banks regardless of method.
    Shared(&'static [&'static str]),
    ByMethod(fn(PaymentMethod) -> &'static [&'static str]),
}

struct CurrencyProfile {
    methods: &'static [PaymentMethod],
    banks: BankSet,
}

const CARD_ONLY: &[PaymentMethod] = &[PaymentMethod::Card];
const ALL_METHODS: &[PaymentMethod] = &[
    PaymentMethod::Card,
    PaymentMethod::MobileNumber,
    PaymentMethod::Qr,
];

fn profile(currency: Currency) -> CurrencyProfile {
    match currency {
        Currency::Kzt => CurrencyProfile {
            methods: CARD_ONLY,
            banks: BankSet::Shared(&["BEREKEBANK", "JYSANBANK", "ANY"]),
        },
        Currency::Azn => CurrencyProfile {
            methods: ALL_METHODS,
            banks: BankSet::ByMethod(azn_banks),
        },
        Currency::Uzs => CurrencyProfile {
            methods: ALL_METHODS,
            banks: BankSet::ByMethod(uzs_banks),
        },
        Currency::Tjs => CurrencyProfile {
            methods: CARD_ONLY,
            banks: BankSet::Shared(&["DUSHANBECITY", "SPITAMEN", "ANY"]),
        },
        Currency::Kgs => CurrencyProfile {
            methods: CARD_ONLY,
            banks: BankSet::Shared(&["MBANK", "OPTIMA", "ANY"]),
        },
    }
}

fn azn_banks(method: PaymentMethod) -> &'static [&'static str] {
    match method {
        PaymentMethod::Card => &["KAPITALBANK", "ANY"],
        PaymentMethod::MobileNumber => &["M10", "MPAY"],
        PaymentMethod::Qr => &["M10"],
    }
}

fn uzs_banks(method: PaymentMethod) -> &'static [&'static str] {
    match method {
        PaymentMethod::Card => &["HUMO", "UZCARD", "ANY"],
        PaymentMethod::MobileNumber => &["PAYMEMOBILE"],
        PaymentMethod::Qr => &["CLICK"],
    }
}

/// Methods offered for `currency`, in display order.
pub fn methods(currency: Currency) -> &'static [PaymentMethod] {
    profile(currency).methods
}

/// Banks offered for the combination, empty when the method is not offered.
pub fn banks(currency: Currency, method: PaymentMethod) -> &'static [&'static str] {
    let profile = profile(currency);
    if !profile.methods.contains(&method) {
        return &[];
    }
    match profile.banks {
        BankSet::Shared(banks) => banks,
        BankSet::ByMethod(lookup) => lookup(method),
    }
}

pub fn default_bank(currency: Currency, method: PaymentMethod) -> Option<&'static str> {
    banks(currency, method).first().copied()
}

pub fn validate(currency: Currency, method: PaymentMethod, bank: &str) -> Result<(), SelectionError> {
    if !methods(currency).contains(&method) {
        return Err(SelectionError::MethodNotOffered { currency, method });
    }
    if !banks(currency, method).contains(&bank) {
        return Err(SelectionError::BankNotOffered {
            currency,
            method,
            bank: bank.to_string(),
        });
    }
    Ok(())
}

/// One row of the catalog, as served to clients.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CatalogEntry {
    pub currency: Currency,
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MethodEntry {
    pub method: PaymentMethod,
    pub banks: Vec<&'static str>,
}

pub fn entries() -> Vec<CatalogEntry> {
    Currency::ALL
        .into_iter()
        .map(|currency| CatalogEntry {
            currency,
            methods: methods(currency)
                .iter()
                .map(|&method| MethodEntry {
                    method,
                    banks: banks(currency, method).to_vec(),
                })
                .collect(),
        })
        .collect()
}

/// A consistent currency/method/bank choice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Selection {
    pub currency: Currency,
    pub method: PaymentMethod,
    pub bank: String,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::for_currency(Currency::Kzt)
    }
}

impl Selection {
    /// First method and first bank of `currency`.
    pub fn for_currency(currency: Currency) -> Self {
        let method = methods(currency)
            .first()
            .copied()
            .unwrap_or(PaymentMethod::Card);
        Self {
            currency,
            method,
            bank: default_bank(currency, method).unwrap_or_default().to_string(),
        }
    }

    /// Switch currency. Keeps the method when the new currency offers it,
    /// otherwise falls back to its first method. The bank always resets.
    pub fn select_currency(&mut self, currency: Currency) {
        self.currency = currency;
        if !methods(currency).contains(&self.method) {
            if let Some(first) = methods(currency).first() {
                self.method = *first;
            }
        }
        self.reset_bank();
    }

    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), SelectionError> {
        if !methods(self.currency).contains(&method) {
            return Err(SelectionError::MethodNotOffered {
                currency: self.currency,
                method,
            });
        }
        self.method = method;
        self.reset_bank();
        Ok(())
    }

    pub fn select_bank(&mut self, bank: &str) -> Result<(), SelectionError> {
        validate(self.currency, self.method, bank)?;
        self.bank = bank.to_string();
        Ok(())
    }

    pub fn available_methods(&self) -> &'static [PaymentMethod] {
        methods(self.currency)
    }

    pub fn available_banks(&self) -> &'static [&'static str] {
        banks(self.currency, self.method)
    }

    fn reset_bank(&mut self) {
        self.bank = default_bank(self.currency, self.method)
            .unwrap_or_default()
            .to_string();
    }
}
