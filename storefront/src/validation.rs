//! Checkout form validation.
//!
//! Each validator looks at one step of the draft and returns the complete set
//! of errors for that step. The caller replaces the stored errors with the
//! result, so validating one step forgets the errors of the other.

use crate::types::{FormErrors, FormField, OrderDraft};

/// Message for an empty address
pub const ADDRESS_REQUIRED: &str = "Необходимо указать адрес";
/// Message for an empty email
pub const EMAIL_REQUIRED: &str = "Необходимо указать email";
/// Message for an empty phone
pub const PHONE_REQUIRED: &str = "Необходимо указать телефон";

/// Validates the delivery step
///
/// The payment method always has a value, so only the address is checked.
#[must_use]
pub fn validate_delivery(order: &OrderDraft) -> FormErrors {
    let mut errors = FormErrors::new();

    if order.address.trim().is_empty() {
        errors.insert(FormField::Address, ADDRESS_REQUIRED);
    }

    errors
}

/// Validates the contact step
#[must_use]
pub fn validate_contact(order: &OrderDraft) -> FormErrors {
    let mut errors = FormErrors::new();

    if order.email.trim().is_empty() {
        errors.insert(FormField::Email, EMAIL_REQUIRED);
    }
    if order.phone.trim().is_empty() {
        errors.insert(FormField::Phone, PHONE_REQUIRED);
    }

    errors
}
