pub mod prelude;

pub mod donation_type;
pub mod donor;
pub mod payment;
pub mod payment_history;
pub mod receipt;
pub mod receipt_counter;
