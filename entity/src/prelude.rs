pub use super::donation_type::Entity as DonationType;
pub use super::donor::Entity as Donor;
pub use super::payment::Entity as Payment;
pub use super::payment_history::Entity as PaymentHistory;
pub use super::receipt::Entity as Receipt;
pub use super::receipt_counter::Entity as ReceiptCounter;
