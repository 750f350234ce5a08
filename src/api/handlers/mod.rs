pub mod health;
pub mod payments;
pub mod receipts;
pub mod reports;
pub mod settings;
pub mod washes;

#[cfg(test)]
mod tests;
