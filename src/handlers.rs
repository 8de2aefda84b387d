pub mod companies;
pub mod health;
pub mod products;
pub mod transactions;
