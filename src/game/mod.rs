//! Game logic - pure business rules without the HTTP layer

pub mod admission;
pub mod coupons;
pub mod hours;
pub mod progression;
pub mod session;
pub mod settings;
pub mod stats;
