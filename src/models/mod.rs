pub mod coupon;
pub mod game_state;
pub mod setting;
pub mod submission;
pub mod user;
pub mod word;
