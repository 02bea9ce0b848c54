pub mod lottery;
pub mod reward;
