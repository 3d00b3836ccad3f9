pub mod loans;
pub mod status;
