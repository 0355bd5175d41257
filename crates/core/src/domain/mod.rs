pub mod medication;
pub mod monograph;
pub mod order;
pub mod prescription;
