pub mod search;
pub mod sequential;
