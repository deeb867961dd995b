pub mod applicant;

pub use applicant::*;
