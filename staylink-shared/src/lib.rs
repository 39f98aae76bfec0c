pub mod pii;
pub mod text;

pub use pii::Masked;
