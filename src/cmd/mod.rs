pub mod fit;
pub mod profile;
pub mod simulate;
