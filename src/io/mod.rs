// External event formats

pub mod converter;
pub mod midi;
