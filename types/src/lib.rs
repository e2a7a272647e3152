pub mod consts;
pub mod containers;
pub mod nonstandard;
pub mod primitives;
