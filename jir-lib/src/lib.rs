pub mod analysis;
pub mod builder;
pub mod cfg;
pub mod error;
pub mod hierarchy;
pub mod icfg;
pub mod ir;
pub mod pta;


#[cfg(test)]
mod hierarchy_tests;

#[cfg(test)]
mod cfg_tests;
