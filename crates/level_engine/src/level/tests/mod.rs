//! Whole-engine behaviour: scenarios that cross hitboxes, grids, worlds and
//! the step, plus randomized narrow-phase properties

mod properties;
mod scenarios;
