// Ranking core — score, select, explain.
//
// Pure synchronous functions over an in-memory batch. The only input besides
// the papers is the injected `now`, so identical inputs give identical output.

pub mod clock;
pub mod paper;
pub mod reason;
pub mod select;
