pub mod frontier;
