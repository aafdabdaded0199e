pub mod cadence;
