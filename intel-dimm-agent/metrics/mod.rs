pub mod dimm;
