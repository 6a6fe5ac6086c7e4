pub mod hospitals;
