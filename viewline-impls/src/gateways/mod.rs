mod ledger_rest;

pub use ledger_rest::*;
