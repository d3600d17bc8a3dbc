// Route handlers, split by authentication requirement
pub mod protected;
pub mod public;
