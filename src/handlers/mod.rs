// handlers/mod.rs - HTTP handlers, split by authentication requirement
//
// public:    token acquisition, no credentials needed
// protected: everything under /api that needs a JWT or API key

pub mod protected;
pub mod public;
