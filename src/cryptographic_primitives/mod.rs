pub mod committed_proof;
pub mod hashing;
pub mod proofs;
