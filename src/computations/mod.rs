pub mod pagerank;
pub mod top_k;
