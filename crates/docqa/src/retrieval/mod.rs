//! Query-time retrieval against the vector index

mod retriever;

pub use retriever::Retriever;
