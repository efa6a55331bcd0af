pub mod element;
pub mod graph;
pub mod value;

pub use element::{Containment, Element, NodeId};
pub use graph::Graph;
pub use value::Scalar;
