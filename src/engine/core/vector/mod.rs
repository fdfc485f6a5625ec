mod parser;

pub use parser::{VectorParser, add_assign};
