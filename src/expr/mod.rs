mod types;

/// Render a node as SQL-ish text into a caller-provided buffer. Used for
/// log messages and test diagnostics; this is not a deparser for any
/// particular SQL dialect.
pub trait Deparse {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String;
}

/// Convenience for one-shot rendering.
pub fn deparsed(node: &impl Deparse) -> String {
    let mut buf = String::new();
    node.deparse(&mut buf);
    buf
}

pub use types::*;
