pub mod explain;
pub mod mask;
