//! Arrow layouts of the two similarity artifacts.
//!
//! Both tables carry a dense `row` column (0..n) that ties each vector to its
//! position in the backing store; the chunk table also carries the text.
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ROW: &str = "row";
pub const VECTOR: &str = "vector";
pub const TEXT: &str = "text";
pub const SOURCE: &str = "source";

fn vector_field(dim: i32) -> Field {
	Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

pub fn dataset_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ROW, DataType::Int32, false),
		vector_field(dim),
	]))
}

pub fn chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ROW, DataType::Int32, false),
		Field::new(TEXT, DataType::Utf8, false),
		Field::new(SOURCE, DataType::Utf8, false),
		vector_field(dim),
	]))
}
