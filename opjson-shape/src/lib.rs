#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Type descriptions and dynamic values for the opjson encoder.
//!
//! A [`Shape`] describes one type: its [`Kind`], the fields of a struct,
//! the element type of a container, and the custom marshal hooks a type may
//! provide. Shapes are declared as `static` items and refer to each other
//! through [`ShapeRef`] function pointers, which is what allows a type to
//! mention itself:
//!
//! ```
//! use opjson_shape::{Field, Kind, Shape, shapes};
//!
//! static NODE_FIELDS: [Field; 2] = [
//!     Field::new("Value", || &shapes::INT),
//!     Field::new("Next", || &NODE_PTR).tag("next,omitempty"),
//! ];
//! static NODE: Shape = Shape::new("Node", Kind::Struct(&NODE_FIELDS));
//! static NODE_PTR: Shape = Shape::new("*Node", Kind::Pointer(|| &NODE));
//!
//! assert_eq!(NODE.fields().len(), 2);
//! assert!(NODE_PTR.kind.is_pointer());
//! ```
//!
//! Values handed to the encoder are [`Value`] trees. A struct value stores
//! one entry per declared field, in declaration order.

mod field;
mod shape;
pub mod shapes;
mod value;

pub use field::{Field, FieldTag};
pub use shape::{Kind, MarshalJsonFn, MarshalTextFn, Shape, ShapeRef};
pub use value::Value;
